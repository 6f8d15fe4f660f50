//! Line item models for order-service.
//!
//! Every item carries a derived `total_value` that is recomputed by its
//! setters; callers never write it directly.

use crate::services::money::round_currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Common behaviour of the three line item kinds.
pub trait LineItem {
    /// Amount this item contributes to its section subtotal.
    fn total_value(&self) -> Decimal;

    /// Whether the row is filled in enough to be persisted.
    fn is_complete(&self) -> bool;

    /// Recompute derived fields after the item was built from external data.
    fn recompute(&mut self);
}

/// Labour line; quantity is implicitly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "nome_servico", default)]
    pub name: String,
    #[serde(rename = "valor_unitario", default)]
    pub unit_value: Decimal,
    #[serde(rename = "valor_total", default)]
    pub total_value: Decimal,
}

impl ServiceItem {
    pub fn new(name: impl Into<String>, unit_value: Decimal) -> Self {
        let mut item = Self {
            id: None,
            name: name.into(),
            unit_value,
            total_value: Decimal::ZERO,
        };
        item.recompute();
        item
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_unit_value(&mut self, unit_value: Decimal) {
        self.unit_value = unit_value;
        self.recompute();
    }
}

impl Default for ServiceItem {
    fn default() -> Self {
        Self::new(String::new(), Decimal::ZERO)
    }
}

impl LineItem for ServiceItem {
    fn total_value(&self) -> Decimal {
        self.total_value
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.unit_value > Decimal::ZERO
    }

    fn recompute(&mut self) {
        self.total_value = round_currency(self.unit_value);
    }
}

/// Parts line; total is quantity times unit value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "nome_produto", default)]
    pub name: String,
    #[serde(rename = "quantidade", default = "default_quantity")]
    pub quantity: u32,
    #[serde(rename = "valor_unitario", default)]
    pub unit_value: Decimal,
    #[serde(rename = "valor_total", default)]
    pub total_value: Decimal,
}

fn default_quantity() -> u32 {
    1
}

impl ProductItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_value: Decimal) -> Self {
        let mut item = Self {
            id: None,
            name: name.into(),
            quantity: quantity.max(1),
            unit_value,
            total_value: Decimal::ZERO,
        };
        item.recompute();
        item
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Quantities below one are raised to one.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity.max(1);
        self.recompute();
    }

    pub fn set_unit_value(&mut self, unit_value: Decimal) {
        self.unit_value = unit_value;
        self.recompute();
    }
}

impl Default for ProductItem {
    fn default() -> Self {
        Self::new(String::new(), 1, Decimal::ZERO)
    }
}

impl LineItem for ProductItem {
    fn total_value(&self) -> Decimal {
        self.total_value
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.quantity >= 1 && self.unit_value > Decimal::ZERO
    }

    fn recompute(&mut self) {
        self.quantity = self.quantity.max(1);
        self.total_value = round_currency(Decimal::from(self.quantity) * self.unit_value);
    }
}

/// Out-of-pocket cost passed on to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "valor", default)]
    pub value: Decimal,
}

impl ExpenseItem {
    pub fn new(description: impl Into<String>, value: Decimal) -> Self {
        let mut item = Self {
            id: None,
            description: description.into(),
            value,
        };
        item.recompute();
        item
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_value(&mut self, value: Decimal) {
        self.value = value;
        self.recompute();
    }
}

impl LineItem for ExpenseItem {
    fn total_value(&self) -> Decimal {
        self.value
    }

    fn is_complete(&self) -> bool {
        !self.description.trim().is_empty() && self.value > Decimal::ZERO
    }

    fn recompute(&mut self) {
        self.value = round_currency(self.value);
    }
}

/// Drop rows that are not complete, keeping the order of the rest.
pub fn complete_items<T: LineItem + Clone>(items: &[T]) -> Vec<T> {
    items.iter().filter(|item| item.is_complete()).cloned().collect()
}
