//! In-progress order draft owned by a wizard session.

use crate::models::{
    complete_items, Client, ContactInfo, Equipment, ExpenseItem, LineItem, Order, OrderPayload,
    OrderStatus, ProductItem, ServiceItem, Totals,
};
use crate::services::phone::validate_phone;
use crate::services::totals::compute_totals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn required(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("required");
    err.message = Some(Cow::from(message));
    err
}

fn client_name_present(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(required("Nome é obrigatório"));
    }
    Ok(())
}

fn client_phone_valid(phone: &str) -> Result<(), ValidationError> {
    validate_phone(phone).map(|_| ())
}

fn equipment_kind_present(kind: &str) -> Result<(), ValidationError> {
    if kind.trim().is_empty() {
        return Err(required("Tipo é obrigatório"));
    }
    Ok(())
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Client step fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClientDraft {
    /// Set when an existing client was selected.
    pub id: Option<Uuid>,
    #[validate(custom(function = "client_name_present"))]
    pub name: String,
    #[validate(custom(function = "client_phone_valid"))]
    pub phone: String,
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    #[serde(default)]
    pub imported_from_contacts: bool,
}

impl ClientDraft {
    pub fn from_client(client: &Client) -> Self {
        Self {
            id: Some(client.id),
            name: client.name.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            imported_from_contacts: client.imported_from_contacts,
        }
    }

    pub fn from_contact(contact: &ContactInfo) -> Self {
        Self {
            id: None,
            name: contact.name.trim().to_string(),
            phone: contact.phone.clone(),
            email: contact.email.as_deref().and_then(blank_to_none),
            imported_from_contacts: true,
        }
    }
}

/// Equipment step fields. Optional text stays empty until filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EquipmentDraft {
    #[validate(custom(function = "equipment_kind_present"))]
    pub kind: String,
    pub brand: String,
    pub model: String,
    pub serial_number: String,
}

impl EquipmentDraft {
    pub fn from_equipment(equipment: &Equipment) -> Self {
        Self {
            kind: equipment.kind.clone(),
            brand: equipment.brand.clone().unwrap_or_default(),
            model: equipment.model.clone().unwrap_or_default(),
            serial_number: equipment.serial_number.clone().unwrap_or_default(),
        }
    }

    /// `None` when no type was given.
    pub fn to_equipment(&self) -> Option<Equipment> {
        let kind = blank_to_none(&self.kind)?;
        Some(Equipment {
            id: None,
            kind,
            brand: blank_to_none(&self.brand),
            model: blank_to_none(&self.model),
            serial_number: blank_to_none(&self.serial_number),
        })
    }
}

/// Everything the wizard collects before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub client: ClientDraft,
    pub equipment: EquipmentDraft,
    pub services: Vec<ServiceItem>,
    pub products: Vec<ProductItem>,
    pub expenses: Vec<ExpenseItem>,
    pub payment_method: String,
    pub warranty: String,
    pub notes: String,
    pub date: DateTime<Utc>,
    /// Advisory; recomputed on every item edit and again at submission.
    pub totals: Totals,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            client: ClientDraft::default(),
            equipment: EquipmentDraft::default(),
            services: Vec::new(),
            products: Vec::new(),
            expenses: Vec::new(),
            payment_method: String::new(),
            warranty: String::new(),
            notes: String::new(),
            date: Utc::now(),
            totals: Totals::default(),
        }
    }
}

impl OrderDraft {
    /// Copy every field of a persisted order.
    pub fn from_order(order: &Order) -> Self {
        let client = match &order.client {
            Some(client) => ClientDraft::from_client(client),
            None => ClientDraft {
                id: Some(order.client_id),
                ..ClientDraft::default()
            },
        };

        let mut draft = Self {
            client,
            equipment: order
                .equipment
                .as_ref()
                .map(EquipmentDraft::from_equipment)
                .unwrap_or_default(),
            services: order.services.clone(),
            products: order.products.clone(),
            expenses: order.expenses.clone(),
            payment_method: order.payment_method.clone(),
            warranty: order.warranty.clone().unwrap_or_default(),
            notes: order.notes.clone().unwrap_or_default(),
            date: order.date,
            totals: Totals::default(),
        };
        draft.services.iter_mut().for_each(LineItem::recompute);
        draft.products.iter_mut().for_each(LineItem::recompute);
        draft.expenses.iter_mut().for_each(LineItem::recompute);
        draft.recompute_totals();
        draft
    }

    /// Strip persisted identities so the copy becomes a new order.
    pub fn detach_items(&mut self) {
        self.services.iter_mut().for_each(|item| item.id = None);
        self.products.iter_mut().for_each(|item| item.id = None);
        self.expenses.iter_mut().for_each(|item| item.id = None);
    }

    pub fn recompute_totals(&mut self) {
        self.totals = compute_totals(&self.services, &self.products, &self.expenses);
    }

    pub fn complete_services(&self) -> Vec<ServiceItem> {
        complete_items(&self.services)
    }

    pub fn complete_products(&self) -> Vec<ProductItem> {
        complete_items(&self.products)
    }

    pub fn complete_expenses(&self) -> Vec<ExpenseItem> {
        complete_items(&self.expenses)
    }

    /// Build the persistence payload from the complete rows only, with freshly computed totals.
    pub fn to_payload(&self, client_id: Uuid, status: OrderStatus) -> OrderPayload {
        let services = self.complete_services();
        let products = self.complete_products();
        let expenses = self.complete_expenses();
        let totals = compute_totals(&services, &products, &expenses);

        OrderPayload {
            client_id,
            equipment: self.equipment.to_equipment(),
            services,
            products,
            expenses,
            payment_method: self.payment_method.trim().to_string(),
            warranty: blank_to_none(&self.warranty),
            notes: blank_to_none(&self.notes),
            date: self.date,
            status,
            totals,
        }
    }
}
