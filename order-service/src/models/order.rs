//! Service order model for order-service.

use super::{Client, Equipment, ExpenseItem, ProductItem, ServiceItem, Totals};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

static ORDER_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^OS-\d{4}(0[1-9]|1[0-2])-\d{5}$").expect("valid order number regex"));

/// Order status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "rascunho")]
    Draft,
    #[serde(rename = "aberta")]
    Open,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "concluida")]
    Completed,
    #[serde(rename = "cancelada")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Open,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "rascunho",
            OrderStatus::Open => "aberta",
            OrderStatus::InProgress => "em_andamento",
            OrderStatus::Completed => "concluida",
            OrderStatus::Cancelled => "cancelada",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "aberta" => OrderStatus::Open,
            "em_andamento" => OrderStatus::InProgress,
            "concluida" => OrderStatus::Completed,
            "cancelada" => OrderStatus::Cancelled,
            _ => OrderStatus::Draft,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Rascunho",
            OrderStatus::Open => "Aberta",
            OrderStatus::InProgress => "Em Andamento",
            OrderStatus::Completed => "Concluída",
            OrderStatus::Cancelled => "Cancelada",
        }
    }
}

/// Statuses a wizard submission may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedStatus {
    Draft,
    Open,
}

impl From<RequestedStatus> for OrderStatus {
    fn from(status: RequestedStatus) -> Self {
        match status {
            RequestedStatus::Draft => OrderStatus::Draft,
            RequestedStatus::Open => OrderStatus::Open,
        }
    }
}

/// Synchronisation marker kept by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    #[default]
    Synced,
    Error,
}

/// Service order aggregate with its resolved relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    #[serde(rename = "os_numero_humano")]
    pub number: String,
    #[serde(rename = "cliente_id")]
    pub client_id: Uuid,
    #[serde(rename = "data")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(rename = "forma_pagamento", default)]
    pub payment_method: String,
    #[serde(rename = "garantia", default)]
    pub warranty: Option<String>,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub totals: Totals,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(
        rename = "clientes",
        default,
        deserialize_with = "one_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub client: Option<Client>,
    #[serde(
        rename = "equipamento_os",
        default,
        deserialize_with = "one_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub equipment: Option<Equipment>,
    #[serde(rename = "servicos_os", default, deserialize_with = "vec_or_null")]
    pub services: Vec<ServiceItem>,
    #[serde(rename = "produtos_os", default, deserialize_with = "vec_or_null")]
    pub products: Vec<ProductItem>,
    #[serde(rename = "despesas_os", default, deserialize_with = "vec_or_null")]
    pub expenses: Vec<ExpenseItem>,
}

impl Order {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Name of the exported document for this order.
    pub fn document_file_name(&self) -> String {
        format!("OS-{}.pdf", self.number)
    }
}

/// Payload sent to the backend to create or update an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    #[serde(rename = "cliente_id")]
    pub client_id: Uuid,
    #[serde(rename = "equipamento")]
    pub equipment: Option<Equipment>,
    #[serde(rename = "servicos")]
    pub services: Vec<ServiceItem>,
    #[serde(rename = "produtos")]
    pub products: Vec<ProductItem>,
    #[serde(rename = "despesas")]
    pub expenses: Vec<ExpenseItem>,
    #[serde(rename = "forma_pagamento")]
    pub payment_method: String,
    #[serde(rename = "garantia")]
    pub warranty: Option<String>,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    #[serde(rename = "data")]
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Filter parameters for listing orders.
#[derive(Debug, Clone, Serialize)]
pub struct ListOrdersFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub page: u32,
    pub size: u32,
}

impl Default for ListOrdersFilter {
    fn default() -> Self {
        Self {
            status: None,
            date_from: None,
            date_to: None,
            query: None,
            page: 1,
            size: 20,
        }
    }
}

/// Whether `number` has the `OS-YYYYMM-NNNNN` shape the backend generates.
pub fn is_valid_order_number(number: &str) -> bool {
    ORDER_NUMBER_RE.is_match(number)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// One-to-one relations come back as an object, a one-element array or null.
fn one_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(match value {
        Some(OneOrMany::One(item)) => Some(item),
        Some(OneOrMany::Many(items)) => items.into_iter().next(),
        None => None,
    })
}

fn vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
