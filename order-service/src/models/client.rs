//! Client model for order-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer who owns service orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    /// Stored normalized to E.164.
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "importado_da_agenda", default)]
    pub imported_from_contacts: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClient {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    pub email: Option<String>,
    #[serde(rename = "importado_da_agenda")]
    pub imported_from_contacts: bool,
}

/// Input for updating a client. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateClient {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Filter parameters for listing clients.
#[derive(Debug, Clone, Serialize)]
pub struct ListClientsFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub page: u32,
    pub size: u32,
}

impl Default for ListClientsFilter {
    fn default() -> Self {
        Self {
            query: None,
            page: 1,
            size: 20,
        }
    }
}

/// Contact picked from the device address book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}
