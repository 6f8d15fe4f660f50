//! Equipment model for order-service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Equipment being serviced; belongs to exactly one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "marca", default)]
    pub brand: Option<String>,
    #[serde(rename = "modelo", default)]
    pub model: Option<String>,
    #[serde(rename = "numero_serie", default)]
    pub serial_number: Option<String>,
}
