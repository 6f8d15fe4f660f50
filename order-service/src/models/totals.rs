//! Derived order totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Section subtotals and grand total of an order.
///
/// Always produced by `services::totals::compute_totals`; a value read from the
/// backend is informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(rename = "total_servicos", default)]
    pub total_services: Decimal,
    #[serde(rename = "total_produtos", default)]
    pub total_products: Decimal,
    #[serde(rename = "total_despesas", default)]
    pub total_expenses: Decimal,
    #[serde(rename = "total_geral", default)]
    pub grand_total: Decimal,
}
