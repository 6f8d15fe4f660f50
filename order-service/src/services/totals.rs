//! Totals calculator.

use crate::models::{ExpenseItem, LineItem, ProductItem, ServiceItem, Totals};
use crate::services::money::round_currency;
use rust_decimal::Decimal;

fn section_total<T: LineItem>(items: &[T]) -> Decimal {
    round_currency(items.iter().map(LineItem::total_value).sum())
}

/// Derive the three section subtotals and the grand total.
pub fn compute_totals(
    services: &[ServiceItem],
    products: &[ProductItem],
    expenses: &[ExpenseItem],
) -> Totals {
    let total_services = section_total(services);
    let total_products = section_total(products);
    let total_expenses = section_total(expenses);

    Totals {
        total_services,
        total_products,
        total_expenses,
        grand_total: total_services + total_products + total_expenses,
    }
}
