//! Currency arithmetic, parsing and pt-BR formatting.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Round to cents, half away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a user-typed money amount.
///
/// Accepts Brazilian (`1.234,56`) and plain (`1234.56`) notation, with or
/// without a `R$` prefix. Fraction digits beyond the second are dropped.
/// Anything unparseable yields zero.
pub fn parse_money(input: &str) -> Decimal {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let has_comma = cleaned.contains(',');
    let dot_count = cleaned.matches('.').count();

    let normalized = if has_comma {
        // comma is the decimal separator; dots are grouping
        let without_dots = cleaned.replace('.', "");
        match without_dots.rfind(',') {
            Some(pos) => {
                let (int_part, frac_part) = without_dots.split_at(pos);
                format!("{}.{}", int_part.replace(',', ""), &frac_part[1..])
            }
            None => without_dots,
        }
    } else if dot_count > 1 {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    let truncated = match normalized.split_once('.') {
        Some((int_part, frac_part)) => {
            let frac: String = frac_part.chars().take(2).collect();
            let int_part = if int_part.is_empty() { "0" } else { int_part };
            if frac.is_empty() {
                int_part.to_string()
            } else {
                format!("{int_part}.{frac}")
            }
        }
        None => normalized,
    };

    Decimal::from_str(&truncated).unwrap_or(Decimal::ZERO)
}

/// `R$ 1.234,56`
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_currency(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-R$ {grouped},{frac_part}")
    } else {
        format!("R$ {grouped},{frac_part}")
    }
}

/// `dd/mm/yyyy`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}
