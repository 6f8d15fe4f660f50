//! Phone normalisation to E.164, assuming Brazil when no country code is given.
//!
//! Digit-count table applied after stripping every non-digit:
//!
//! | digits                     | result                          |
//! |----------------------------|---------------------------------|
//! | input already began `+`    | `+` + digits                    |
//! | 13, starting with `55`     | `+` + digits                    |
//! | 10                         | `+55` + DD + `9` + subscriber   |
//! | 11                         | `+55` + digits                  |
//! | ≥12 starting with `55`     | `+` + digits                    |
//! | anything else              | `+55` + digits                  |

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use validator::ValidationError;

static E164_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 regex"));

const BRAZIL: &str = "55";

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Best-effort canonical form; see the module table. Does not validate.
pub fn normalize_phone(raw: &str) -> String {
    let digits = digits_of(raw);
    if raw.trim_start().starts_with('+') {
        return format!("+{digits}");
    }
    match digits.len() {
        13 if digits.starts_with(BRAZIL) => format!("+{digits}"),
        10 => format!("+{BRAZIL}{}9{}", &digits[..2], &digits[2..]),
        11 => format!("+{BRAZIL}{digits}"),
        n if n >= 12 && digits.starts_with(BRAZIL) => format!("+{digits}"),
        _ => format!("+{BRAZIL}{digits}"),
    }
}

pub fn is_e164(phone: &str) -> bool {
    E164_RE.is_match(phone)
}

/// Normalise and validate, returning the E.164 value or a field error.
pub fn validate_phone(raw: &str) -> Result<String, ValidationError> {
    if digits_of(raw).is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::from("Telefone é obrigatório"));
        return Err(err);
    }

    let normalized = normalize_phone(raw);
    if is_e164(&normalized) {
        Ok(normalized)
    } else {
        let mut err = ValidationError::new("e164");
        err.message = Some(Cow::from("Telefone inválido"));
        err.add_param(Cow::from("value"), &normalized);
        Err(err)
    }
}

/// Display mask `(XX) XXXXX-XXXX` for national numbers; longer input is returned as typed.
pub fn format_phone_display(raw: &str) -> String {
    let digits = digits_of(raw);
    if digits.len() > 11 {
        return raw.to_string();
    }
    match digits.len() {
        0..=2 => digits,
        3..=7 => format!("({}) {}", &digits[..2], &digits[2..]),
        _ => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
    }
}

/// Digits only, as expected by `wa.me` links.
pub fn whatsapp_digits(phone: &str) -> String {
    digits_of(&normalize_phone(phone))
}
