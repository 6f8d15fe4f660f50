//! Step gates.
//!
//! Every gate returns field-level errors keyed by the draft field name, so a
//! caller can attach each message to its input.

use super::{OrderDraft, WizardStep};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// Key used for the "at least one service or product" rule.
pub const ITEMS_FIELD: &str = "items";
pub const PAYMENT_METHOD_FIELD: &str = "payment_method";

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

fn absorb(into: &mut ValidationErrors, result: Result<(), ValidationErrors>) {
    if let Err(errors) = result {
        into.errors_mut().extend(errors.into_errors());
    }
}

fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Gate run by "Next" on `step`. Item steps have no gate and the summary is
/// gated by [`validate_finalize`] instead.
pub fn validate_step(step: WizardStep, draft: &OrderDraft) -> Result<(), ValidationErrors> {
    match step {
        WizardStep::Client => draft.client.validate(),
        WizardStep::Equipment => draft.equipment.validate(),
        WizardStep::Services
        | WizardStep::Products
        | WizardStep::Expenses
        | WizardStep::Summary => Ok(()),
    }
}

/// Gate run before submission: every earlier gate plus the summary rules.
///
/// Incomplete rows are ignored here; they are dropped from the payload rather
/// than rejected.
pub fn validate_finalize(draft: &OrderDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    absorb(&mut errors, draft.client.validate());
    absorb(&mut errors, draft.equipment.validate());

    if draft.complete_services().is_empty() && draft.complete_products().is_empty() {
        errors.add(
            ITEMS_FIELD,
            error("min_items", "Adicione pelo menos um serviço ou produto"),
        );
    }

    if draft.payment_method.trim().is_empty() {
        errors.add(
            PAYMENT_METHOD_FIELD,
            error("required", "Forma de pagamento é obrigatória"),
        );
    }

    into_result(errors)
}
