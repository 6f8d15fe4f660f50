//! Wizard state machine.
//!
//! A `Wizard` owns its draft exclusively. All mutation is synchronous; every
//! line item edit recomputes the derived totals before returning.

use super::validation::{validate_finalize, validate_step};
use super::{ClientDraft, OrderDraft, WizardStep};
use crate::models::{
    Client, ContactInfo, ExpenseItem, Order, ProductItem, RequestedStatus, ServiceItem, Totals,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;
use validator::ValidationErrors;

/// How a persisted order seeds a new wizard session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Edit the order in place.
    Edit,
    /// Start a new order from a copy.
    Duplicate,
}

/// A draft that passed the finalize gate, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedDraft {
    pub draft: OrderDraft,
    pub status: RequestedStatus,
    /// Order being edited, if any.
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct Wizard {
    step: WizardStep,
    draft: OrderDraft,
    errors: ValidationErrors,
    editing: Option<Uuid>,
    hydrated: bool,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_order(order: &Order, mode: Hydration) -> Self {
        let mut wizard = Self::new();
        wizard.hydrate(order, mode);
        wizard
    }

    /// Pre-populate every field from `source`. Only the first call has an
    /// effect; later changes to the source are not followed.
    pub fn hydrate(&mut self, source: &Order, mode: Hydration) -> bool {
        if self.hydrated {
            return false;
        }

        let mut draft = OrderDraft::from_order(source);
        match mode {
            Hydration::Edit => self.editing = Some(source.id),
            Hydration::Duplicate => {
                draft.detach_items();
                draft.date = Utc::now();
                self.editing = None;
            }
        }

        debug!(order_id = %source.id, ?mode, "Wizard hydrated from order");
        self.draft = draft;
        self.step = WizardStep::FIRST;
        self.errors = ValidationErrors::new();
        self.hydrated = true;
        true
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn ordinal(&self) -> u8 {
        self.step.ordinal()
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    pub fn editing(&self) -> Option<Uuid> {
        self.editing
    }

    pub fn totals(&self) -> Totals {
        self.draft.totals
    }

    /// Errors from the last failed gate.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// First message attached to `field`, if any.
    pub fn field_error(&self, field: &str) -> Option<String> {
        let fields = self.errors.field_errors();
        let first = fields.get(field)?.first()?;
        Some(
            first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| first.code.to_string()),
        )
    }

    /// Run the current step's gate and advance by one when it passes.
    /// The summary has no next step; use [`Wizard::finalize`] there.
    pub fn next(&mut self) -> bool {
        if self.step == WizardStep::LAST {
            return false;
        }
        match validate_step(self.step, &self.draft) {
            Ok(()) => {
                self.errors = ValidationErrors::new();
                self.step = self.step.next();
                true
            }
            Err(errors) => {
                debug!(step = self.step.ordinal(), "Step gate rejected");
                self.errors = errors;
                false
            }
        }
    }

    /// Go back one step. Never gated.
    pub fn previous(&mut self) {
        self.errors = ValidationErrors::new();
        self.step = self.step.previous();
    }

    /// Run the finalize gate. On success the caller owns a snapshot to submit;
    /// the wizard keeps its draft either way.
    pub fn finalize(&mut self, status: RequestedStatus) -> Result<FinalizedDraft, ValidationErrors> {
        self.draft.recompute_totals();
        match validate_finalize(&self.draft) {
            Ok(()) => {
                self.errors = ValidationErrors::new();
                Ok(FinalizedDraft {
                    draft: self.draft.clone(),
                    status,
                    order_id: self.editing,
                })
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    // client step

    pub fn select_client(&mut self, client: &Client) {
        self.draft.client = ClientDraft::from_client(client);
    }

    pub fn import_contact(&mut self, contact: &ContactInfo) {
        self.draft.client = ClientDraft::from_contact(contact);
    }

    /// Editing the name or phone detaches a previously selected client.
    pub fn set_client_name(&mut self, name: impl Into<String>) {
        self.draft.client.name = name.into();
        self.draft.client.id = None;
    }

    pub fn set_client_phone(&mut self, phone: impl Into<String>) {
        self.draft.client.phone = phone.into();
        self.draft.client.id = None;
    }

    pub fn set_client_email(&mut self, email: impl Into<String>) {
        let email = email.into();
        let trimmed = email.trim();
        self.draft.client.email = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    // equipment step

    pub fn set_equipment_kind(&mut self, kind: impl Into<String>) {
        self.draft.equipment.kind = kind.into();
    }

    pub fn set_equipment_brand(&mut self, brand: impl Into<String>) {
        self.draft.equipment.brand = brand.into();
    }

    pub fn set_equipment_model(&mut self, model: impl Into<String>) {
        self.draft.equipment.model = model.into();
    }

    pub fn set_equipment_serial(&mut self, serial_number: impl Into<String>) {
        self.draft.equipment.serial_number = serial_number.into();
    }

    // line items; out-of-range indexes are ignored and reported as false

    pub fn add_service(&mut self, item: ServiceItem) -> usize {
        self.draft.services.push(item);
        self.draft.recompute_totals();
        self.draft.services.len() - 1
    }

    pub fn set_service_name(&mut self, index: usize, name: impl Into<String>) -> bool {
        self.edit_service(index, |item| item.set_name(name))
    }

    pub fn set_service_value(&mut self, index: usize, unit_value: Decimal) -> bool {
        self.edit_service(index, |item| item.set_unit_value(unit_value))
    }

    pub fn remove_service(&mut self, index: usize) -> Option<ServiceItem> {
        let removed = remove_at(&mut self.draft.services, index);
        self.draft.recompute_totals();
        removed
    }

    fn edit_service(&mut self, index: usize, edit: impl FnOnce(&mut ServiceItem)) -> bool {
        let Some(item) = self.draft.services.get_mut(index) else {
            return false;
        };
        edit(item);
        self.draft.recompute_totals();
        true
    }

    pub fn add_product(&mut self, item: ProductItem) -> usize {
        self.draft.products.push(item);
        self.draft.recompute_totals();
        self.draft.products.len() - 1
    }

    pub fn set_product_name(&mut self, index: usize, name: impl Into<String>) -> bool {
        self.edit_product(index, |item| item.set_name(name))
    }

    pub fn set_product_quantity(&mut self, index: usize, quantity: u32) -> bool {
        self.edit_product(index, |item| item.set_quantity(quantity))
    }

    pub fn set_product_unit_value(&mut self, index: usize, unit_value: Decimal) -> bool {
        self.edit_product(index, |item| item.set_unit_value(unit_value))
    }

    pub fn remove_product(&mut self, index: usize) -> Option<ProductItem> {
        let removed = remove_at(&mut self.draft.products, index);
        self.draft.recompute_totals();
        removed
    }

    fn edit_product(&mut self, index: usize, edit: impl FnOnce(&mut ProductItem)) -> bool {
        let Some(item) = self.draft.products.get_mut(index) else {
            return false;
        };
        edit(item);
        self.draft.recompute_totals();
        true
    }

    pub fn add_expense(&mut self, item: ExpenseItem) -> usize {
        self.draft.expenses.push(item);
        self.draft.recompute_totals();
        self.draft.expenses.len() - 1
    }

    pub fn set_expense_description(
        &mut self,
        index: usize,
        description: impl Into<String>,
    ) -> bool {
        self.edit_expense(index, |item| item.set_description(description))
    }

    pub fn set_expense_value(&mut self, index: usize, value: Decimal) -> bool {
        self.edit_expense(index, |item| item.set_value(value))
    }

    pub fn remove_expense(&mut self, index: usize) -> Option<ExpenseItem> {
        let removed = remove_at(&mut self.draft.expenses, index);
        self.draft.recompute_totals();
        removed
    }

    fn edit_expense(&mut self, index: usize, edit: impl FnOnce(&mut ExpenseItem)) -> bool {
        let Some(item) = self.draft.expenses.get_mut(index) else {
            return false;
        };
        edit(item);
        self.draft.recompute_totals();
        true
    }

    // summary step

    pub fn set_payment_method(&mut self, payment_method: impl Into<String>) {
        self.draft.payment_method = payment_method.into();
    }

    pub fn set_warranty(&mut self, warranty: impl Into<String>) {
        self.draft.warranty = warranty.into();
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.draft.notes = notes.into();
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.draft.date = date;
    }
}

fn remove_at<T>(items: &mut Vec<T>, index: usize) -> Option<T> {
    (index < items.len()).then(|| items.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn filled_client(wizard: &mut Wizard) {
        wizard.set_client_name("Maria");
        wizard.set_client_phone("11999998888");
    }

    #[test]
    fn next_with_empty_phone_is_blocked_with_field_error() {
        let mut wizard = Wizard::new();
        wizard.set_client_name("Maria");

        assert!(!wizard.next());
        assert_eq!(wizard.ordinal(), 1);
        assert_eq!(wizard.field_error("phone").as_deref(), Some("Telefone é obrigatório"));
        assert!(wizard.field_error("name").is_none());
    }

    #[test]
    fn previous_on_first_step_is_a_no_op() {
        let mut wizard = Wizard::new();
        wizard.previous();
        assert_eq!(wizard.step(), WizardStep::Client);
    }

    #[test]
    fn walks_all_steps_and_clamps_at_summary() {
        let mut wizard = Wizard::new();
        filled_client(&mut wizard);
        assert!(wizard.next());

        assert!(!wizard.next());
        assert!(wizard.field_error("kind").is_some());
        wizard.set_equipment_kind("Notebook");
        assert!(wizard.next());

        assert!(wizard.next());
        assert!(wizard.next());
        assert!(wizard.next());
        assert_eq!(wizard.step(), WizardStep::Summary);

        wizard.add_service(ServiceItem::new("Formatação", d("120")));
        wizard.set_payment_method("Dinheiro");
        assert!(!wizard.next());
        assert_eq!(wizard.ordinal(), 6);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn previous_is_never_gated() {
        let mut wizard = Wizard::new();
        filled_client(&mut wizard);
        wizard.next();
        assert!(!wizard.next());

        wizard.previous();
        assert_eq!(wizard.step(), WizardStep::Client);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn item_edits_recompute_totals() {
        let mut wizard = Wizard::new();
        let s = wizard.add_service(ServiceItem::default());
        wizard.set_service_name(s, "Troca de óleo");
        wizard.set_service_value(s, d("50"));

        let p = wizard.add_product(ProductItem::default());
        wizard.set_product_name(p, "Óleo 5W30");
        wizard.set_product_unit_value(p, d("30"));

        let e = wizard.add_expense(ExpenseItem::default());
        wizard.set_expense_description(e, "Deslocamento");
        wizard.set_expense_value(e, d("10"));

        let totals = wizard.totals();
        assert_eq!(totals.total_services, d("50"));
        assert_eq!(totals.total_products, d("30"));
        assert_eq!(totals.total_expenses, d("10"));
        assert_eq!(totals.grand_total, d("90"));

        wizard.set_product_quantity(p, 3);
        assert_eq!(wizard.totals().total_products, d("90"));
        assert_eq!(wizard.totals().grand_total, d("150"));

        wizard.remove_service(s);
        assert_eq!(wizard.totals().grand_total, d("100"));
    }

    #[test]
    fn out_of_range_edits_are_ignored() {
        let mut wizard = Wizard::new();
        assert!(!wizard.set_service_value(3, d("10")));
        assert!(wizard.remove_product(0).is_none());
        assert_eq!(wizard.totals(), Totals::default());
    }

    #[test]
    fn finalize_rejects_order_without_services_or_products() {
        let mut wizard = Wizard::new();
        filled_client(&mut wizard);
        wizard.set_equipment_kind("Carro");
        wizard.set_payment_method("PIX");
        wizard.add_expense(ExpenseItem::new("Frete", d("10")));

        let errors = wizard.finalize(RequestedStatus::Open).unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
        assert_eq!(wizard.draft().expenses.len(), 1);
    }

    #[test]
    fn selecting_client_copies_identity_and_editing_detaches() {
        let client = Client {
            id: Uuid::new_v4(),
            name: "Maria".to_string(),
            phone: "+5511999998888".to_string(),
            email: Some("maria@example.com".to_string()),
            imported_from_contacts: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut wizard = Wizard::new();
        wizard.select_client(&client);
        assert_eq!(wizard.draft().client.id, Some(client.id));
        assert_eq!(wizard.draft().client.email.as_deref(), Some("maria@example.com"));

        wizard.set_client_phone("21988887777");
        assert_eq!(wizard.draft().client.id, None);
    }
}
