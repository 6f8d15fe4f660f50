//! Six-step order wizard: draft, gates and state machine.

mod draft;
mod state;
mod step;
pub mod validation;

pub use draft::{ClientDraft, EquipmentDraft, OrderDraft};
pub use state::{FinalizedDraft, Hydration, Wizard};
pub use step::WizardStep;
