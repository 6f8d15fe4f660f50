//! Services module for order-service.

pub mod api_client;
pub mod export;
pub mod metrics;
pub mod money;
pub mod offline;
pub mod pdf;
pub mod phone;
pub mod share;
pub mod submission;
pub mod totals;

pub use api_client::{OrderBackend, RestBackend};
pub use export::export_order_pdf;
pub use metrics::{get_metrics, init_metrics};
pub use offline::{Connectivity, OfflineStore, PendingDraft, StaticConnectivity};
pub use pdf::{printable_order, DocumentRenderer, RenderError, RenderedDocument};
pub use share::{
    status_update_message, FileShare, LinkOpener, ShareCollaborator, ShareOutcome, ShareRequest,
    WhatsAppShare,
};
pub use submission::{SubmissionOutcome, SubmissionPipeline, SubmitMode};
pub use totals::compute_totals;
