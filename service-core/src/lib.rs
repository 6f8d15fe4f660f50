//! service-core: Shared infrastructure for the service-order workspace.
pub mod config;
pub mod error;
pub mod http;
pub mod observability;

pub use tracing;
pub use validator;
