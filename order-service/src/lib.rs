//! order-service: service-order core.
//!
//! Guided order drafting, totals, submission to the persistence backend,
//! offline fallback and document export.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod wizard;

pub use error::OrderError;
