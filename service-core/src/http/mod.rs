pub mod retry;

pub use retry::{RetryClassifier, RetryConfig, retry_http_call};
