use crate::models::CompanyProfile;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use service_core::config::Config as BaseConfig;
use service_core::http::RetryConfig;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, Validate)]
#[validate(schema(function = "backoff_ceiling_not_below_base"))]
pub struct OrderServiceConfig {
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    #[validate(length(min = 1, message = "API base URL must be set"))]
    pub api_base_url: String,
    #[validate(range(min = 1, message = "request timeout must be positive"))]
    pub request_timeout_ms: u64,
    pub retry_max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub logo_timeout_ms: u64,
    pub offline_dir: PathBuf,
    pub export_dir: PathBuf,
    pub fallback_company: Option<CompanyProfile>,
    pub signatory: Option<String>,
}

fn backoff_ceiling_not_below_base(config: &OrderServiceConfig) -> Result<(), ValidationError> {
    if config.retry_max_ms < config.retry_base_ms {
        let mut err = ValidationError::new("backoff_ceiling");
        err.message = Some("retry ceiling must not be below the base delay".into());
        return Err(err);
    }
    Ok(())
}

fn parse_or<T: FromStr>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v.trim().parse().with_context(|| format!("invalid value for {key}")),
        None => Ok(default),
    }
}

impl OrderServiceConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let base = BaseConfig::load()?;
        Self::from_lookup(&base, |key| env::var(key).ok())
    }

    /// Build from the base config and a variable lookup, then validate.
    pub fn from_lookup<F>(base: &BaseConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let fallback_company = text("ORDER_COMPANY_NAME").map(|trade_name| CompanyProfile {
            trade_name,
            tax_id: text("ORDER_COMPANY_CNPJ"),
            phone: text("ORDER_COMPANY_PHONE"),
            address: text("ORDER_COMPANY_ADDRESS"),
            logo_url: text("ORDER_COMPANY_LOGO_URL"),
        });

        let config = Self {
            service_name: "order-service".to_string(),
            environment: base.environment.clone(),
            log_level: text("ORDER_LOG_LEVEL").unwrap_or_else(|| base.log_level.clone()),
            otlp_endpoint: text("ORDER_OTLP_ENDPOINT"),
            api_base_url: lookup("ORDER_API_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8888/api".to_string())
                .trim()
                .trim_end_matches('/')
                .to_string(),
            request_timeout_ms: parse_or(lookup("ORDER_REQUEST_TIMEOUT_MS"), 10_000, "ORDER_REQUEST_TIMEOUT_MS")?,
            retry_max_retries: parse_or(lookup("ORDER_RETRY_MAX_RETRIES"), 3, "ORDER_RETRY_MAX_RETRIES")?,
            retry_base_ms: parse_or(lookup("ORDER_RETRY_BASE_MS"), 200, "ORDER_RETRY_BASE_MS")?,
            retry_max_ms: parse_or(lookup("ORDER_RETRY_MAX_MS"), 5_000, "ORDER_RETRY_MAX_MS")?,
            logo_timeout_ms: parse_or(lookup("ORDER_LOGO_TIMEOUT_MS"), 5_000, "ORDER_LOGO_TIMEOUT_MS")?,
            offline_dir: text("ORDER_OFFLINE_DIR")
                .unwrap_or_else(|| "./data/pending".to_string())
                .into(),
            export_dir: text("ORDER_EXPORT_DIR")
                .unwrap_or_else(|| "./exports".to_string())
                .into(),
            fallback_company,
            signatory: text("ORDER_SIGNATORY"),
        };

        config
            .validate()
            .context("invalid order-service configuration")?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn logo_timeout(&self) -> Duration {
        Duration::from_millis(self.logo_timeout_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_max_retries,
            initial_backoff: Duration::from_millis(self.retry_base_ms),
            max_backoff: Duration::from_millis(self.retry_max_ms),
            ..RetryConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<OrderServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OrderServiceConfig::from_lookup(&BaseConfig::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_valid() {
        let config = load(&[]).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_config().max_retries, 3);
        assert_eq!(config.log_level, "info");
        assert!(config.fallback_company.is_none());
    }

    #[test]
    fn reads_overrides_and_fallback_company() {
        let config = load(&[
            ("ORDER_API_BASE_URL", "https://api.example.com/"),
            ("ORDER_RETRY_MAX_RETRIES", "1"),
            ("ORDER_COMPANY_NAME", "Oficina Central"),
            ("ORDER_COMPANY_CNPJ", "12.345.678/0001-90"),
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.retry_config().max_retries, 1);
        let company = config.fallback_company.unwrap();
        assert_eq!(company.trade_name, "Oficina Central");
        assert_eq!(company.tax_id.as_deref(), Some("12.345.678/0001-90"));
        assert_eq!(company.phone, None);
    }

    #[test]
    fn rejects_empty_base_url() {
        assert!(load(&[("ORDER_API_BASE_URL", "  ")]).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(load(&[("ORDER_REQUEST_TIMEOUT_MS", "0")]).is_err());
    }

    #[test]
    fn rejects_ceiling_below_base() {
        assert!(load(&[("ORDER_RETRY_BASE_MS", "1000"), ("ORDER_RETRY_MAX_MS", "500")]).is_err());
    }

    #[test]
    fn rejects_unparseable_numbers() {
        assert!(load(&[("ORDER_REQUEST_TIMEOUT_MS", "ten")]).is_err());
    }
}
