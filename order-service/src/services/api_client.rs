//! Persistence backend client.
//!
//! Every endpoint answers with the `{ ok, data?, error? }` envelope. Reads and
//! idempotency-keyed writes are retried on transient failures; each attempt
//! runs under its own deadline.

use crate::error::OrderError;
use crate::models::{
    ApiEnvelope, Client, CompanyProfile, CreateClient, ListClientsFilter, ListOrdersFilter, Order,
    OrderPayload, OrderStatus, Page, UpdateClient,
};
use crate::services::metrics::{API_REQUESTS_TOTAL, API_REQUEST_DURATION, API_RETRIES_TOTAL};
use crate::services::offline::Connectivity;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::http::{retry_http_call, RetryConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};
use uuid::Uuid;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const CLIENTS_PATH: &str = "/api-clientes";
const ORDERS_PATH: &str = "/api-os";
const COMPANY_PATH: &str = "/api-configuracoes";
const HEALTH_PATH: &str = "/api-health";

/// Operations the order core needs from the persistence service.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn list_clients(&self, filter: &ListClientsFilter) -> Result<Page<Client>, OrderError>;
    async fn get_client(&self, id: Uuid) -> Result<Client, OrderError>;
    async fn create_client(&self, input: &CreateClient) -> Result<Client, OrderError>;
    async fn update_client(&self, id: Uuid, input: &UpdateClient) -> Result<Client, OrderError>;
    async fn delete_client(&self, id: Uuid) -> Result<(), OrderError>;

    async fn list_orders(&self, filter: &ListOrdersFilter) -> Result<Page<Order>, OrderError>;
    async fn get_order(&self, id: Uuid) -> Result<Order, OrderError>;
    async fn create_order(&self, payload: &OrderPayload) -> Result<Order, OrderError>;
    async fn update_order(&self, id: Uuid, payload: &OrderPayload) -> Result<Order, OrderError>;
    async fn update_order_status(&self, id: Uuid, status: OrderStatus)
        -> Result<Order, OrderError>;
    async fn delete_order(&self, id: Uuid) -> Result<(), OrderError>;

    /// `None` when the business has not configured a profile yet.
    async fn get_company_profile(&self) -> Result<Option<CompanyProfile>, OrderError>;
}

#[derive(Serialize)]
struct StatusChange {
    status: OrderStatus,
}

type Query = Vec<(&'static str, String)>;

/// REST implementation of [`OrderBackend`].
#[derive(Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Liveness probe. Only a transport failure is an error; any HTTP answer counts as reachable.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<(), OrderError> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let send = self.http.get(&url).send();
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(response)) => {
                debug!(status = %response.status(), "Health probe answered");
                Ok(())
            }
            Ok(Err(e)) => Err(transport_error("health", e)),
            Err(_) => Err(deadline_error("health", self.timeout)),
        }
    }

    #[instrument(skip(self, query, body))]
    async fn call<T, B>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: Query,
        body: Option<&B>,
    ) -> Result<T, OrderError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        // one key per logical call, shared by all of its retries
        let idempotency_key = (method != Method::GET).then(|| Uuid::new_v4().to_string());
        let attempts = AtomicU32::new(0);
        let started = Instant::now();

        let result = retry_http_call(&self.retry, operation, || {
            if attempts.fetch_add(1, Ordering::SeqCst) > 0 {
                API_RETRIES_TOTAL.with_label_values(&[operation]).inc();
            }

            let mut request = self
                .http
                .request(method.clone(), &url)
                .header(reqwest::header::CONTENT_TYPE, "application/json");
            if !query.is_empty() {
                request = request.query(&query);
            }
            if let Some(key) = &idempotency_key {
                request = request.header(IDEMPOTENCY_KEY_HEADER, key.as_str());
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let timeout = self.timeout;
            async move {
                match tokio::time::timeout(timeout, execute::<T>(operation, request)).await {
                    Ok(result) => result,
                    Err(_) => Err(deadline_error(operation, timeout)),
                }
            }
        })
        .await;

        API_REQUEST_DURATION
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.code().as_str(),
        };
        API_REQUESTS_TOTAL
            .with_label_values(&[operation, outcome])
            .inc();

        result
    }
}

async fn execute<T: DeserializeOwned>(
    operation: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, OrderError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(operation, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(operation, e))?;

    debug!(operation, status = %status, "Backend response received");
    decode_envelope(status, &body)
}

/// Turn a raw backend answer into data or a typed error.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, OrderError> {
    let envelope: ApiEnvelope<serde_json::Value> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) => return Err(status_error(status, body)),
    };

    if !envelope.ok {
        return Err(match envelope.error {
            Some(error) => OrderError::from_api(error),
            None => status_error(status, body),
        });
    }

    let data = envelope.data.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(data)
        .map_err(|e| OrderError::Internal(format!("unexpected response payload: {e}")))
}

fn status_error(status: StatusCode, body: &str) -> OrderError {
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::NOT_FOUND => OrderError::NotFound(snippet),
        StatusCode::METHOD_NOT_ALLOWED => OrderError::MethodNotAllowed(snippet),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => OrderError::Timeout(snippet),
        _ => OrderError::Internal(format!("HTTP {status}: {snippet}")),
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> OrderError {
    if err.is_timeout() {
        OrderError::Timeout(format!("{operation}: {err}"))
    } else {
        OrderError::Network(format!("{operation}: {err}"))
    }
}

fn deadline_error(operation: &str, timeout: Duration) -> OrderError {
    OrderError::Timeout(format!(
        "{operation} exceeded {}ms deadline",
        timeout.as_millis()
    ))
}

fn page_query(query: Query, page: u32, size: u32) -> Query {
    let mut query = query;
    query.push(("page", page.to_string()));
    query.push(("size", size.to_string()));
    query
}

#[async_trait]
impl OrderBackend for RestBackend {
    async fn list_clients(&self, filter: &ListClientsFilter) -> Result<Page<Client>, OrderError> {
        let mut query = Query::new();
        if let Some(q) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            query.push(("query", q.trim().to_string()));
        }
        let query = page_query(query, filter.page, filter.size);
        self.call::<_, ()>("list_clients", Method::GET, CLIENTS_PATH, query, None)
            .await
    }

    async fn get_client(&self, id: Uuid) -> Result<Client, OrderError> {
        let path = format!("{CLIENTS_PATH}/{id}");
        self.call::<_, ()>("get_client", Method::GET, &path, Query::new(), None)
            .await
    }

    async fn create_client(&self, input: &CreateClient) -> Result<Client, OrderError> {
        self.call("create_client", Method::POST, CLIENTS_PATH, Query::new(), Some(input))
            .await
    }

    async fn update_client(&self, id: Uuid, input: &UpdateClient) -> Result<Client, OrderError> {
        let path = format!("{CLIENTS_PATH}/{id}");
        self.call("update_client", Method::PUT, &path, Query::new(), Some(input))
            .await
    }

    async fn delete_client(&self, id: Uuid) -> Result<(), OrderError> {
        let path = format!("{CLIENTS_PATH}/{id}");
        self.call::<serde_json::Value, ()>("delete_client", Method::DELETE, &path, Query::new(), None)
            .await
            .map(|_| ())
    }

    async fn list_orders(&self, filter: &ListOrdersFilter) -> Result<Page<Order>, OrderError> {
        let mut query = Query::new();
        if let Some(status) = filter.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(from) = filter.date_from {
            query.push(("date_from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = filter.date_to {
            query.push(("date_to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(q) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            query.push(("query", q.trim().to_string()));
        }
        let query = page_query(query, filter.page, filter.size);
        self.call::<_, ()>("list_orders", Method::GET, ORDERS_PATH, query, None)
            .await
    }

    async fn get_order(&self, id: Uuid) -> Result<Order, OrderError> {
        let path = format!("{ORDERS_PATH}/{id}");
        self.call::<_, ()>("get_order", Method::GET, &path, Query::new(), None)
            .await
    }

    async fn create_order(&self, payload: &OrderPayload) -> Result<Order, OrderError> {
        self.call("create_order", Method::POST, ORDERS_PATH, Query::new(), Some(payload))
            .await
    }

    async fn update_order(&self, id: Uuid, payload: &OrderPayload) -> Result<Order, OrderError> {
        let path = format!("{ORDERS_PATH}/{id}");
        self.call("update_order", Method::PUT, &path, Query::new(), Some(payload))
            .await
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let path = format!("{ORDERS_PATH}/{id}");
        let body = StatusChange { status };
        self.call("update_order_status", Method::PUT, &path, Query::new(), Some(&body))
            .await
    }

    async fn delete_order(&self, id: Uuid) -> Result<(), OrderError> {
        let path = format!("{ORDERS_PATH}/{id}");
        self.call::<serde_json::Value, ()>("delete_order", Method::DELETE, &path, Query::new(), None)
            .await
            .map(|_| ())
    }

    async fn get_company_profile(&self) -> Result<Option<CompanyProfile>, OrderError> {
        match self
            .call::<Option<CompanyProfile>, ()>(
                "get_company_profile",
                Method::GET,
                COMPANY_PATH,
                Query::new(),
                None,
            )
            .await
        {
            Ok(profile) => Ok(profile.filter(|p| !p.is_blank())),
            Err(OrderError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Connectivity for RestBackend {
    async fn is_online(&self) -> bool {
        match self.health().await {
            Ok(()) => true,
            Err(OrderError::Network(_) | OrderError::Timeout(_)) => false,
            Err(_) => true,
        }
    }
}
