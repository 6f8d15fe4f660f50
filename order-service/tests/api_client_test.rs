//! REST backend client tests: envelope decoding, retries, deadlines and connectivity.

mod common;

use common::{backend_for, client_json, company_json, failure, init_tracing, ok, order_json};
use order_service::error::OrderError;
use order_service::models::{ErrorCode, ListClientsFilter, ListOrdersFilter, OrderStatus};
use order_service::services::{Connectivity, OrderBackend, RestBackend};
use serde_json::json;
use service_core::http::RetryClassifier;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn lists_clients_with_search_and_pagination() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api-clientes"))
        .and(query_param("query", "maria"))
        .and(query_param("page", "2"))
        .and(query_param("size", "10"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({
            "items": [client_json()],
            "pagination": { "page": 2, "size": 10, "total": 11, "pages": 2 }
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ListClientsFilter {
        query: Some(" maria ".to_string()),
        page: 2,
        size: 10,
    };
    let page = backend_for(&server, 0).list_clients(&filter).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Maria Silva");
    assert_eq!(page.pagination.total, 11);
}

#[tokio::test]
async fn lists_orders_by_status() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api-os"))
        .and(query_param("status", "aberta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(json!({
            "items": [order_json()],
            "pagination": { "page": 1, "size": 20, "total": 1, "pages": 1 }
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let filter = ListOrdersFilter {
        status: Some(OrderStatus::Open),
        ..ListOrdersFilter::default()
    };
    let page = backend_for(&server, 0).list_orders(&filter).await.unwrap();
    assert_eq!(page.items[0].status, OrderStatus::Open);
    assert_eq!(page.items[0].products.len(), 1);
}

#[tokio::test]
async fn retries_transient_server_errors() {
    init_tracing();
    let server = MockServer::start().await;
    let id = Uuid::parse_str(common::TEST_ORDER_ID).unwrap();

    Mock::given(method("GET"))
        .and(path(format!("/api-os/{id}")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(failure("INTERNAL_ERROR", "boom")),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api-os/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(order_json())))
        .expect(1)
        .mount(&server)
        .await;

    let order = backend_for(&server, 3).get_order(id).await.unwrap();
    assert_eq!(order.id, id);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api-os"))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let payload = order_service::wizard::OrderDraft::default()
        .to_payload(Uuid::new_v4(), OrderStatus::Draft);
    let err = backend_for(&server, 2)
        .create_order(&payload)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[tokio::test]
async fn conflicts_are_not_retried() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api-os"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(failure("DUPLICATE_NUMBER", "OS-202508-00001 already exists")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = order_service::wizard::OrderDraft::default()
        .to_payload(Uuid::new_v4(), OrderStatus::Open);
    let err = backend_for(&server, 3)
        .create_order(&payload)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::DuplicateNumber(_)));
}

#[tokio::test]
async fn slow_responses_surface_as_timeout() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api-configuracoes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok(company_json()))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let backend = RestBackend::new(
        server.uri(),
        Duration::from_millis(100),
        common::fast_retry(0),
    );
    let err = backend.get_company_profile().await.unwrap_err();
    assert!(matches!(err, OrderError::Timeout(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn missing_company_profile_is_none() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api-configuracoes"))
        .respond_with(ResponseTemplate::new(404).set_body_json(failure("NOT_FOUND", "none")))
        .mount(&server)
        .await;

    let profile = backend_for(&server, 0).get_company_profile().await.unwrap();
    assert!(profile.is_none());
}

#[tokio::test]
async fn status_change_and_delete() {
    init_tracing();
    let server = MockServer::start().await;
    let id = Uuid::parse_str(common::TEST_ORDER_ID).unwrap();

    let mut completed = order_json();
    completed["status"] = json!("concluida");
    Mock::given(method("PUT"))
        .and(path(format!("/api-os/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(completed)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api-os/{id}")))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, 0);
    let order = backend
        .update_order_status(id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    backend.delete_order(id).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body, json!({ "status": "concluida" }));
}

#[tokio::test]
async fn connectivity_follows_health_probe() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api-health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // Any HTTP answer means the backend is reachable.
    assert!(backend_for(&server, 0).is_online().await);

    let unreachable = RestBackend::new(
        "http://127.0.0.1:9",
        Duration::from_millis(500),
        common::fast_retry(0),
    );
    assert!(!unreachable.is_online().await);
}
