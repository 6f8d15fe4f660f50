//! Submission pipeline integration tests against a mock persistence backend.

mod common;

use common::{backend_for, client_json, failure, init_tracing, ok, order_json, TEST_CLIENT_ID};
use order_service::error::OrderError;
use order_service::models::{ProductItem, RequestedStatus, ServiceItem};
use order_service::services::{
    OfflineStore, StaticConnectivity, SubmissionOutcome, SubmissionPipeline, SubmitMode,
};
use order_service::wizard::{OrderDraft, Wizard};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn filled_wizard() -> Wizard {
    let mut wizard = Wizard::new();
    wizard.set_client_name("Maria Silva");
    wizard.set_client_phone("(11) 99999-8888");
    wizard.set_equipment_kind("Carro");
    wizard.add_service(ServiceItem::new("Troca de óleo", Decimal::from(50)));
    wizard.add_service(ServiceItem::new("", Decimal::ZERO));
    wizard.add_product(ProductItem::new("Óleo 5W30", 1, Decimal::from(30)));
    wizard.set_payment_method("PIX");
    wizard
}

fn pipeline(server: &MockServer, online: bool, offline_dir: &std::path::Path) -> SubmissionPipeline {
    SubmissionPipeline::new(
        Arc::new(backend_for(server, 2)),
        Arc::new(StaticConnectivity(online)),
        OfflineStore::new(offline_dir),
    )
}

#[tokio::test]
async fn creates_client_then_order_with_filtered_items() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api-clientes"))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok(client_json())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api-os"))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok(order_json())))
        .expect(1)
        .mount(&server)
        .await;

    let mut wizard = filled_wizard();
    let finalized = wizard.finalize(RequestedStatus::Open).unwrap();
    let pipeline = pipeline(&server, true, dir.path());

    let outcome = pipeline.submit(&finalized).await.unwrap();
    let SubmissionOutcome::Persisted(order) = outcome else {
        panic!("expected a persisted order");
    };
    assert_eq!(order.number, common::TEST_ORDER_NUMBER);
    assert!(!pipeline.is_submitting());

    let requests = server.received_requests().await.unwrap();
    let client_body: Value = requests[0].body_json().unwrap();
    assert_eq!(client_body["nome"], "Maria Silva");
    assert_eq!(client_body["telefone"], "+5511999998888");

    let order_body: Value = requests[1].body_json().unwrap();
    assert_eq!(order_body["cliente_id"], TEST_CLIENT_ID);
    assert_eq!(order_body["status"], "aberta");
    let services = order_body["servicos"].as_array().unwrap();
    assert_eq!(services.len(), 1);
    assert!(services
        .iter()
        .all(|s| !s["nome_servico"].as_str().unwrap_or_default().trim().is_empty()));
    assert_eq!(order_body["total_geral"].as_f64(), Some(80.0));

    // The wizard's own draft is untouched by submission.
    assert_eq!(wizard.draft().services.len(), 2);
}

#[tokio::test]
async fn selected_client_is_not_recreated_and_update_uses_put() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let order_id = Uuid::parse_str(common::TEST_ORDER_ID).unwrap();

    Mock::given(method("PUT"))
        .and(path(format!("/api-os/{order_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok(order_json())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api-clientes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok(client_json())))
        .expect(0)
        .mount(&server)
        .await;

    let mut draft = filled_wizard().draft().clone();
    draft.client.id = Some(Uuid::parse_str(TEST_CLIENT_ID).unwrap());

    let outcome = pipeline(&server, true, dir.path())
        .submit_draft(&draft, RequestedStatus::Draft, SubmitMode::Update(order_id))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Persisted(_)));
}

#[tokio::test]
async fn duplicate_client_is_surfaced_and_order_is_not_sent() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api-clientes"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(failure("DUPLICATE_CLIENT", "Cliente já existe")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api-os"))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok(order_json())))
        .expect(0)
        .mount(&server)
        .await;

    let mut wizard = filled_wizard();
    let finalized = wizard.finalize(RequestedStatus::Open).unwrap();
    let err = pipeline(&server, true, dir.path())
        .submit(&finalized)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::DuplicateClient(_)));
    assert_eq!(err.user_message(), "Cliente já existe com este telefone e nome");
}

#[tokio::test]
async fn offline_submission_is_stored_locally() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let mut wizard = filled_wizard();
    let finalized = wizard.finalize(RequestedStatus::Draft).unwrap();
    let outcome = pipeline(&server, false, dir.path())
        .submit(&finalized)
        .await
        .unwrap();

    let SubmissionOutcome::SavedOffline(pending) = &outcome else {
        panic!("expected an offline save");
    };
    assert_eq!(pending.mode, SubmitMode::Create);
    assert_eq!(
        outcome.user_message(RequestedStatus::Draft),
        "Rascunho salvo localmente. Será sincronizado quando houver conexão."
    );

    assert!(server.received_requests().await.unwrap().is_empty());
    let stored = OfflineStore::new(dir.path()).list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].draft, finalized.draft);
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_network() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let draft = OrderDraft::default();
    let err = pipeline(&server, true, dir.path())
        .submit_draft(&draft, RequestedStatus::Open, SubmitMode::Create)
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn second_submission_is_rejected_while_one_is_in_flight() {
    init_tracing();
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/api-clientes"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(ok(client_json()))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api-os"))
        .respond_with(ResponseTemplate::new(201).set_body_json(ok(order_json())))
        .mount(&server)
        .await;

    let mut wizard = filled_wizard();
    let finalized = wizard.finalize(RequestedStatus::Open).unwrap();
    let pipeline = pipeline(&server, true, dir.path());

    let first = pipeline.submit(&finalized);
    let second = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.submit(&finalized).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(matches!(second, Err(OrderError::SubmissionInProgress)));
    assert!(!pipeline.is_submitting());
}
