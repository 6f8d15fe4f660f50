#![allow(dead_code)]

use order_service::services::RestBackend;
use serde_json::{json, Value};
use service_core::http::RetryConfig;
use std::sync::Once;
use std::time::Duration;
use wiremock::MockServer;

pub const TEST_CLIENT_ID: &str = "1b2c3d4e-5f60-4a1b-9c2d-3e4f5a6b7c8d";
pub const TEST_ORDER_ID: &str = "9a4b6f1e-5d2c-4f1a-8a3b-2c1d0e9f8a7b";
pub const TEST_ORDER_NUMBER: &str = "OS-202508-00001";

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Retry policy with short backoffs so tests stay fast.
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        add_jitter: false,
    }
}

pub fn backend_for(server: &MockServer, max_retries: u32) -> RestBackend {
    RestBackend::new(server.uri(), Duration::from_secs(2), fast_retry(max_retries))
}

pub fn ok(data: Value) -> Value {
    json!({ "ok": true, "data": data })
}

pub fn failure(code: &str, message: &str) -> Value {
    json!({ "ok": false, "error": { "code": code, "message": message } })
}

pub fn client_json() -> Value {
    json!({
        "id": TEST_CLIENT_ID,
        "nome": "Maria Silva",
        "telefone": "+5511999998888",
        "email": "maria@example.com",
        "importado_da_agenda": false,
        "created_at": "2025-08-01T12:00:00Z",
        "updated_at": "2025-08-01T12:00:00Z"
    })
}

/// Persisted order with every relation resolved.
pub fn order_json() -> Value {
    json!({
        "id": TEST_ORDER_ID,
        "os_numero_humano": TEST_ORDER_NUMBER,
        "cliente_id": TEST_CLIENT_ID,
        "data": "2025-08-10T12:00:00Z",
        "status": "aberta",
        "forma_pagamento": "PIX",
        "garantia": "90 dias",
        "observacoes": "Cliente relatou ruído ao frear. Verificar pastilhas e discos na próxima revisão.",
        "total_servicos": 50,
        "total_produtos": 30,
        "total_despesas": 10,
        "total_geral": 90,
        "sync_status": "synced",
        "deleted_at": null,
        "created_at": "2025-08-10T12:00:00Z",
        "updated_at": "2025-08-10T12:00:00Z",
        "clientes": client_json(),
        "equipamento_os": [{ "tipo": "Carro", "marca": "Fiat", "modelo": "Uno", "numero_serie": "9BD123" }],
        "servicos_os": [
            { "nome_servico": "Troca de óleo", "valor_unitario": 50, "valor_total": 50 }
        ],
        "produtos_os": [
            { "nome_produto": "Óleo 5W30", "quantidade": 1, "valor_unitario": 30, "valor_total": 30 }
        ],
        "despesas_os": [
            { "descricao": "Deslocamento", "valor": 10 }
        ]
    })
}

pub fn company_json() -> Value {
    json!({
        "nome_fantasia": "Oficina Central",
        "cnpj": "12.345.678/0001-90",
        "telefone": "1133334444",
        "endereco": "Rua das Flores, 100 - São Paulo/SP",
        "logo_empresa": null
    })
}
