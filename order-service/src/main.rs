use anyhow::Context;
use order_service::config::OrderServiceConfig;
use order_service::services::{
    export_order_pdf, init_metrics, DocumentRenderer, FileShare, RestBackend,
};
use service_core::observability::init_tracing;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let order_id = std::env::args()
        .nth(1)
        .context("usage: order-export <order-id>")?;
    let order_id = Uuid::parse_str(&order_id).context("order id must be a UUID")?;

    let config = OrderServiceConfig::from_env()?;
    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;
    init_metrics();

    let backend = RestBackend::new(
        config.api_base_url.clone(),
        config.request_timeout(),
        config.retry_config(),
    );
    let mut renderer = DocumentRenderer::new(config.logo_timeout());
    if let Some(signatory) = &config.signatory {
        renderer = renderer.with_signatory(signatory.clone());
    }
    let files = FileShare::new(config.export_dir.clone());

    let path = export_order_pdf(
        &backend,
        &renderer,
        order_id,
        config.fallback_company.as_ref(),
        &files,
    )
    .await
    .map_err(|e| anyhow::anyhow!("{}: {e}", e.user_message()))?;

    println!("{}", path.display());
    Ok(())
}
