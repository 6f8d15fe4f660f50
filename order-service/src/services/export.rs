use crate::error::OrderError;
use crate::models::CompanyProfile;
use crate::services::api_client::OrderBackend;
use crate::services::pdf::DocumentRenderer;
use crate::services::share::FileShare;
use std::path::PathBuf;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Fetch an order and the company profile, render the document and write it
/// to the export directory. A missing or unreachable company profile falls
/// back to `fallback`.
#[instrument(skip(backend, renderer, fallback, files))]
pub async fn export_order_pdf(
    backend: &dyn OrderBackend,
    renderer: &DocumentRenderer,
    order_id: Uuid,
    fallback: Option<&CompanyProfile>,
    files: &FileShare,
) -> Result<PathBuf, OrderError> {
    let order = backend.get_order(order_id).await?;

    let company = match backend.get_company_profile().await {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => fallback.cloned(),
        Err(e) => {
            warn!(error = %e, "Company profile unavailable; using configured fallback");
            fallback.cloned()
        }
    };

    let document = renderer.render(&order, company.as_ref()).await?;
    let path = files.write(&document.file_name, &document.bytes).await?;

    info!(
        number = %order.number,
        pages = document.pages,
        path = %path.display(),
        "Order document exported"
    );
    Ok(path)
}
