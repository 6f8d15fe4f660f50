//! Hand-off of finished orders to the outside world.
//!
//! Collaborators report an outcome instead of failing; the caller decides how
//! to tell the user.

use crate::models::{Order, OrderStatus};
use crate::services::pdf::RenderedDocument;
use crate::services::phone::{validate_phone, whatsapp_digits};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

const WHATSAPP_BASE: &str = "https://wa.me";

/// Text sent to the client when an order changes status.
pub fn status_update_message(client_name: &str, number: &str, status: OrderStatus) -> String {
    format!(
        "Olá {}! Sua OS {} foi atualizada. Status: {}.",
        client_name.trim(),
        number,
        status.label()
    )
}

/// `wa.me` deep link; `None` unless the phone is a valid number.
pub fn whatsapp_link(phone: &str, message: &str) -> Option<String> {
    validate_phone(phone).ok()?;
    let digits = whatsapp_digits(phone);
    Some(format!(
        "{WHATSAPP_BASE}/{digits}?text={}",
        urlencoding::encode(message)
    ))
}

#[derive(Debug, Clone, Default)]
pub struct ShareRequest {
    pub artifact: Option<Vec<u8>>,
    pub file_name: String,
    pub phone: String,
    pub message: String,
}

impl ShareRequest {
    /// Status notification for `order`, optionally carrying its document.
    pub fn for_order(order: &Order, document: Option<RenderedDocument>) -> Self {
        let (name, phone) = order
            .client
            .as_ref()
            .map(|c| (c.name.as_str(), c.phone.clone()))
            .unwrap_or(("", String::new()));
        let file_name = document
            .as_ref()
            .map(|d| d.file_name.clone())
            .unwrap_or_else(|| order.document_file_name());

        Self {
            artifact: document.map(|d| d.bytes),
            file_name,
            phone,
            message: status_update_message(name, &order.number, order.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Handed off; `target` is the link opened or the file written.
    Shared { target: String },
    Failed { reason: String },
}

impl ShareOutcome {
    pub fn is_shared(&self) -> bool {
        matches!(self, ShareOutcome::Shared { .. })
    }
}

#[async_trait]
pub trait ShareCollaborator: Send + Sync {
    async fn share(&self, request: &ShareRequest) -> ShareOutcome;
}

/// Platform hook that opens a URL (browser, intent, etc.).
#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open(&self, url: &str) -> anyhow::Result<()>;
}

/// Sends the message through a WhatsApp link. Artifacts cannot be attached
/// this way and are ignored.
pub struct WhatsAppShare<O> {
    opener: O,
}

impl<O: LinkOpener> WhatsAppShare<O> {
    pub fn new(opener: O) -> Self {
        Self { opener }
    }
}

#[async_trait]
impl<O: LinkOpener> ShareCollaborator for WhatsAppShare<O> {
    #[instrument(skip_all, fields(file_name = %request.file_name))]
    async fn share(&self, request: &ShareRequest) -> ShareOutcome {
        let Some(url) = whatsapp_link(&request.phone, &request.message) else {
            return ShareOutcome::Failed {
                reason: "Telefone do cliente ausente ou inválido".to_string(),
            };
        };
        match self.opener.open(&url).await {
            Ok(()) => {
                info!("WhatsApp link opened");
                ShareOutcome::Shared { target: url }
            }
            Err(e) => {
                warn!(error = %e, "Failed to open WhatsApp link");
                ShareOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Writes artifacts into a local directory.
#[derive(Debug, Clone)]
pub struct FileShare {
    dir: PathBuf,
}

impl FileShare {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` as `file_name`, creating the directory when missing.
    pub async fn write(&self, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[async_trait]
impl ShareCollaborator for FileShare {
    #[instrument(skip_all, fields(file_name = %request.file_name))]
    async fn share(&self, request: &ShareRequest) -> ShareOutcome {
        let Some(bytes) = request.artifact.as_deref() else {
            return ShareOutcome::Failed {
                reason: "Nenhum documento para salvar".to_string(),
            };
        };
        match self.write(&request.file_name, bytes).await {
            Ok(path) => {
                info!(path = %path.display(), "Document written");
                ShareOutcome::Shared {
                    target: path.display().to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to write document");
                ShareOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
