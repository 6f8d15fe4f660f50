//! Order submission pipeline.
//!
//! Turns a finalized wizard draft into a persisted order: creates the client
//! when none was selected, drops incomplete rows, recomputes totals and sends
//! a create or update. When the backend is unreachable the draft goes to the
//! offline store instead. The caller's draft is never modified, so any failure
//! can be retried as-is.

use crate::error::OrderError;
use crate::models::{is_valid_order_number, CreateClient, Order, RequestedStatus};
use crate::services::api_client::OrderBackend;
use crate::services::metrics::SUBMISSIONS_TOTAL;
use crate::services::offline::{Connectivity, OfflineStore, PendingDraft};
use crate::services::phone::validate_phone;
use crate::wizard::validation::validate_finalize;
use crate::wizard::{ClientDraft, FinalizedDraft, OrderDraft};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "order_id", rename_all = "snake_case")]
pub enum SubmitMode {
    Create,
    Update(Uuid),
}

impl SubmitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Create => "create",
            SubmitMode::Update(_) => "update",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// The backend accepted the order.
    Persisted(Order),
    /// No connectivity; the draft was stored locally as pending sync.
    SavedOffline(PendingDraft),
}

impl SubmissionOutcome {
    pub fn user_message(&self, status: RequestedStatus) -> &'static str {
        match (self, status) {
            (SubmissionOutcome::SavedOffline(_), _) => {
                "Rascunho salvo localmente. Será sincronizado quando houver conexão."
            }
            (SubmissionOutcome::Persisted(_), RequestedStatus::Draft) => {
                "Rascunho salvo com sucesso."
            }
            (SubmissionOutcome::Persisted(_), RequestedStatus::Open) => {
                "Ordem de serviço salva e finalizada com sucesso."
            }
        }
    }
}

/// Releases the in-flight flag when the submission ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Submits drafts for one wizard session. At most one submission runs at a time.
pub struct SubmissionPipeline {
    backend: Arc<dyn OrderBackend>,
    connectivity: Arc<dyn Connectivity>,
    offline: OfflineStore,
    in_flight: AtomicBool,
}

impl SubmissionPipeline {
    pub fn new(
        backend: Arc<dyn OrderBackend>,
        connectivity: Arc<dyn Connectivity>,
        offline: OfflineStore,
    ) -> Self {
        Self {
            backend,
            connectivity,
            offline,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently running ("Save" should be disabled).
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(&self, finalized: &FinalizedDraft) -> Result<SubmissionOutcome, OrderError> {
        let mode = match finalized.order_id {
            Some(id) => SubmitMode::Update(id),
            None => SubmitMode::Create,
        };
        self.submit_draft(&finalized.draft, finalized.status, mode)
            .await
    }

    #[instrument(skip(self, draft, mode), fields(mode = mode.as_str(), status = ?status))]
    pub async fn submit_draft(
        &self,
        draft: &OrderDraft,
        status: RequestedStatus,
        mode: SubmitMode,
    ) -> Result<SubmissionOutcome, OrderError> {
        let _guard =
            InFlightGuard::acquire(&self.in_flight).ok_or(OrderError::SubmissionInProgress)?;

        let result = self.run(draft, status, mode).await;

        let outcome = match &result {
            Ok(SubmissionOutcome::Persisted(_)) => "persisted",
            Ok(SubmissionOutcome::SavedOffline(_)) => "offline",
            Err(e) => e.code().as_str(),
        };
        SUBMISSIONS_TOTAL
            .with_label_values(&[mode.as_str(), outcome])
            .inc();

        if let Err(e) = &result {
            warn!(error = %e, "Order submission failed; draft kept for retry");
        }
        result
    }

    async fn run(
        &self,
        draft: &OrderDraft,
        status: RequestedStatus,
        mode: SubmitMode,
    ) -> Result<SubmissionOutcome, OrderError> {
        validate_finalize(draft)?;

        if !self.connectivity.is_online().await {
            let pending = self.offline.save(draft, status, mode).await?;
            return Ok(SubmissionOutcome::SavedOffline(pending));
        }

        let client_id = self.ensure_client(&draft.client).await?;
        let payload = draft.to_payload(client_id, status.into());

        let order = match mode {
            SubmitMode::Create => self.backend.create_order(&payload).await?,
            SubmitMode::Update(id) => self.backend.update_order(id, &payload).await?,
        };

        if !is_valid_order_number(&order.number) {
            warn!(order_id = %order.id, number = %order.number, "Backend returned an unexpected order number");
        }
        info!(
            order_id = %order.id,
            number = %order.number,
            grand_total = %order.totals.grand_total,
            "Order persisted"
        );
        Ok(SubmissionOutcome::Persisted(order))
    }

    /// Id of the draft's client, creating the record when none was selected.
    async fn ensure_client(&self, client: &ClientDraft) -> Result<Uuid, OrderError> {
        if let Some(id) = client.id {
            return Ok(id);
        }

        let phone = validate_phone(&client.phone).map_err(|err| {
            let mut errors = ValidationErrors::new();
            errors.add("phone", err);
            OrderError::Validation(errors)
        })?;

        let input = CreateClient {
            name: client.name.trim().to_string(),
            phone,
            email: client.email.clone(),
            imported_from_contacts: client.imported_from_contacts,
        };
        let created = self.backend.create_client(&input).await?;
        info!(client_id = %created.id, "Client created during submission");
        Ok(created.id)
    }
}
