use crate::models::{ApiErrorBody, ErrorCode};
use crate::services::pdf::RenderError;
use service_core::error::AppError;
use service_core::http::RetryClassifier;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Rejected by backend: {message}")]
    RemoteValidation {
        message: String,
        details: Vec<String>,
    },

    #[error("Duplicate client: {0}")]
    DuplicateClient(String),

    #[error("Duplicate order number: {0}")]
    DuplicateNumber(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("A submission for this order is already in flight")]
    SubmissionInProgress,

    #[error("Local storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl OrderError {
    /// Map a backend error body to its kind.
    pub fn from_api(body: ApiErrorBody) -> Self {
        let message = body.message;
        match body.code {
            ErrorCode::ValidationError => OrderError::RemoteValidation {
                message,
                details: details_to_strings(body.details),
            },
            ErrorCode::DuplicateClient => OrderError::DuplicateClient(message),
            ErrorCode::DuplicateNumber => OrderError::DuplicateNumber(message),
            ErrorCode::NotFound => OrderError::NotFound(message),
            ErrorCode::NetworkError => OrderError::Network(message),
            ErrorCode::Timeout => OrderError::Timeout(message),
            ErrorCode::MethodNotAllowed => OrderError::MethodNotAllowed(message),
            ErrorCode::InternalError | ErrorCode::Unknown => OrderError::Internal(message),
        }
    }

    /// Wire code for this kind. Local-only kinds report the closest backend code.
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Validation(_) | OrderError::RemoteValidation { .. } => {
                ErrorCode::ValidationError
            }
            OrderError::DuplicateClient(_) => ErrorCode::DuplicateClient,
            OrderError::DuplicateNumber(_) => ErrorCode::DuplicateNumber,
            OrderError::NotFound(_) => ErrorCode::NotFound,
            OrderError::Network(_) => ErrorCode::NetworkError,
            OrderError::Timeout(_) => ErrorCode::Timeout,
            OrderError::MethodNotAllowed(_) => ErrorCode::MethodNotAllowed,
            OrderError::Internal(_)
            | OrderError::SubmissionInProgress
            | OrderError::Storage(_)
            | OrderError::Render(_) => ErrorCode::InternalError,
        }
    }

    /// Text shown to the user in the notification.
    pub fn user_message(&self) -> String {
        match self {
            OrderError::Validation(_) => "Verifique os campos destacados.".to_string(),
            OrderError::RemoteValidation { details, .. } if !details.is_empty() => {
                format!("Dados inválidos: {}", details.join(", "))
            }
            OrderError::RemoteValidation { .. } => {
                "Dados inválidos: Verifique os campos preenchidos".to_string()
            }
            OrderError::DuplicateClient(_) => {
                "Cliente já existe com este telefone e nome".to_string()
            }
            OrderError::DuplicateNumber(_) => {
                "Já existe uma OS com este número. Tente salvar novamente.".to_string()
            }
            OrderError::NotFound(_) => {
                "Registro não encontrado. Ele pode ter sido excluído.".to_string()
            }
            OrderError::Network(_) => "Erro de conexão. Verifique sua internet.".to_string(),
            OrderError::Timeout(_) => {
                "O servidor demorou para responder. Tente novamente.".to_string()
            }
            OrderError::MethodNotAllowed(_) => "Operação não permitida.".to_string(),
            OrderError::Internal(_) => {
                "Erro interno do servidor. Tente novamente em alguns instantes.".to_string()
            }
            OrderError::SubmissionInProgress => "Aguarde, a OS já está sendo salva.".to_string(),
            OrderError::Storage(_) => {
                "Não foi possível salvar a OS neste dispositivo.".to_string()
            }
            OrderError::Render(_) => "Não foi possível gerar o PDF da OS.".to_string(),
        }
    }
}

impl RetryClassifier for OrderError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderError::Network(_) | OrderError::Timeout(_) | OrderError::Internal(_)
        )
    }
}

impl From<std::io::Error> for OrderError {
    fn from(err: std::io::Error) -> Self {
        OrderError::Storage(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        OrderError::Storage(anyhow::Error::new(err))
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(e) => AppError::ValidationError(e),
            other => AppError::InternalError(anyhow::anyhow!(other.to_string())),
        }
    }
}

fn details_to_strings(details: Option<serde_json::Value>) -> Vec<String> {
    match details {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(serde_json::Value::String(s)) => vec![s],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: ErrorCode, details: Option<serde_json::Value>) -> ApiErrorBody {
        ApiErrorBody {
            code,
            message: "backend message".to_string(),
            details,
        }
    }

    #[test]
    fn maps_every_backend_code() {
        let cases = [
            ErrorCode::ValidationError,
            ErrorCode::DuplicateNumber,
            ErrorCode::DuplicateClient,
            ErrorCode::NotFound,
            ErrorCode::NetworkError,
            ErrorCode::Timeout,
            ErrorCode::MethodNotAllowed,
            ErrorCode::InternalError,
        ];
        for code in cases {
            assert_eq!(OrderError::from_api(body(code, None)).code(), code);
        }
        assert_eq!(
            OrderError::from_api(body(ErrorCode::Unknown, None)).code(),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn only_transient_kinds_are_retryable() {
        assert!(OrderError::Network("reset".into()).is_retryable());
        assert!(OrderError::Timeout("deadline".into()).is_retryable());
        assert!(OrderError::Internal("500".into()).is_retryable());
        assert!(!OrderError::DuplicateClient("dup".into()).is_retryable());
        assert!(!OrderError::NotFound("gone".into()).is_retryable());
        assert!(!OrderError::SubmissionInProgress.is_retryable());
    }

    #[test]
    fn validation_details_are_listed_in_message() {
        let err = OrderError::from_api(body(
            ErrorCode::ValidationError,
            Some(serde_json::json!(["cliente_id obrigatório", "forma_pagamento obrigatória"])),
        ));
        assert_eq!(
            err.user_message(),
            "Dados inválidos: cliente_id obrigatório, forma_pagamento obrigatória"
        );
    }

    #[test]
    fn converts_into_app_error() {
        let app: AppError = OrderError::NotFound("os".into()).into();
        assert!(matches!(app, AppError::InternalError(_)));
    }
}
