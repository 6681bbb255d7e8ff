use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

use crate::attribution::AggregationError;
use crate::model::ModelInvocationError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] ModelInvocationError),
}

impl ResponseError for AnalysisError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::InvalidInput(_) | AnalysisError::Aggregation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Storage(StorageError::UnsupportedFormat { .. }) => StatusCode::BAD_REQUEST,
            AnalysisError::Storage(StorageError::FileTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AnalysisError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AnalysisError::ModelInvocation(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
