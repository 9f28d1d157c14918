use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use orchestra::OrchestraError;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Orchestration(#[from] OrchestraError),
    #[error("Bad Request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Orchestration(err) => match err {
                OrchestraError::Validation(_)
                | OrchestraError::Cycle { .. }
                | OrchestraError::DuplicateName(_)
                | OrchestraError::MalformedResponse(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "OrchestrationRejected")
                }
                OrchestraError::ReasoningService(_) => {
                    (StatusCode::BAD_GATEWAY, "ReasoningServiceError")
                }
                OrchestraError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "OrchestrationError"),
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.classify();

        let error_message = match &self {
            ApiError::Orchestration(err) if status_code.is_client_error() => err.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };
        if status_code.is_server_error() {
            tracing::error!("{}", error_message);
        }

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
