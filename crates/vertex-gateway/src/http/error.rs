//! Error responses: `{ "success": false, "error": "..." }` plus a status code

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::GatewayError;
use crate::workflow::WorkflowExecuteError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": message.into() }),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::NotConfigured | GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
        GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Upstream(_) | GatewayError::Serialization(_) | GatewayError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self::new(status_for(&error), error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::validation(format!("invalid request body: {}", rejection.body_text())).into()
    }
}

impl From<WorkflowExecuteError> for ApiError {
    fn from(error: WorkflowExecuteError) -> Self {
        match error {
            WorkflowExecuteError::Gateway(e) => e.into(),
            WorkflowExecuteError::Failed(failure) => {
                let status = if failure.error.is_validation() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                Self {
                    status,
                    body: json!({
                        "success": false,
                        "error": failure.error.to_string(),
                        "nodeResults": failure.node_results,
                        "errors": failure.errors,
                    }),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, body = %self.body, "Request failed");
        } else {
            debug!(status = %self.status, body = %self.body, "Request rejected");
        }
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{WorkflowError, WorkflowFailure};

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(GatewayError::NotConfigured).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(GatewayError::validation("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GatewayError::Forbidden("x".into())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(GatewayError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(GatewayError::Upstream("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_workflow_failure_mapping() {
        let validation = ApiError::from(WorkflowExecuteError::Failed(WorkflowFailure::from(
            WorkflowError::NoStartNodes,
        )));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let aborted = ApiError::from(WorkflowExecuteError::Failed(WorkflowFailure::from(
            WorkflowError::UnknownNode {
                edge_id: "e".into(),
                node_id: "n".into(),
            },
        )));
        assert_eq!(aborted.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(aborted.body["success"], false);
        assert!(aborted.body["nodeResults"].is_object());
    }
}
