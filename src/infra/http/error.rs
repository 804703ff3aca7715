use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::{
    catalog::CatalogError, error::ErrorReport, repos::RepoError,
};
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const TIMEOUT: &str = "timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// JSON error response of the catalog API.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        let report = ErrorReport::from_message(
            "infra::http::api",
            status,
            format!("{code}: {}", hint.as_deref().unwrap_or(message)),
        );
        Self {
            status,
            code,
            message,
            hint,
            report,
        }
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn with_report(mut self, report: ErrorReport) -> Self {
        self.report = report;
        self
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        let status = error.status_code();
        let report = ErrorReport::from_error("infra::http::catalog_error", status, &error);
        let api = match &error {
            CatalogError::ProductNotFound(_) => ApiError::not_found("Product not found"),
            CatalogError::VendorNotFound(_) => ApiError::not_found("Vendor not found"),
            CatalogError::Domain(DomainError::Validation { message }) => ApiError::new(
                status,
                codes::INVALID_INPUT,
                "Validation failed",
                Some(message.clone()),
            ),
            CatalogError::Repo(repo) => match repo {
                RepoError::NotFound => ApiError::not_found("Resource not found"),
                RepoError::InvalidInput { message } => ApiError::new(
                    status,
                    codes::INVALID_INPUT,
                    "Invalid input",
                    Some(message.clone()),
                ),
                RepoError::Timeout => ApiError::new(
                    status,
                    codes::TIMEOUT,
                    "Data source timeout",
                    Some("Retry the request".to_string()),
                ),
                RepoError::Persistence(_) => {
                    ApiError::new(status, codes::REPO, "Persistence error", None)
                }
            },
        };
        api.with_report(report)
    }
}

impl ApiError {
    fn rejected(status: StatusCode, message: &'static str, detail: String) -> Self {
        let status = if status.is_client_error() {
            status
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::new(status, codes::INVALID_INPUT, message, Some(detail))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(
            rejection.status(),
            "Invalid query parameters",
            rejection.body_text(),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), "Invalid path", rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(
            rejection.status(),
            "Invalid request body",
            rejection.body_text(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
