use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{
    application::{catalog::CatalogError, repos::RepoError},
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Diagnostic chain attached to error responses for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

impl RepoError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RepoError::NotFound => StatusCode::NOT_FOUND,
            RepoError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            RepoError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            RepoError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::ProductNotFound(_) | CatalogError::VendorNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CatalogError::Domain(DomainError::Validation { .. }) => StatusCode::BAD_REQUEST,
            CatalogError::Repo(err) => err.status_code(),
        }
    }
}

/// Failures surfaced by the binary outside of request handling.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
