//! Repository traits describing data-source adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::specification::{Criteria, Includes, Ordering, PageWindow};
use crate::domain::Entity;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("data source timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Borrowed view of the parts of a specification a source acts on.
///
/// `window` is `None` when the caller wants every matching row.
pub struct SourceQuery<'a, T> {
    pub criteria: Option<&'a Criteria<T>>,
    pub includes: &'a Includes,
    pub ordering: Option<&'a Ordering<T>>,
    pub window: Option<PageWindow>,
}

impl<T> Clone for SourceQuery<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SourceQuery<'_, T> {}

/// Abstract queryable collection of `T`.
///
/// `fetch` applies, in order: criteria, includes, ordering, then the window.
/// Rows that tie on the ordering key keep the source's natural order.
#[async_trait]
pub trait QuerySource<T>: Send + Sync
where
    T: Send + Sync,
{
    async fn fetch(&self, query: SourceQuery<'_, T>) -> Result<Vec<T>, RepoError>;

    async fn count(&self, criteria: Option<&Criteria<T>>) -> Result<u64, RepoError>;
}

/// Identity-keyed writes used by mutation endpoints.
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    async fn get(&self, id: i32) -> Result<Option<T>, RepoError>;

    /// Store a new entity, assigning the next identity. Returns the stored row.
    async fn insert(&self, entity: T) -> Result<T, RepoError>;

    /// Replace the row with the same identity.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    async fn remove(&self, id: i32) -> Result<(), RepoError>;

    async fn exists(&self, id: i32) -> Result<bool, RepoError> {
        Ok(self.get(id).await?.is_some())
    }
}
