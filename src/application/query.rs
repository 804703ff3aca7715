//! Specification executor.
//!
//! Translates a [`Specification`] into [`QuerySource`] calls. Without the
//! distinct flag the page window is pushed down to the source; with it, rows
//! are fetched unwindowed, deduplicated (first occurrence wins) and then
//! windowed here so `skip`/`take` count distinct rows.

use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, instrument, warn};

use crate::application::{
    pagination::Pagination,
    repos::{QuerySource, RepoError, SourceQuery},
    specification::{PageWindow, ProjectedSpecification, Specification},
};

pub struct QueryExecutor<T> {
    source: Arc<dyn QuerySource<T>>,
    timeout: Option<Duration>,
}

impl<T> Clone for QueryExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            timeout: self.timeout,
        }
    }
}

impl<T> QueryExecutor<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn QuerySource<T>>) -> Self {
        Self {
            source,
            timeout: None,
        }
    }

    /// Bound every source call; an elapsed call surfaces as [`RepoError::Timeout`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(
        skip_all,
        fields(distinct = spec.is_distinct(), skip = spec.skip(), take = ?spec.take())
    )]
    pub async fn list(&self, spec: &Specification<T>) -> Result<Vec<T>, RepoError> {
        if !spec.is_distinct() {
            let rows = self
                .guarded("list", self.source.fetch(source_query(spec, spec.window())))
                .await?;
            debug!(rows = rows.len(), "list executed");
            return Ok(rows);
        }

        let rows = self
            .guarded("list", self.source.fetch(source_query(spec, None)))
            .await?;
        let rows = apply_window(dedupe(rows), spec.window());
        debug!(rows = rows.len(), "distinct list executed");
        Ok(rows)
    }

    #[instrument(skip_all, fields(distinct = spec.specification().is_distinct()))]
    pub async fn list_projected<R>(
        &self,
        spec: &ProjectedSpecification<T, R>,
    ) -> Result<Vec<R>, RepoError>
    where
        R: PartialEq,
    {
        let inner = spec.specification();
        if !inner.is_distinct() {
            let rows = self
                .guarded(
                    "list_projected",
                    self.source.fetch(source_query(inner, inner.window())),
                )
                .await?;
            return Ok(rows.iter().map(|row| spec.project(row)).collect());
        }

        let rows = self
            .guarded("list_projected", self.source.fetch(source_query(inner, None)))
            .await?;
        let projected = rows.iter().map(|row| spec.project(row)).collect();
        Ok(apply_window(dedupe(projected), inner.window()))
    }

    /// Cardinality of the criteria. Ordering and paging are ignored.
    #[instrument(skip_all, fields(distinct = spec.is_distinct()))]
    pub async fn count(&self, spec: &Specification<T>) -> Result<u64, RepoError> {
        if !spec.is_distinct() {
            return self
                .guarded("count", self.source.count(spec.criteria()))
                .await;
        }

        let rows = self
            .guarded("count", self.source.fetch(unordered_query(spec)))
            .await?;
        Ok(dedupe(rows).len() as u64)
    }

    #[instrument(skip_all, fields(distinct = spec.specification().is_distinct()))]
    pub async fn count_projected<R>(
        &self,
        spec: &ProjectedSpecification<T, R>,
    ) -> Result<u64, RepoError>
    where
        R: PartialEq,
    {
        let inner = spec.specification();
        if !inner.is_distinct() {
            return self
                .guarded("count_projected", self.source.count(inner.criteria()))
                .await;
        }

        let rows = self
            .guarded("count_projected", self.source.fetch(unordered_query(inner)))
            .await?;
        let projected = rows.iter().map(|row| spec.project(row)).collect();
        Ok(dedupe(projected).len() as u64)
    }

    /// First matching row after ordering, or `None` when nothing matches.
    #[instrument(skip_all)]
    pub async fn single(&self, spec: &Specification<T>) -> Result<Option<T>, RepoError> {
        let rows = self
            .guarded(
                "single",
                self.source
                    .fetch(source_query(spec, Some(PageWindow::new(0, 1)))),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip_all)]
    pub async fn single_projected<R>(
        &self,
        spec: &ProjectedSpecification<T, R>,
    ) -> Result<Option<R>, RepoError> {
        let inner = spec.specification();
        let rows = self
            .guarded(
                "single_projected",
                self.source
                    .fetch(source_query(inner, Some(PageWindow::new(0, 1)))),
            )
            .await?;
        Ok(rows.first().map(|row| spec.project(row)))
    }

    /// `list` and `count` of the same specification wrapped in an envelope.
    ///
    /// Page metadata comes from the specification's window; an unpaged
    /// specification reports page 1 sized to the whole result.
    pub async fn page(&self, spec: &Specification<T>) -> Result<Pagination<T>, RepoError> {
        let (data, count) = tokio::try_join!(self.list(spec), self.count(spec))?;
        let (page_index, page_size) = match spec.window() {
            Some(window) => (window.page_index(), window.take as u32),
            None => (1, u32::try_from(count).unwrap_or(u32::MAX)),
        };
        Ok(Pagination::wrap(page_index, page_size, count, data))
    }

    async fn guarded<R, F>(&self, op: &'static str, call: F) -> Result<R, RepoError>
    where
        F: Future<Output = Result<R, RepoError>>,
    {
        let Some(limit) = self.timeout else {
            return call.await;
        };
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    target = "storefront::query",
                    op,
                    timeout_ms = limit.as_millis() as u64,
                    "query timed out"
                );
                Err(RepoError::Timeout)
            }
        }
    }
}

fn source_query<T>(spec: &Specification<T>, window: Option<PageWindow>) -> SourceQuery<'_, T> {
    SourceQuery {
        criteria: spec.criteria(),
        includes: spec.includes(),
        ordering: spec.ordering(),
        window,
    }
}

fn unordered_query<T>(spec: &Specification<T>) -> SourceQuery<'_, T> {
    SourceQuery {
        ordering: None,
        ..source_query(spec, None)
    }
}

fn dedupe<V: PartialEq>(rows: Vec<V>) -> Vec<V> {
    let mut unique: Vec<V> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.contains(&row) {
            unique.push(row);
        }
    }
    unique
}

fn apply_window<V>(rows: Vec<V>, window: Option<PageWindow>) -> Vec<V> {
    match window {
        Some(window) => window.apply(rows),
        None => rows,
    }
}
