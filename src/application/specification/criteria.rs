use std::{fmt, sync::Arc};

type Clause<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Conjunction of boolean conditions over `T`.
///
/// Each call to [`Criteria::and`] appends a clause; an entity matches when
/// every clause holds. An empty criteria matches everything.
pub struct Criteria<T> {
    clauses: Vec<Clause<T>>,
}

impl<T> Criteria<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            clauses: vec![Arc::new(predicate)],
        }
    }

    /// Criteria with no clauses; matches every entity.
    pub fn any() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    pub fn and(mut self, other: Criteria<T>) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn and_where<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.and(Criteria::new(predicate))
    }

    /// AND together every criteria yielded by `parts`.
    pub fn all<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Criteria<T>>,
    {
        parts.into_iter().fold(Criteria::any(), Criteria::and)
    }

    pub fn matches(&self, entity: &T) -> bool {
        self.clauses.iter().all(|clause| clause(entity))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }
}

impl<T> Clone for Criteria<T> {
    fn clone(&self) -> Self {
        Self {
            clauses: self.clauses.clone(),
        }
    }
}

impl<T> Default for Criteria<T> {
    fn default() -> Self {
        Self::any()
    }
}

impl<T> fmt::Debug for Criteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("clauses", &self.clauses.len())
            .finish()
    }
}
