//! Declarative query specifications.
//!
//! A [`Specification`] records intent only: which entities match, how they
//! are ordered, which related data to attach, which window to return and
//! whether duplicates collapse. Nothing here touches a data source; the
//! [`QueryExecutor`](crate::application::query::QueryExecutor) turns a
//! specification into source calls.
//!
//! Specifications are immutable once built. Derive a new one through
//! [`Specification::derive`] instead of sharing a builder between requests.

mod criteria;
mod ordering;
pub mod products;

use std::{collections::BTreeSet, fmt, sync::Arc};

pub use criteria::Criteria;
pub use ordering::{Ordering, SortDirection};

use crate::domain::Entity;

/// Related-entity navigation paths eagerly attached to each result.
///
/// Duplicates collapse and iteration order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Includes(BTreeSet<&'static str>);

impl Includes {
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn insert(&mut self, path: &'static str) {
        self.0.insert(path);
    }
}

/// Skip/take window derived from a 1-based page index and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: usize,
    pub take: usize,
}

impl PageWindow {
    pub fn new(skip: usize, take: usize) -> Self {
        Self { skip, take }
    }

    /// `skip = size * (index - 1)`, `take = size`. Inputs are trusted; the
    /// params layer normalizes them before a specification is built.
    pub fn from_page(page_index: u32, page_size: u32) -> Self {
        let size = page_size as usize;
        Self {
            skip: size * (page_index.saturating_sub(1) as usize),
            take: size,
        }
    }

    /// The 1-based page this window starts on.
    pub fn page_index(&self) -> u32 {
        if self.take == 0 {
            return 1;
        }
        u32::try_from(self.skip / self.take + 1).unwrap_or(u32::MAX)
    }

    /// Restrict an already ordered sequence to this window.
    pub fn apply<I, T>(self, rows: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        rows.into_iter().skip(self.skip).take(self.take).collect()
    }
}

pub struct Specification<T> {
    criteria: Criteria<T>,
    ordering: Option<Ordering<T>>,
    includes: Includes,
    window: Option<PageWindow>,
    paging_enabled: bool,
    distinct: bool,
}

impl<T: 'static> Specification<T> {
    pub fn builder() -> SpecificationBuilder<T> {
        SpecificationBuilder::new()
    }

    /// Predicate-only specification; paging is disabled.
    pub fn with_criteria<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        SpecificationBuilder::new()
            .filter(predicate)
            .without_paging()
            .build()
    }

    /// Start a new builder seeded with this specification's settings.
    pub fn derive(&self) -> SpecificationBuilder<T> {
        SpecificationBuilder {
            spec: self.clone(),
        }
    }

    /// Attach a projection to produce a different result shape.
    pub fn project<R, F>(self, projection: F) -> ProjectedSpecification<T, R>
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        ProjectedSpecification {
            spec: self,
            projection: Arc::new(projection),
        }
    }
}

impl<T: Entity> Specification<T> {
    /// Single-entity lookup by identity; paging is disabled.
    pub fn by_id(id: i32) -> Self {
        Self::with_criteria(move |entity: &T| entity.id() == id)
    }
}

impl<T> Specification<T> {
    /// The predicate, or `None` when every entity matches.
    pub fn criteria(&self) -> Option<&Criteria<T>> {
        (!self.criteria.is_empty()).then_some(&self.criteria)
    }

    pub fn matches(&self, entity: &T) -> bool {
        self.criteria.matches(entity)
    }

    pub fn ordering(&self) -> Option<&Ordering<T>> {
        self.ordering.as_ref()
    }

    pub fn includes(&self) -> &Includes {
        &self.includes
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn is_paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    /// The effective window: present only when paging is enabled and a
    /// window was applied.
    pub fn window(&self) -> Option<PageWindow> {
        if self.paging_enabled { self.window } else { None }
    }

    pub fn skip(&self) -> usize {
        self.window().map_or(0, |window| window.skip)
    }

    pub fn take(&self) -> Option<usize> {
        self.window().map(|window| window.take)
    }
}

impl<T> Clone for Specification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            ordering: self.ordering.clone(),
            includes: self.includes.clone(),
            window: self.window,
            paging_enabled: self.paging_enabled,
            distinct: self.distinct,
        }
    }
}

impl<T> Default for Specification<T> {
    fn default() -> Self {
        Self {
            criteria: Criteria::any(),
            ordering: None,
            includes: Includes::default(),
            window: None,
            paging_enabled: true,
            distinct: false,
        }
    }
}

impl<T> fmt::Debug for Specification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("criteria", &self.criteria)
            .field("ordering", &self.ordering)
            .field("includes", &self.includes)
            .field("window", &self.window)
            .field("paging_enabled", &self.paging_enabled)
            .field("distinct", &self.distinct)
            .finish()
    }
}

/// The only way to assemble a [`Specification`].
pub struct SpecificationBuilder<T> {
    spec: Specification<T>,
}

impl<T: 'static> SpecificationBuilder<T> {
    pub fn new() -> Self {
        Self {
            spec: Specification::default(),
        }
    }

    /// AND another condition onto the criteria.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.criteria(Criteria::new(predicate))
    }

    pub fn criteria(mut self, criteria: Criteria<T>) -> Self {
        self.spec.criteria = std::mem::take(&mut self.spec.criteria).and(criteria);
        self
    }

    /// Order ascending by `key`, replacing any previous ordering.
    pub fn order_by<K, F>(self, key: &'static str, extract: F) -> Self
    where
        K: PartialOrd + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.ordering(Ordering::ascending(key, extract))
    }

    /// Order descending by `key`, replacing any previous ordering.
    pub fn order_by_descending<K, F>(self, key: &'static str, extract: F) -> Self
    where
        K: PartialOrd + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.ordering(Ordering::descending(key, extract))
    }

    pub fn ordering(mut self, ordering: Ordering<T>) -> Self {
        self.spec.ordering = Some(ordering);
        self
    }

    pub fn include(mut self, path: &'static str) -> Self {
        self.spec.includes.insert(path);
        self
    }

    /// Apply a 1-based page window and enable paging.
    pub fn page(self, page_index: u32, page_size: u32) -> Self {
        self.window(PageWindow::from_page(page_index, page_size))
    }

    pub fn window(mut self, window: PageWindow) -> Self {
        self.spec.window = Some(window);
        self.spec.paging_enabled = true;
        self
    }

    pub fn without_paging(mut self) -> Self {
        self.spec.paging_enabled = false;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.spec.distinct = true;
        self
    }

    pub fn build(self) -> Specification<T> {
        self.spec
    }

    pub fn select<R, F>(self, projection: F) -> ProjectedSpecification<T, R>
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        self.build().project(projection)
    }
}

impl<T: 'static> Default for SpecificationBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A specification whose materialized output is `R` rather than `T`.
///
/// Filtering and ordering still act on `T`; distinctness compares `R`.
pub struct ProjectedSpecification<T, R> {
    spec: Specification<T>,
    projection: Arc<dyn Fn(&T) -> R + Send + Sync>,
}

impl<T, R> ProjectedSpecification<T, R> {
    pub fn specification(&self) -> &Specification<T> {
        &self.spec
    }

    pub fn project(&self, entity: &T) -> R {
        (self.projection)(entity)
    }
}

impl<T, R> Clone for ProjectedSpecification<T, R> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            projection: Arc::clone(&self.projection),
        }
    }
}

impl<T, R> fmt::Debug for ProjectedSpecification<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectedSpecification")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i32,
        label: &'static str,
    }

    impl Entity for Row {
        fn id(&self) -> i32 {
            self.id
        }

        fn assign_id(&mut self, id: i32) {
            self.id = id;
        }
    }

    #[test]
    fn page_window_is_one_based() {
        assert_eq!(PageWindow::from_page(1, 10), PageWindow::new(0, 10));
        assert_eq!(PageWindow::from_page(3, 5), PageWindow::new(10, 5));
    }

    #[test]
    fn paging_is_enabled_by_default_but_needs_a_window() {
        let spec = Specification::<Row>::builder().build();
        assert!(spec.is_paging_enabled());
        assert_eq!(spec.window(), None);

        let paged = Specification::<Row>::builder().page(2, 4).build();
        assert_eq!(paged.skip(), 4);
        assert_eq!(paged.take(), Some(4));
    }

    #[test]
    fn by_id_disables_paging() {
        let spec = Specification::<Row>::by_id(5);
        assert!(!spec.is_paging_enabled());
        assert!(spec.matches(&Row { id: 5, label: "x" }));
        assert!(!spec.matches(&Row { id: 6, label: "x" }));
    }

    #[test]
    fn later_ordering_replaces_earlier_one() {
        let spec = Specification::<Row>::builder()
            .order_by("id", |row| row.id)
            .order_by_descending("label", |row| row.label)
            .build();
        let ordering = spec.ordering().expect("ordering");
        assert_eq!(ordering.key(), "label");
        assert_eq!(ordering.direction(), SortDirection::Descending);
    }

    #[test]
    fn includes_are_deduplicated() {
        let spec = Specification::<Row>::builder()
            .include("vendor")
            .include("vendor")
            .build();
        assert_eq!(spec.includes().len(), 1);
        assert!(spec.includes().contains("vendor"));
    }

    #[test]
    fn derive_leaves_original_untouched() {
        let base = Specification::<Row>::builder()
            .filter(|row| row.id > 1)
            .page(1, 10)
            .build();
        let derived = base
            .derive()
            .filter(|row| row.id < 3)
            .without_paging()
            .build();

        let row = Row { id: 4, label: "d" };
        assert!(base.matches(&row));
        assert!(!derived.matches(&row));
        assert_eq!(base.take(), Some(10));
        assert_eq!(derived.window(), None);
    }

    #[test]
    fn projection_applies_to_entity() {
        let spec = Specification::<Row>::builder()
            .distinct()
            .select(|row| row.label.to_uppercase());
        assert!(spec.specification().is_distinct());
        assert_eq!(spec.project(&Row { id: 1, label: "ab" }), "AB");
    }
}
