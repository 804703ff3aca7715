//! In-memory data source.
//!
//! Rows are kept in insertion order, which is the natural order seen by
//! queries without an ordering. Sorting is stable so ties keep that order.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::application::repos::{EntityStore, QuerySource, RepoError, SourceQuery};
use crate::application::specification::{Criteria, products::VENDOR_INCLUDE};
use crate::domain::{Entity, Product, Vendor};

/// Attaches related data to a fetched row.
type Navigation<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

struct Table<T> {
    rows: Vec<T>,
    next_id: i32,
}

pub struct MemorySource<T> {
    table: RwLock<Table<T>>,
    navigations: HashMap<&'static str, Navigation<T>>,
}

impl<T: Entity> MemorySource<T> {
    pub fn new(rows: Vec<T>) -> Self {
        let next_id = rows.iter().map(Entity::id).max().unwrap_or(0) + 1;
        Self {
            table: RwLock::new(Table { rows, next_id }),
            navigations: HashMap::new(),
        }
    }

    /// Register the resolver for include path `path`.
    pub fn with_navigation<F>(mut self, path: &'static str, attach: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.navigations.insert(path, Arc::new(attach));
        self
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn resolve_includes<'a>(
        &'a self,
        paths: impl Iterator<Item = &'static str>,
    ) -> Result<Vec<&'a Navigation<T>>, RepoError> {
        paths
            .map(|path| {
                self.navigations
                    .get(path)
                    .ok_or_else(|| RepoError::invalid_input(format!("unknown include `{path}`")))
            })
            .collect()
    }
}

impl MemorySource<Product> {
    /// Product rows with the `vendor` navigation resolved against `vendors`.
    pub fn products(rows: Vec<Product>, vendors: Vec<Vendor>) -> Self {
        let vendors = Arc::new(vendors);
        Self::new(rows).with_navigation(VENDOR_INCLUDE, move |product: &mut Product| {
            product.vendor = product
                .vendor_id
                .as_deref()
                .and_then(|id| vendors.iter().find(|vendor| vendor.id == id))
                .cloned();
        })
    }
}

impl<T> fmt::Debug for MemorySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.navigations.keys().collect();
        paths.sort();
        f.debug_struct("MemorySource")
            .field("navigations", &paths)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Entity> QuerySource<T> for MemorySource<T> {
    #[instrument(skip_all, fields(window = ?query.window))]
    async fn fetch(&self, query: SourceQuery<'_, T>) -> Result<Vec<T>, RepoError> {
        let navigations = self.resolve_includes(query.includes.iter())?;

        let mut rows: Vec<T> = {
            let table = self.table.read().await;
            table
                .rows
                .iter()
                .filter(|row| query.criteria.is_none_or(|criteria| criteria.matches(row)))
                .cloned()
                .collect()
        };

        for row in rows.iter_mut() {
            for attach in &navigations {
                attach(row);
            }
        }

        if let Some(ordering) = query.ordering {
            rows.sort_by(|a, b| ordering.compare(a, b));
        }

        let rows = match query.window {
            Some(window) => window.apply(rows),
            None => rows,
        };
        debug!(rows = rows.len(), "memory fetch");
        Ok(rows)
    }

    async fn count(&self, criteria: Option<&Criteria<T>>) -> Result<u64, RepoError> {
        let table = self.table.read().await;
        let count = match criteria {
            Some(criteria) => table.rows.iter().filter(|row| criteria.matches(row)).count(),
            None => table.rows.len(),
        };
        Ok(count as u64)
    }
}

#[async_trait]
impl<T: Entity> EntityStore<T> for MemorySource<T> {
    async fn get(&self, id: i32) -> Result<Option<T>, RepoError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|row| row.id() == id).cloned())
    }

    async fn insert(&self, mut entity: T) -> Result<T, RepoError> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;
        entity.assign_id(id);
        table.rows.push(entity.clone());
        debug!(id, "row inserted");
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T, RepoError> {
        let mut table = self.table.write().await;
        let slot = table
            .rows
            .iter_mut()
            .find(|row| row.id() == entity.id())
            .ok_or(RepoError::NotFound)?;
        *slot = entity.clone();
        Ok(entity)
    }

    async fn remove(&self, id: i32) -> Result<(), RepoError> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|row| row.id() != id);
        if table.rows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::specification::{Includes, Ordering, PageWindow, Specification};
    use crate::domain::ProductStatus;

    fn product(id: i32, brand: &str, vendor_id: &str) -> Product {
        Product {
            id,
            name: format!("Product {id}"),
            description: String::new(),
            price: 10.0,
            picture_url: String::new(),
            product_type: "Boards".to_string(),
            brand: brand.to_string(),
            quantity_in_stock: 1,
            status: ProductStatus::Approved,
            vendor_id: Some(vendor_id.to_string()),
            vendor: None,
            created_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn vendor(id: &str) -> Vendor {
        Vendor {
            id: id.to_string(),
            user_name: id.to_string(),
            display_name: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    fn source() -> MemorySource<Product> {
        MemorySource::products(
            vec![
                product(1, "React", "v-1"),
                product(2, "Angular", "v-2"),
                product(3, "React", "v-1"),
                product(4, "Angular", "v-9"),
            ],
            vec![vendor("v-1"), vendor("v-2")],
        )
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let source = source();
        let ordering = Ordering::ascending("brand", |p: &Product| p.brand.clone());
        let rows = source
            .fetch(SourceQuery {
                criteria: None,
                includes: &Includes::default(),
                ordering: Some(&ordering),
                window: Some(PageWindow::new(0, 3)),
            })
            .await
            .expect("fetch");
        let ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
    }

    #[tokio::test]
    async fn vendor_include_attaches_known_vendors() {
        let source = source();
        let spec = Specification::<Product>::builder()
            .include(VENDOR_INCLUDE)
            .build();
        let rows = source
            .fetch(SourceQuery {
                criteria: spec.criteria(),
                includes: spec.includes(),
                ordering: None,
                window: None,
            })
            .await
            .expect("fetch");

        assert_eq!(rows[0].vendor.as_ref().map(|v| v.id.as_str()), Some("v-1"));
        assert_eq!(rows[3].vendor, None);
    }

    #[tokio::test]
    async fn unknown_include_is_invalid_input() {
        let source = source();
        let spec = Specification::<Product>::builder().include("reviews").build();
        let err = source
            .fetch(SourceQuery {
                criteria: None,
                includes: spec.includes(),
                ordering: None,
                window: None,
            })
            .await
            .expect_err("unknown include");
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn insert_assigns_next_identity() {
        let source = source();
        let stored = source
            .insert(product(0, "Vue", "v-2"))
            .await
            .expect("insert");
        assert_eq!(stored.id, 5);
        assert!(source.exists(5).await.expect("exists"));

        source.remove(5).await.expect("remove");
        assert!(matches!(source.remove(5).await, Err(RepoError::NotFound)));
        let again = source
            .insert(product(0, "Vue", "v-2"))
            .await
            .expect("insert");
        assert_eq!(again.id, 6, "identities are never reused");
    }

    #[tokio::test]
    async fn update_requires_existing_row() {
        let source = source();
        let mut row = source.get(2).await.expect("get").expect("row");
        row.brand = "Vue".to_string();
        source.update(row).await.expect("update");
        assert_eq!(source.get(2).await.expect("get").expect("row").brand, "Vue");

        let missing = product(42, "Vue", "v-1");
        assert!(matches!(source.update(missing).await, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn count_applies_criteria() {
        let source = source();
        let criteria = Criteria::new(|p: &Product| p.brand == "React");
        assert_eq!(source.count(Some(&criteria)).await.expect("count"), 2);
        assert_eq!(source.count(None).await.expect("count"), 4);
    }
}
