//! Page envelopes and request-parameter normalization.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::ProductStatus;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// One page of results plus the metadata a client needs to page further.
///
/// `count` is the total number of rows matching the same criteria with paging
/// disabled. The envelope does not check `data.len() <= page_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination<T> {
    pub page_index: u32,
    pub page_size: u32,
    pub count: u64,
    pub data: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn wrap(page_index: u32, page_size: u32, count: u64, data: Vec<T>) -> Self {
        Self {
            page_index,
            page_size,
            count,
            data,
        }
    }
}

/// Page size bounds applied at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// Index below 1 becomes 1; size below 1 becomes the default; size above
    /// the maximum is clamped.
    pub fn normalize(&self, page_index: Option<i64>, page_size: Option<i64>) -> (u32, u32) {
        let index = match page_index {
            Some(value) if value >= 1 => u32::try_from(value).unwrap_or(u32::MAX),
            _ => 1,
        };
        let size = match page_size {
            Some(value) if value >= 1 => {
                u32::try_from(value).map_or(self.max_page_size, |v| v.min(self.max_page_size))
            }
            _ => self.default_page_size,
        };
        (index, size)
    }
}

/// Product listing query string as received from clients.
///
/// `brands` and `types` arrive as comma separated lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductSpecQuery {
    pub search: Option<String>,
    #[serde(deserialize_with = "comma_list")]
    pub brands: Vec<String>,
    #[serde(deserialize_with = "comma_list")]
    pub types: Vec<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub page_index: Option<i64>,
    pub page_size: Option<i64>,
}

impl ProductSpecQuery {
    /// Normalize into trusted specification parameters.
    ///
    /// An unparseable status is ignored rather than rejected; listings that
    /// must pin a status override it afterwards.
    pub fn into_params(self, limits: PageLimits) -> ProductSpecParams {
        let (page_index, page_size) = limits.normalize(self.page_index, self.page_size);
        ProductSpecParams {
            search: self
                .search
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty()),
            brands: self.brands,
            types: self.types,
            status: self.status.and_then(|value| value.parse().ok()),
            sort: self.sort,
            page_index,
            page_size,
        }
    }
}

/// Normalized listing parameters consumed by product specifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpecParams {
    pub search: Option<String>,
    pub brands: Vec<String>,
    pub types: Vec<String>,
    pub status: Option<ProductStatus>,
    pub sort: Option<String>,
    pub page_index: u32,
    pub page_size: u32,
}

impl Default for ProductSpecParams {
    fn default() -> Self {
        Self {
            search: None,
            brands: Vec::new(),
            types: Vec::new(),
            status: None,
            sort: None,
            page_index: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductSpecParams {
    /// The search term when one is present and not blank.
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = Some(status);
        self
    }
}

fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_metadata() {
        let page = Pagination::wrap(2, 5, 12, vec![1, 2, 3, 4, 5]);
        assert_eq!(page.page_index, 2);
        assert_eq!(page.count, 12);
    }

    #[test]
    fn envelope_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::wrap(1, 10, 0, Vec::<u8>::new())).expect("json");
        assert_eq!(json["pageIndex"], 1);
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["count"], 0);
        assert!(json["data"].as_array().expect("data").is_empty());
    }

    #[test]
    fn limits_normalize_out_of_range_values() {
        let limits = PageLimits::default();
        assert_eq!(limits.normalize(None, None), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(limits.normalize(Some(0), Some(-3)), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(limits.normalize(Some(4), Some(500)), (4, MAX_PAGE_SIZE));
        assert_eq!(limits.normalize(Some(2), Some(5)), (2, 5));
    }

    #[test]
    fn comma_lists_split_and_trim() {
        let query = ProductSpecQuery {
            brands: vec!["Angular".into(), "React".into()],
            ..ProductSpecQuery::default()
        };
        let params = query.into_params(PageLimits::default());
        assert_eq!(params.brands, vec!["Angular", "React"]);

        let value = serde_json::json!({ "types": " Boards, ,Hats " });
        let parsed: ProductSpecQuery = serde_json::from_value(value).expect("query");
        assert_eq!(parsed.types, vec!["Boards", "Hats"]);
    }

    #[test]
    fn into_params_lowercases_search_and_parses_status() {
        let params = ProductSpecQuery {
            search: Some("  Blue HAT ".into()),
            status: Some("approved".into()),
            ..ProductSpecQuery::default()
        }
        .into_params(PageLimits::default());
        assert_eq!(params.search(), Some("blue hat"));
        assert_eq!(params.status, Some(ProductStatus::Approved));

        let blank = ProductSpecQuery {
            search: Some("   ".into()),
            status: Some("nonsense".into()),
            ..ProductSpecQuery::default()
        }
        .into_params(PageLimits::default());
        assert_eq!(blank.search(), None);
        assert_eq!(blank.status, None);
    }
}
