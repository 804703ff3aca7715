//! Cache key derivation.
//!
//! A key is `{resource}|{METHOD}|{rest-of-path}|{params}`. The path is
//! lower-cased and stripped of surrounding slashes; its first segment names
//! the resource so that `{resource}|` prefixes every key of that resource.
//! Parameters are sorted by name then value and form-urlencoded; their values
//! are kept verbatim.

use std::fmt;

use axum::http::{Method, Uri};
use url::form_urlencoded;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn compute<I, K, V>(method: &Method, path: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let normalized = path.trim().trim_matches('/').to_lowercase();
        let (resource, rest) = normalized
            .split_once('/')
            .unwrap_or((normalized.as_str(), ""));

        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        pairs.sort();
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter())
            .finish();

        Self(format!(
            "{resource}{sep}{method}{sep}{rest}{sep}{query}",
            sep = KEY_SEPARATOR,
            method = method.as_str(),
        ))
    }

    /// Key for a request URI, reading parameters from its query string.
    pub fn from_uri(method: &Method, uri: &Uri) -> Self {
        let params = form_urlencoded::parse(uri.query().unwrap_or("").as_bytes()).into_owned();
        Self::compute(method, uri.path(), params)
    }

    /// The invalidation prefix covering every key of `resource`.
    pub fn prefix_for(resource: &str) -> String {
        let resource = resource.trim().trim_matches('/').to_lowercase();
        format!("{resource}{KEY_SEPARATOR}")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resource(&self) -> &str {
        self.0
            .split_once(KEY_SEPARATOR)
            .map_or(self.0.as_str(), |(resource, _)| resource)
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str, params: &[(&str, &str)]) -> CacheKey {
        CacheKey::compute(&Method::GET, path, params.iter().copied())
    }

    #[test]
    fn key_layout_puts_resource_first() {
        let key = get("/products", &[("pageSize", "5"), ("sort", "priceAsc")]);
        assert_eq!(key.as_str(), "products|GET||pageSize=5&sort=priceAsc");
        assert_eq!(key.resource(), "products");

        let single = get("/Products/5/", &[]);
        assert_eq!(single.as_str(), "products|GET|5|");
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let first = get("/products", &[("sort", "name"), ("brands", "Angular"), ("pageIndex", "2")]);
        let second = get("/products", &[("pageIndex", "2"), ("sort", "name"), ("brands", "Angular")]);
        assert_eq!(first, second);
        assert_eq!(first, get("/products", &[("brands", "Angular"), ("pageIndex", "2"), ("sort", "name")]));
    }

    #[test]
    fn differing_values_never_collide() {
        let inputs: [&[(&str, &str)]; 6] = [
            &[],
            &[("sort", "name")],
            &[("sort", "Name")],
            &[("sort", "priceAsc")],
            &[("sort", "name"), ("pageIndex", "2")],
            &[("sort", "name&pageIndex=2")],
        ];
        let keys: Vec<CacheKey> = inputs.iter().map(|params| get("/products", params)).collect();
        for (i, left) in keys.iter().enumerate() {
            for right in keys.iter().skip(i + 1) {
                assert_ne!(left, right);
            }
        }
    }

    #[test]
    fn method_and_path_case_are_normalized_separately() {
        assert_eq!(get("/PRODUCTS", &[]), get("/products", &[]));
        assert_ne!(
            CacheKey::compute(&Method::HEAD, "/products", Vec::<(String, String)>::new()),
            get("/products", &[])
        );
    }

    #[test]
    fn prefix_covers_list_and_single_keys() {
        let prefix = CacheKey::prefix_for("/Products");
        assert_eq!(prefix, "products|");
        assert!(get("/products", &[("sort", "name")]).starts_with(&prefix));
        assert!(get("/products/7", &[]).starts_with(&prefix));
        assert!(!get("/orders", &[]).starts_with(&prefix));
    }

    #[test]
    fn from_uri_reads_query_parameters() {
        let uri: Uri = "/products?sort=name&brands=Angular%2CReact".parse().expect("uri");
        assert_eq!(
            CacheKey::from_uri(&Method::GET, &uri),
            get("/products", &[("brands", "Angular,React"), ("sort", "name")])
        );
    }
}
