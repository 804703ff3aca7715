use std::{cmp, fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

type Comparator<T> = Arc<dyn Fn(&T, &T) -> cmp::Ordering + Send + Sync>;

/// A single ordering key over `T` with its direction.
///
/// Keys only need `PartialOrd`; values that cannot be compared (NaN prices)
/// are treated as equal and keep the source's natural order.
pub struct Ordering<T> {
    key: &'static str,
    direction: SortDirection,
    compare: Comparator<T>,
}

impl<T: 'static> Ordering<T> {
    pub fn ascending<K, F>(key: &'static str, extract: F) -> Self
    where
        K: PartialOrd + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::with_direction(key, SortDirection::Ascending, extract)
    }

    pub fn descending<K, F>(key: &'static str, extract: F) -> Self
    where
        K: PartialOrd + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::with_direction(key, SortDirection::Descending, extract)
    }

    fn with_direction<K, F>(key: &'static str, direction: SortDirection, extract: F) -> Self
    where
        K: PartialOrd + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            key,
            direction,
            compare: Arc::new(move |a: &T, b: &T| {
                extract(a)
                    .partial_cmp(&extract(b))
                    .unwrap_or(cmp::Ordering::Equal)
            }),
        }
    }
}

impl<T> Ordering<T> {
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn compare(&self, a: &T, b: &T) -> cmp::Ordering {
        let ordering = (self.compare)(a, b);
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl<T> Clone for Ordering<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            direction: self.direction,
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for Ordering<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ordering")
            .field("key", &self.key)
            .field("direction", &self.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_reverses_comparison() {
        let asc = Ordering::ascending("len", |s: &&str| s.len());
        let desc = Ordering::descending("len", |s: &&str| s.len());

        assert_eq!(asc.compare(&"a", &"bb"), cmp::Ordering::Less);
        assert_eq!(desc.compare(&"a", &"bb"), cmp::Ordering::Greater);
        assert_eq!(desc.direction(), SortDirection::Descending);
    }

    #[test]
    fn incomparable_keys_are_equal() {
        let ordering = Ordering::ascending("value", |v: &f64| *v);
        assert_eq!(ordering.compare(&f64::NAN, &1.0), cmp::Ordering::Equal);
    }
}
