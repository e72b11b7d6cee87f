//! Ordered name/value pairs for path and query parameters.

use smallvec::SmallVec;

/// Number of pairs stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Ordered `(name, value)` pairs.
///
/// Query strings may repeat a key. [`get`](Self::get) returns the first
/// occurrence and [`last`](Self::last) the final one.
///
/// # Example
///
/// ```rust
/// use tessera_core::Params;
///
/// let mut params = Params::new();
/// params.push("tag", "a");
/// params.push("tag", "b");
///
/// assert_eq!(params.get("tag"), Some("a"));
/// assert_eq!(params.last("tag"), Some("b"));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query string.
    ///
    /// Malformed input yields an empty set.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default()
    }

    /// Appends a pair.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the last value for `name`.
    #[must_use]
    pub fn last(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
