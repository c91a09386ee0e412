//! Case-insensitive, order-preserving header collection.
//!
//! # Responsibilities
//! - Normalize every header name to lower case before any lookup
//! - Join repeated `append` values with `", "`
//! - Produce ordered name/value pairs for the wire
//!
//! # Design Decisions
//! - Backed by a `Vec` so iteration follows insertion order
//! - `set` on an existing name replaces the value in place (keeps position)
//! - Every construction path goes through `set`, so later duplicates win

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A single header as it crosses the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

impl HeaderPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered mapping from lower-cased header name to its accumulated value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Headers {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = normalize(name);
        self.entries.iter().position(|(key, _)| *key == name)
    }

    /// Value stored under `name`, in any casing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    /// Replace the value for `name`, inserting it if absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((normalize(name), value)),
        }
    }

    /// Add a value for `name`. An existing value becomes `"old, new"`.
    pub fn append(&mut self, name: &str, value: impl AsRef<str>) {
        let value = value.as_ref();
        match self.position(name) {
            Some(idx) => {
                let existing = &mut self.entries[idx].1;
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.entries.push((normalize(name), value.to_string())),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove `name`. Absent names are ignored.
    pub fn delete(&mut self, name: &str) {
        if let Some(idx) = self.position(name) {
            self.entries.remove(idx);
        }
    }

    /// Name/value pairs in insertion order.
    ///
    /// The iterator borrows the collection, so it always reflects the state at
    /// the time it was created; call again (or clone it) to restart.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> + Clone + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.entries.iter().map(|(_, value)| value.as_str())
    }

    /// Ordered pairs for wire serialization. Names are already lower case.
    pub fn to_ordered_pairs(&self) -> Vec<HeaderPair> {
        self.entries
            .iter()
            .map(|(name, value)| HeaderPair::new(name.clone(), value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self` with `set` semantics.
    pub fn extend_from(&mut self, other: &Headers) {
        for (name, value) in other.entries() {
            self.set(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name.as_ref(), value);
        }
        headers
    }
}

impl FromIterator<HeaderPair> for Headers {
    fn from_iter<I: IntoIterator<Item = HeaderPair>>(iter: I) -> Self {
        iter.into_iter()
            .map(|pair| (pair.name, pair.value))
            .collect()
    }
}

impl From<Vec<HeaderPair>> for Headers {
    fn from(pairs: Vec<HeaderPair>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: AsRef<str>, V: Into<String>, const N: usize> From<[(K, V); N]> for Headers {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");

        for name in ["content-type", "CONTENT-TYPE", "CoNtEnT-tYpE"] {
            assert!(headers.has(name));
            assert_eq!(headers.get(name), Some("text/plain"));
        }

        headers.delete("CONTENT-type");
        assert!(!headers.has("content-type"));
        assert!(headers.is_empty());
    }

    #[test]
    fn append_joins_values() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/html");
        assert_eq!(headers.get("accept"), Some("text/html"));

        headers.append("ACCEPT", "application/json");
        assert_eq!(headers.get("accept"), Some("text/html, application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn set_keeps_position_and_overwrites() {
        let mut headers = Headers::new();
        headers.set("a", "1");
        headers.set("b", "2");
        headers.set("A", "3");

        let pairs: Vec<_> = headers.entries().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn delete_missing_is_noop() {
        let mut headers = Headers::from([("x-one", "1")]);
        headers.delete("x-two");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn construction_uses_set_semantics() {
        let headers: Headers = vec![("X-Dup", "first"), ("x-dup", "second")]
            .into_iter()
            .collect();
        assert_eq!(headers.get("x-dup"), Some("second"));

        let records = vec![HeaderPair::new("Host", "a"), HeaderPair::new("HOST", "b")];
        let headers = Headers::from(records);
        assert_eq!(headers.get("host"), Some("b"));

        let mut map = HashMap::new();
        map.insert("Content-Length".to_string(), "5".to_string());
        let headers = Headers::from(map);
        assert_eq!(headers.keys().collect::<Vec<_>>(), vec!["content-length"]);

        let copy = Headers::from_iter(headers.entries());
        assert_eq!(copy, headers);
    }

    #[test]
    fn iterators_are_restartable() {
        let headers = Headers::from([("a", "1"), ("b", "2")]);
        let keys = headers.keys();
        assert_eq!(keys.clone().count(), 2);
        assert_eq!(keys.collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(headers.values().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn ordered_pairs_are_lower_case() {
        let headers = Headers::from([("X-Request-Id", "abc"), ("Server", "fetch")]);
        let pairs = headers.to_ordered_pairs();
        assert_eq!(pairs[0], HeaderPair::new("x-request-id", "abc"));
        assert_eq!(pairs[1], HeaderPair::new("server", "fetch"));
    }
}
