//! Caller-supplied query-string arguments.

use std::collections::BTreeMap;

/// Query-string arguments keyed by name. A key may carry several values,
/// which are sent as repeated pairs (`property=a&property=b`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    args: BTreeMap<String, Vec<String>>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to a single value, replacing whatever it held.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.args.insert(key.into(), vec![value.into()]);
        self
    }

    /// Add another value for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.args.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.args.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.args.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Flattened `(key, value)` pairs in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.as_str(), value.as_str())))
    }
}

impl<K, V> FromIterator<(K, V)> for QueryArgs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = QueryArgs::new();
        for (key, value) in iter {
            args.append(key, value);
        }
        args
    }
}
