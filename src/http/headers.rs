use std::fmt::Display;
use std::str::FromStr;

/// A name/value pair whose value is always kept as text.
///
/// Used for both HTTP headers and URL query arguments. Typed values go in
/// through [`KeyValue::set_value`] (anything `Display`) and come back out
/// through [`KeyValue::parse`] or [`KeyValue::as_bool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    name: String,
    value: String,
}

impl KeyValue {
    pub fn new(name: impl Into<String>, value: impl Display) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parses the value as `T`, e.g. `header.parse::<u64>()`.
    pub fn parse<T: FromStr>(&self) -> Result<T, T::Err> {
        self.value.trim().parse()
    }

    /// `true` iff the value is `"true"` in any letter case.
    pub fn as_bool(&self) -> bool {
        self.value.eq_ignore_ascii_case("true")
    }

    pub fn set_value(&mut self, value: impl Display) {
        self.value = value.to_string();
    }
}

/// Ordered header collection keyed by case-insensitive name.
///
/// Adding a name that is already present is a no-op: the first value wins.
/// Iteration follows first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    headers: Vec<KeyValue>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut KeyValue> {
        self.headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Value of the header `name`, if present.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(KeyValue::value)
    }

    /// Adds a header unless one with the same name already exists.
    ///
    /// Returns whether the header was inserted.
    pub fn add(&mut self, name: impl Into<String>, value: impl Display) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.headers.push(KeyValue::new(name, value));
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValue> {
        self.headers.iter()
    }
}

impl<'a> IntoIterator for &'a HeaderTable {
    type Item = &'a KeyValue;
    type IntoIter = std::slice::Iter<'a, KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<N: Into<String>, V: Display> FromIterator<(N, V)> for HeaderTable {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut table = HeaderTable::new();
        for (name, value) in iter {
            table.add(name, value);
        }
        table
    }
}
