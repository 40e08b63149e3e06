//! URL query arguments and their percent-encoding.

use std::borrow::Cow;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::error::ParseError;
use crate::http::headers::KeyValue;

/// Everything except letters, digits and `-_~.` gets `%XX`-escaped.
const ARG_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'~')
    .remove(b'.');

pub fn encode(data: &[u8]) -> String {
    percent_encode(data, ARG_ENCODE_SET).to_string()
}

/// Decodes `%XX` escapes. Malformed escapes are kept verbatim.
pub fn decode(text: &str) -> Vec<u8> {
    percent_decode_str(text).collect()
}

fn decode_text(text: &str) -> Result<String, ParseError> {
    percent_decode_str(text)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| ParseError::InvalidEncoding)
}

/// Ordered query arguments keyed by exact-case name, first value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgTable {
    args: Vec<KeyValue>,
}

impl ArgTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.args.iter().find(|a| a.name() == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(KeyValue::value)
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl fmt::Display) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.args.push(KeyValue::new(name, value));
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValue> {
        self.args.iter()
    }

    /// Builds a table from a raw query string (without the leading `?`).
    ///
    /// Fails with [`ParseError::InvalidEncoding`] when a decoded name or
    /// value is not UTF-8.
    pub fn from_query(query: &str) -> Result<Self, ParseError> {
        let mut args = ArgTable::new();
        for segment in query.split('&').filter(|s| !s.is_empty()) {
            match segment.split_once('=') {
                Some((name, value)) => args.add(decode_text(name)?, decode_text(value)?),
                None => args.add(decode_text(segment)?, ""),
            };
        }
        Ok(args)
    }
}

impl<'a> IntoIterator for &'a ArgTable {
    type Item = &'a KeyValue;
    type IntoIter = std::slice::Iter<'a, KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Renders `?k1=v1&k2=v2`, or nothing for an empty table.
impl fmt::Display for ArgTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(
                f,
                "{sep}{}={}",
                encode(arg.name().as_bytes()),
                encode(arg.value().as_bytes())
            )?;
        }
        Ok(())
    }
}

/// Splits `resource` into its path and decoded query arguments.
///
/// ```
/// # use coolipc::http::query::parse_query;
/// let (path, args) = parse_query("/fans?pwm=50&temp=30").unwrap();
/// assert_eq!(path, "/fans");
/// assert_eq!(args.value("pwm"), Some("50"));
/// ```
pub fn parse_query(resource: &str) -> Result<(String, ArgTable), ParseError> {
    match resource.split_once('?') {
        Some((path, query)) => Ok((path.to_string(), ArgTable::from_query(query)?)),
        None => Ok((resource.to_string(), ArgTable::new())),
    }
}
