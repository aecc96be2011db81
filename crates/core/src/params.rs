//! Raw request parameters as received from a query string.
//!
//! Bracket keys (`price[gte]=100`) become nested mappings so the filter
//! builder can see operator tokens; every other key stays plain text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static BRACKET_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]]+)\[([^\[\]]+)\]$").expect("bracket key pattern is valid")
});

/// One raw parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawParam {
    Text(String),
    Nested(BTreeMap<String, String>),
}

impl RawParam {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawParam::Text(text) => Some(text),
            RawParam::Nested(_) => None,
        }
    }
}

/// String-keyed parameter set for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(BTreeMap<String, RawParam>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `(key, value)` pairs.
    ///
    /// Later pairs win for plain keys. A bracketed key replaces any plain
    /// value under the same field and vice versa.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            match BRACKET_KEY.captures(key) {
                Some(caps) => {
                    let field = caps[1].to_string();
                    let token = caps[2].to_string();
                    let entry = params
                        .0
                        .entry(field)
                        .or_insert_with(|| RawParam::Nested(BTreeMap::new()));
                    if matches!(entry, RawParam::Text(_)) {
                        *entry = RawParam::Nested(BTreeMap::new());
                    }
                    if let RawParam::Nested(map) = entry {
                        map.insert(token, value.into());
                    }
                }
                None => {
                    params.0.insert(key.to_string(), RawParam::Text(value.into()));
                }
            }
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RawParam) {
        self.0.insert(key.into(), value);
    }

    /// Set a plain text parameter, replacing whatever was there.
    pub fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), RawParam::Text(value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&RawParam> {
        self.0.get(key)
    }

    /// Plain text value of `key`, if present and not nested.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(RawParam::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawParam)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
