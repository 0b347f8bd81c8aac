//! # Dictionary
//!
//! The read-only lookup structure that `${a.b.c}` references are resolved against.
//! Values form an explicit tree: scalars at the leaves, lists and maps inside.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A node of the dictionary tree.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Steps one level down. Maps are indexed by key, lists by a numeric segment.
    pub fn get(&self, segment: &str) -> Option<&Self> {
        match self {
            Self::Map(map) => map.get(segment),
            Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::List(_) | Self::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Self::String(s),
            toml::Value::Integer(i) => Self::Integer(i),
            toml::Value::Float(n) => Self::Float(n),
            toml::Value::Boolean(b) => Self::Bool(b),
            toml::Value::Datetime(d) => Self::String(d.to_string()),
            toml::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            toml::Value::Table(table) => Self::from(table),
        }
    }
}

impl From<toml::Table> for Value {
    fn from(table: toml::Table) -> Self {
        Self::Map(table.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// The top level of the lookup tree. Built once per command, never mutated afterwards.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Dictionary {
    root: BTreeMap<String, Value>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level entry, replacing any previous value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.root.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Walks a dotted path (`a.b.c`). Any missing step, or an empty segment, yields `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            current = current.get(segment)?;
        }
        Some(current)
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionary {
        let details: toml::Table = toml::from_str(
            r#"
            name = "api"
            [details]
            port = 8080
            links = ["core", "util"]
            publish = true
            "#,
        )
        .unwrap();
        let mut dic = Dictionary::new();
        dic.insert("log", ".log");
        dic.insert("projectDetails", Value::from(details));
        dic
    }

    #[test]
    fn test_lookup_walks_nested_maps() {
        let dic = sample();
        assert_eq!(dic.lookup("log"), Some(&Value::from(".log")));
        assert_eq!(
            dic.lookup("projectDetails.details.port"),
            Some(&Value::Integer(8080))
        );
    }

    #[test]
    fn test_lookup_indexes_lists() {
        let dic = sample();
        let link = dic.lookup("projectDetails.details.links.1").unwrap();
        assert_eq!(link.as_str(), Some("util"));
        assert!(dic.lookup("projectDetails.details.links.7").is_none());
    }

    #[test]
    fn test_lookup_missing_and_malformed_paths() {
        let dic = sample();
        assert!(dic.lookup("nope").is_none());
        assert!(dic.lookup("log.deeper").is_none());
        assert!(dic.lookup("").is_none());
        assert!(dic.lookup("projectDetails..name").is_none());
    }

    #[test]
    fn test_display_renders_scalars_and_collections() {
        assert_eq!(Value::Integer(3).to_string(), "3");
        assert_eq!(Value::Bool(false).to_string(), "false");
        let list = Value::List(vec![Value::from("a"), Value::Integer(1)]);
        assert_eq!(list.to_string(), r#"["a",1]"#);
    }
}
