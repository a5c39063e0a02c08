//! Ordered string properties shared by protocol and message descriptors
//!
//! Binary form: compact count, then `count` key/value UTF string pairs.
//! Text form: one `key=value` token per property.

use crate::{BufferedInput, BufferedOutput, ProtocolError, ProtocolResult};
use std::fmt;

/// Insertion-ordered map with unique keys
///
/// Replacing a value keeps the key at its original position, which keeps
/// composed handshakes stable across repeated `set` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copies every entry of `other` over this map
    pub fn extend_from(&mut self, other: &Properties) {
        for (k, v) in other.iter() {
            self.set(k, v);
        }
    }

    pub fn compose_to(&self, out: &mut BufferedOutput) {
        out.write_compact_int(self.entries.len() as i32);
        for (k, v) in &self.entries {
            out.write_utf_string(k);
            out.write_utf_string(v);
        }
    }

    /// Parses properties and adds them to this map
    pub fn parse_from(&mut self, input: &mut BufferedInput<'_>) -> ProtocolResult<()> {
        let size = input.read_size("property count")?;
        for _ in 0..size {
            let offset = input.position();
            let key = input
                .read_utf_string()?
                .ok_or_else(|| ProtocolError::invalid_size(-1, offset, "property key"))?;
            let value = input.read_utf_string()?.unwrap_or_default();
            self.set(key, value);
        }
        Ok(())
    }

    pub fn to_text_tokens(&self, tokens: &mut Vec<String>) {
        tokens.extend(self.entries.iter().map(|(k, v)| format!("{k}={v}")));
    }

    /// Consumes consecutive `key=value` tokens starting at `i`, returning the next unconsumed index
    pub fn append_from_text_tokens(&mut self, tokens: &[String], mut i: usize) -> usize {
        while let Some((key, value)) = tokens.get(i).and_then(|t| t.split_once('=')) {
            self.set(key, value);
            i += 1;
        }
        i
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (k, v) in iter {
            properties.set(k, v);
        }
        properties
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_position_and_returns_previous() {
        let mut p = Properties::new();
        p.set("type", "qtp");
        p.set("version", "1.0");
        assert_eq!(p.set("type", "tape"), Some("qtp".to_string()));
        let keys: Vec<_> = p.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["type", "version"]);
        assert_eq!(p.get("type"), Some("tape"));
    }

    #[test]
    fn test_remove() {
        let mut p: Properties = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(p.remove("a"), Some("1".to_string()));
        assert_eq!(p.remove("a"), None);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_text_tokens_stop_at_first_non_property() {
        let tokens: Vec<String> = ["a=1", "b=x=y", "+TICKER_DATA", "c=3"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut p = Properties::new();
        let next = p.append_from_text_tokens(&tokens, 0);
        assert_eq!(next, 2);
        assert_eq!(p.get("b"), Some("x=y"));
        assert!(!p.contains_key("c"));
    }

    #[test]
    fn test_binary_rejects_null_key() {
        let mut out = BufferedOutput::new();
        out.write_compact_int(1);
        out.write_null_string();
        out.write_utf_string("v");
        let mut input = BufferedInput::new(out.as_slice());
        assert!(Properties::new().parse_from(&mut input).is_err());
    }

    #[test]
    fn test_display() {
        let p: Properties = [("type", "qtp"), ("version", "1.0")].into_iter().collect();
        assert_eq!(p.to_string(), "[type=qtp, version=1.0]");
    }
}
