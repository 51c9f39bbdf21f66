//! Key order and explicit nulls of a JSON object, captured on read and
//! replayed on write.
//!
//! The model structs decode through `ObjectReader` and encode through
//! `ObjectWriter`, so a record rewritten by a patch keeps the key order it was
//! read with, and a key stored as `null` stays `null` instead of vanishing.
use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyLayout {
    keys: Vec<String>,
    nulls: Vec<String>,
}

impl KeyLayout {
    pub fn is_null(&self, key: &str) -> bool {
        self.nulls.iter().any(|k| k == key)
    }
}

pub(crate) struct ObjectReader {
    map: Map<String, Value>,
    layout: KeyLayout,
}

impl ObjectReader {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        let layout = KeyLayout {
            keys: map.keys().cloned().collect(),
            nulls: map
                .iter()
                .filter(|(_, v)| v.is_null())
                .map(|(k, _)| k.clone())
                .collect(),
        };
        Self { map, layout }
    }

    /// Absent and `null` both decode to `None`; the layout remembers which.
    pub(crate) fn optional<T: DeserializeOwned>(&mut self, key: &'static str) -> Result<Option<T>, serde_json::Error> {
        match self.map.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v).map(Some),
        }
    }

    pub(crate) fn required<T: DeserializeOwned>(&mut self, key: &'static str) -> Result<T, serde_json::Error> {
        self.optional(key)?
            .ok_or_else(|| serde_json::Error::missing_field(key))
    }

    /// Remaining (unknown) keys and the captured layout.
    pub(crate) fn finish(self) -> (Map<String, Value>, KeyLayout) {
        (self.map, self.layout)
    }
}

pub(crate) struct ObjectWriter<'a> {
    known: Vec<(&'static str, Option<Value>)>,
    extra: &'a Map<String, Value>,
    layout: &'a KeyLayout,
}

impl<'a> ObjectWriter<'a> {
    pub(crate) fn new(extra: &'a Map<String, Value>, layout: &'a KeyLayout) -> Self {
        Self {
            known: Vec::new(),
            extra,
            layout,
        }
    }

    /// Known fields are passed in the order a fresh record should use.
    pub(crate) fn field(mut self, key: &'static str, value: Option<Value>) -> Self {
        self.known.push((key, value));
        self
    }

    pub(crate) fn string(self, key: &'static str, value: Option<&str>) -> Self {
        self.field(key, value.map(|s| Value::String(s.to_string())))
    }

    /// Keys in read order first, then known fields new to this record, then
    /// unknown keys added since the read.
    pub(crate) fn finish(self) -> Map<String, Value> {
        let mut out = Map::new();
        for key in &self.layout.keys {
            if let Some((_, value)) = self.known.iter().find(|(k, _)| *k == key.as_str()) {
                match value {
                    Some(v) => {
                        out.insert(key.clone(), v.clone());
                    }
                    None if self.layout.is_null(key) => {
                        out.insert(key.clone(), Value::Null);
                    }
                    None => {}
                }
            } else if let Some(v) = self.extra.get(key) {
                out.insert(key.clone(), v.clone());
            }
        }
        for (key, value) in self.known {
            if let Some(v) = value {
                if !out.contains_key(key) {
                    out.insert(key.to_string(), v);
                }
            }
        }
        for (key, v) in self.extra {
            if !out.contains_key(key) {
                out.insert(key.clone(), v.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn replays_read_order_and_nulls() {
        let mut reader = ObjectReader::new(object(json!({"b": 1, "a": null, "z": "keep"})));
        let b: Option<u32> = reader.optional("b").unwrap();
        let a: Option<String> = reader.optional("a").unwrap();
        let (extra, layout) = reader.finish();
        assert_eq!(b, Some(1));
        assert_eq!(a, None);
        assert!(layout.is_null("a"));

        let out = ObjectWriter::new(&extra, &layout)
            .string("a", a.as_deref())
            .field("b", b.map(Value::from))
            .string("c", Some("new"))
            .finish();
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"b":1,"a":null,"z":"keep","c":"new"}"#
        );
    }

    #[test]
    fn required_key_missing_is_an_error() {
        let mut reader = ObjectReader::new(object(json!({"rank": "1"})));
        let err = reader.required::<String>("name").unwrap_err();
        assert!(err.to_string().contains("name"));
    }
}
