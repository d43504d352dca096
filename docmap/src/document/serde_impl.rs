use std::fmt::Formatter;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::document::{Document, DocumentList, Marker, Pattern, Value};

// Kinds with no native serde counterpart are written as single-key maps in
// the store's extended notation, e.g. {"$date": "2024-01-01T00:00:00.000Z"}.
const DATE_KEY: &str = "$date";
const UUID_KEY: &str = "$uuid";
const REGEX_KEY: &str = "$regex";
const OPTIONS_KEY: &str = "$options";
const MIN_KEY: &str = "$minKey";
const MAX_KEY: &str = "$maxKey";
const TIMESTAMP_KEY: &str = "$timestamp";
const CODE_KEY: &str = "$code";

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Binary(v) => serializer.serialize_bytes(v),
            Value::DateTime(v) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(DATE_KEY, &v.to_rfc3339_opts(SecondsFormat::Millis, true))?;
                map.end()
            }
            Value::Uuid(v) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UUID_KEY, &v.to_string())?;
                map.end()
            }
            Value::Regex(p) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry(REGEX_KEY, p.source())?;
                map.serialize_entry(OPTIONS_KEY, p.options())?;
                map.end()
            }
            Value::Special(marker) => {
                let mut map = serializer.serialize_map(Some(1))?;
                match marker {
                    Marker::MinKey => map.serialize_entry(MIN_KEY, &1)?,
                    Marker::MaxKey => map.serialize_entry(MAX_KEY, &1)?,
                    Marker::Timestamp { time, increment } => {
                        map.serialize_entry(TIMESTAMP_KEY, &[*time, *increment])?
                    }
                    Marker::Code(code) => map.serialize_entry(CODE_KEY, code)?,
                }
                map.end()
            }
            Value::Document(d) => d.serialize(serializer),
            Value::List(l) => l.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for DocumentList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = self.values().map_err(S::Error::custom)?;
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in &values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a document value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        match i32::try_from(v) {
            Ok(small) => Ok(Value::I32(small)),
            Err(_) => Ok(Value::I64(v)),
        }
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Value, E> {
        match i64::try_from(v) {
            Ok(signed) => self.visit_i64(signed),
            Err(_) => Err(E::custom(format!("{} does not fit in a 64-bit integer", v))),
        }
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::F64(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Binary(v.to_vec()))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Binary(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element::<Value>()? {
            values.push(value);
        }
        Ok(Value::List(DocumentList::from_values(values)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let document = Document::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            document
                .put(key, value)
                .map_err(serde::de::Error::custom)?;
        }
        extended_value(&document).map_err(serde::de::Error::custom)
    }
}

/// Recognizes the single-key maps written for kinds serde has no native form for.
fn extended_value(document: &Document) -> Result<Value, String> {
    let entries = document.entries().map_err(|e| e.to_string())?;
    let special = match entries.as_slice() {
        [(key, Value::String(s))] if key == DATE_KEY => DateTime::parse_from_rfc3339(s)
            .map(|d| Value::DateTime(d.with_timezone(&Utc)))
            .map_err(|e| e.to_string())?,
        [(key, Value::String(s))] if key == UUID_KEY => {
            Value::Uuid(Uuid::parse_str(s).map_err(|e| e.to_string())?)
        }
        [(k1, Value::String(source)), (k2, Value::String(options))]
            if k1 == REGEX_KEY && k2 == OPTIONS_KEY =>
        {
            Value::Regex(Pattern::new(source, options))
        }
        [(key, _)] if key == MIN_KEY => Value::Special(Marker::MinKey),
        [(key, _)] if key == MAX_KEY => Value::Special(Marker::MaxKey),
        [(key, Value::String(code))] if key == CODE_KEY => Value::Special(Marker::Code(code.clone())),
        [(key, Value::List(parts))] if key == TIMESTAMP_KEY => {
            let parts = parts.values().map_err(|e| e.to_string())?;
            match parts.as_slice() {
                [time, increment] => Value::Special(Marker::Timestamp {
                    time: timestamp_part(time)?,
                    increment: timestamp_part(increment)?,
                }),
                _ => return Ok(Value::Document(document.clone())),
            }
        }
        _ => Value::Document(document.clone()),
    };
    Ok(special)
}

fn timestamp_part(value: &Value) -> Result<u32, String> {
    value
        .as_integer()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("invalid timestamp component {}", value))
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Document(document) => Ok(document),
            other => Err(serde::de::Error::custom(format!(
                "expected a document, found {}",
                other.kind_name()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::List(list) => Ok(list),
            other => Err(serde::de::Error::custom(format!(
                "expected a list, found {}",
                other.kind_name()
            ))),
        }
    }
}
