use std::any::Any;
use std::fmt::{Debug, Display, Formatter};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::document::{Document, DocumentList};
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// A regular expression stored as its source text and option flags.
///
/// The pattern is kept as text so that it compares and hashes by value and
/// survives a round trip through the store unchanged. [`Pattern::compile`]
/// turns it into a [`regex::Regex`] honoring the `i`, `m`, `s` and `x` flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Pattern {
    source: String,
    options: String,
}

impl Pattern {
    pub fn new(source: &str, options: &str) -> Self {
        Pattern {
            source: source.to_string(),
            options: options.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    pub fn compile(&self) -> MapperResult<regex::Regex> {
        let mut builder = regex::RegexBuilder::new(&self.source);
        for flag in self.options.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    log::error!("Unsupported regular expression flag '{}'", other);
                    return Err(MapperError::new(
                        &format!("Unsupported regular expression flag '{}'", other),
                        ErrorKind::ConversionError,
                    ));
                }
            };
        }
        Ok(builder.build()?)
    }
}

/// Opaque values the store gives special meaning to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Sorts before every other value
    MinKey,
    /// Sorts after every other value
    MaxKey,
    /// Server-side timestamp: seconds since epoch and an ordinal within that second
    Timestamp { time: u32, increment: u32 },
    /// A piece of server-side script
    Code(String),
}

/// A value stored in a [`Document`] or a [`DocumentList`].
///
/// The set of variants is closed: anything a document can hold is one of
/// these. Nested documents and lists are held as shared handles, so a value
/// taken out of a document still refers to the same nested record.
///
/// Integer values compare equal across widths (`I32(1) == I64(1)`).
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    String(String),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    Regex(Pattern),
    Uuid(Uuid),
    Document(Document),
    List(DocumentList),
    Special(Marker),
}

impl Value {
    /// Converts a value of arbitrary type by run-time inspection.
    ///
    /// This is the entry point for genuinely foreign inputs; types outside the
    /// closed value set fail with [`ErrorKind::UnsupportedValueKind`].
    pub fn from_any(value: &dyn Any) -> MapperResult<Value> {
        if value.downcast_ref::<()>().is_some() {
            Ok(Value::Null)
        } else if let Some(v) = value.downcast_ref::<Value>() {
            Ok(v.clone())
        } else if let Some(v) = value.downcast_ref::<bool>() {
            Ok(Value::Bool(*v))
        } else if let Some(v) = value.downcast_ref::<i8>() {
            Ok(Value::I32(*v as i32))
        } else if let Some(v) = value.downcast_ref::<i16>() {
            Ok(Value::I32(*v as i32))
        } else if let Some(v) = value.downcast_ref::<i32>() {
            Ok(Value::I32(*v))
        } else if let Some(v) = value.downcast_ref::<u8>() {
            Ok(Value::I32(*v as i32))
        } else if let Some(v) = value.downcast_ref::<u16>() {
            Ok(Value::I32(*v as i32))
        } else if let Some(v) = value.downcast_ref::<u32>() {
            Ok(Value::I64(*v as i64))
        } else if let Some(v) = value.downcast_ref::<i64>() {
            Ok(Value::I64(*v))
        } else if let Some(v) = value.downcast_ref::<f32>() {
            Ok(Value::F64(*v as f64))
        } else if let Some(v) = value.downcast_ref::<f64>() {
            Ok(Value::F64(*v))
        } else if let Some(v) = value.downcast_ref::<char>() {
            Ok(Value::String(v.to_string()))
        } else if let Some(v) = value.downcast_ref::<String>() {
            Ok(Value::String(v.clone()))
        } else if let Some(v) = value.downcast_ref::<&str>() {
            Ok(Value::String(v.to_string()))
        } else if let Some(v) = value.downcast_ref::<Vec<u8>>() {
            Ok(Value::Binary(v.clone()))
        } else if let Some(v) = value.downcast_ref::<DateTime<Utc>>() {
            Ok(Value::DateTime(*v))
        } else if let Some(v) = value.downcast_ref::<Pattern>() {
            Ok(Value::Regex(v.clone()))
        } else if let Some(v) = value.downcast_ref::<Uuid>() {
            Ok(Value::Uuid(*v))
        } else if let Some(v) = value.downcast_ref::<Document>() {
            Ok(Value::Document(v.clone()))
        } else if let Some(v) = value.downcast_ref::<DocumentList>() {
            Ok(Value::List(v.clone()))
        } else if let Some(v) = value.downcast_ref::<Marker>() {
            Ok(Value::Special(v.clone()))
        } else {
            log::error!("Value of type {:?} can't be stored in a document", value.type_id());
            Err(MapperError::new(
                "Value of this type can't be stored in a document",
                ErrorKind::UnsupportedValueKind,
            ))
        }
    }

    /// Name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F64(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::DateTime(_) => "date",
            Value::Regex(_) => "regex",
            Value::Uuid(_) => "uuid",
            Value::Document(_) => "document",
            Value::List(_) => "list",
            Value::Special(Marker::MinKey) => "minKey",
            Value::Special(Marker::MaxKey) => "maxKey",
            Value::Special(Marker::Timestamp { .. }) => "timestamp",
            Value::Special(Marker::Code(_)) => "code",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I32(_) | Value::I64(_) | Value::F64(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any integer value widened to `i64`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any numeric value as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::I32(v) => Some(*v as f64),
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Value::Regex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Value::Uuid(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&DocumentList> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Value::Special(v) => Some(v),
            _ => None,
        }
    }

    /// Copies nested documents and lists into new free-standing containers.
    pub fn deep_copy(&self) -> MapperResult<Value> {
        match self {
            Value::Document(d) => Ok(Value::Document(d.deep_copy()?)),
            Value::List(l) => Ok(Value::List(l.deep_copy()?)),
            other => Ok(other.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return a == b;
        }

        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Special(a), Value::Special(b)) => a == b,
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.write_notation(&mut out);
        f.write_str(&out)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::I32(value as i32)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::I32(value as i32)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::I32(value as i32)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::I32(value as i32)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Pattern> for Value {
    fn from(value: Pattern) -> Self {
        Value::Regex(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<DocumentList> for Value {
    fn from(value: DocumentList) -> Self {
        Value::List(value)
    }
}

impl From<Marker> for Value {
    fn from(value: Marker) -> Self {
        Value::Special(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(DocumentList::from_values(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

/// Creates a [`Value`] from any expression convertible into one.
///
/// ```rust
/// use docmap::val;
/// use docmap::document::Value;
///
/// assert_eq!(val!(42), Value::I32(42));
/// assert_eq!(val!("hello"), Value::String("hello".to_string()));
/// ```
#[macro_export]
macro_rules! val {
    ($value:expr) => {
        $crate::document::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_integer_equality_across_widths() {
        assert_eq!(Value::I32(5), Value::I64(5));
        assert_ne!(Value::I32(5), Value::F64(5.0));
        assert_ne!(Value::I32(5), Value::I64(6));
    }

    #[test]
    fn test_nan_equals_nan() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
    }

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(7u8), Value::I32(7));
        assert_eq!(Value::from(7u32), Value::I64(7));
        assert_eq!(Value::from(1.5f32), Value::F64(1.5));
        assert_eq!(Value::from('x'), Value::String("x".into()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::String("a".into()));
    }

    #[test]
    fn test_from_any_supported() {
        assert_eq!(Value::from_any(&42i32).unwrap(), Value::I32(42));
        assert_eq!(Value::from_any(&"s".to_string()).unwrap(), val!("s"));
        assert_eq!(Value::from_any(&()).unwrap(), Value::Null);
        let id = Uuid::new_v4();
        assert_eq!(Value::from_any(&id).unwrap(), Value::Uuid(id));
    }

    #[test]
    fn test_from_any_rejects_foreign_types() {
        struct Foreign;
        let err = Value::from_any(&Foreign).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedValueKind);

        let err = Value::from_any(&std::collections::HashMap::<String, i32>::new()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedValueKind);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::I32(3).as_integer(), Some(3));
        assert_eq!(Value::I64(3).as_number(), Some(3.0));
        assert_eq!(Value::String("a".into()).as_str(), Some("a"));
        assert!(Value::Bool(true).as_str().is_none());
        assert!(Value::Null.is_null());
        assert!(Value::F64(1.0).is_number());
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(Value::Null.kind_name(), "null");
        assert_eq!(Value::Special(Marker::MaxKey).kind_name(), "maxKey");
        assert_eq!(Value::Document(Document::new()).kind_name(), "document");
    }

    #[test]
    fn test_pattern_compile_with_flags() {
        let pattern = Pattern::new("^ab+c$", "i");
        let regex = pattern.compile().unwrap();
        assert!(regex.is_match("ABBC"));

        let err = Pattern::new("a", "q").compile().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);

        let err = Pattern::new("(", "").compile().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);
    }

    #[test]
    fn test_deep_copy_detaches_nested() {
        let nested = doc! { a: 1 };
        let value = Value::Document(nested.clone());
        let copy = value.deep_copy().unwrap();
        nested.put("a", 2).unwrap();
        assert_eq!(copy.as_document().unwrap().get("a").unwrap(), Value::I32(1));
    }
}
