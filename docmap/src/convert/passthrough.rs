use uuid::Uuid;

use crate::convert::converter::unreadable;
use crate::convert::{ConverterRegistry, TypeConverter};
use crate::document::{Marker, Pattern, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// Converter for types that have a value kind of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughConverter;

impl TypeConverter<String> for PassThroughConverter {
    fn to_value(&self, value: &String) -> MapperResult<Value> {
        Ok(Value::String(value.clone()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(unreadable::<String>(other)),
        }
    }
}

impl TypeConverter<bool> for PassThroughConverter {
    fn to_value(&self, value: &bool) -> MapperResult<Value> {
        Ok(Value::Bool(*value))
    }

    fn from_value(&self, value: &Value) -> MapperResult<bool> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(unreadable::<bool>(other)),
        }
    }
}

/// A `char` is stored as a one-character string.
impl TypeConverter<char> for PassThroughConverter {
    fn to_value(&self, value: &char) -> MapperResult<Value> {
        Ok(Value::String(value.to_string()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<char> {
        match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => {
                        log::error!("'{}' is not a single character", s);
                        Err(MapperError::new(
                            &format!("'{}' is not a single character", s),
                            ErrorKind::ConversionError,
                        ))
                    }
                }
            }
            other => Err(unreadable::<char>(other)),
        }
    }
}

impl TypeConverter<Uuid> for PassThroughConverter {
    fn to_value(&self, value: &Uuid) -> MapperResult<Value> {
        Ok(Value::Uuid(*value))
    }

    fn from_value(&self, value: &Value) -> MapperResult<Uuid> {
        match value {
            Value::Uuid(id) => Ok(*id),
            Value::String(s) => Ok(Uuid::parse_str(s)?),
            other => Err(unreadable::<Uuid>(other)),
        }
    }
}

impl TypeConverter<Vec<u8>> for PassThroughConverter {
    fn to_value(&self, value: &Vec<u8>) -> MapperResult<Value> {
        Ok(Value::Binary(value.clone()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<Vec<u8>> {
        match value {
            Value::Binary(bytes) => Ok(bytes.clone()),
            other => Err(unreadable::<Vec<u8>>(other)),
        }
    }
}

impl TypeConverter<Pattern> for PassThroughConverter {
    fn to_value(&self, value: &Pattern) -> MapperResult<Value> {
        Ok(Value::Regex(value.clone()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<Pattern> {
        match value {
            Value::Regex(p) => Ok(p.clone()),
            Value::String(s) => Ok(Pattern::new(s, "")),
            other => Err(unreadable::<Pattern>(other)),
        }
    }
}

impl TypeConverter<Marker> for PassThroughConverter {
    fn to_value(&self, value: &Marker) -> MapperResult<Value> {
        Ok(Value::Special(value.clone()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<Marker> {
        match value {
            Value::Special(marker) => Ok(marker.clone()),
            other => Err(unreadable::<Marker>(other)),
        }
    }
}

pub(crate) fn register_all(registry: &mut ConverterRegistry) {
    registry.register::<String, _>(PassThroughConverter);
    registry.register::<bool, _>(PassThroughConverter);
    registry.register::<char, _>(PassThroughConverter);
    registry.register::<Uuid, _>(PassThroughConverter);
    registry.register::<Vec<u8>, _>(PassThroughConverter);
    registry.register::<Pattern, _>(PassThroughConverter);
    registry.register::<Marker, _>(PassThroughConverter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char() {
        assert_eq!(PassThroughConverter.to_value(&'z').unwrap(), Value::from("z"));
        let c: char = PassThroughConverter.from_value(&Value::from("é")).unwrap();
        assert_eq!(c, 'é');
        let err: MapperResult<char> = PassThroughConverter.from_value(&Value::from("ab"));
        assert_eq!(err.unwrap_err().kind(), &ErrorKind::ConversionError);
    }

    #[test]
    fn test_uuid_from_string() {
        let id = Uuid::new_v4();
        let back: Uuid = PassThroughConverter.from_value(&Value::String(id.to_string())).unwrap();
        assert_eq!(back, id);
        let err: MapperResult<Uuid> = PassThroughConverter.from_value(&Value::from("nope"));
        assert!(err.is_err());
    }

    #[test]
    fn test_strict_kinds() {
        let err: MapperResult<String> = PassThroughConverter.from_value(&Value::I32(1));
        assert_eq!(err.unwrap_err().kind(), &ErrorKind::ConversionError);
        let err: MapperResult<bool> = PassThroughConverter.from_value(&Value::from("true"));
        assert!(err.is_err());
    }

    #[test]
    fn test_binary_and_markers() {
        let bytes = vec![1u8, 2, 3];
        let stored = PassThroughConverter.to_value(&bytes).unwrap();
        assert_eq!(stored, Value::Binary(bytes.clone()));
        let marker = Marker::Code("x => x".into());
        let back: Marker = PassThroughConverter
            .from_value(&PassThroughConverter.to_value(&marker).unwrap())
            .unwrap();
        assert_eq!(back, marker);
    }
}
