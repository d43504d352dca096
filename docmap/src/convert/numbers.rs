use std::any::type_name;

use crate::convert::converter::unreadable;
use crate::convert::{ConverterRegistry, TypeConverter};
use crate::document::Value;
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// Converter for the primitive numeric types.
///
/// Narrow integers are stored as `I32`, wide ones as `I64`, floats as `F64`
/// and 128-bit integers as decimal strings. Reading accepts any numeric kind
/// or a numeric string; the following conversions lose information and are
/// accepted on purpose:
///
/// * a stored double read into an integer type is truncated toward zero,
/// * a stored 64-bit integer read into a float type is rounded,
/// * a stored double read into `f32` is rounded.
///
/// An integer that does not fit the target type is a conversion error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberConverter;

fn out_of_range<T>(value: impl std::fmt::Display) -> MapperError {
    log::error!("{} does not fit in {}", value, type_name::<T>());
    MapperError::new(
        &format!("{} does not fit in {}", value, type_name::<T>()),
        ErrorKind::ConversionError,
    )
}

/// Reads any numeric kind, or a numeric string, as a wide integer.
fn read_integer<T>(value: &Value) -> MapperResult<i128> {
    match value {
        Value::I32(v) => Ok(*v as i128),
        Value::I64(v) => Ok(*v as i128),
        Value::F64(v) if v.is_finite() => Ok(v.trunc() as i128),
        Value::F64(v) => Err(out_of_range::<T>(v)),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i128>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    let v = s.parse::<f64>()?;
                    if v.is_finite() {
                        Ok(v.trunc() as i128)
                    } else {
                        Err(out_of_range::<T>(v))
                    }
                }
            }
        }
        other => Err(unreadable::<T>(other)),
    }
}

fn read_float<T>(value: &Value) -> MapperResult<f64> {
    match value {
        Value::I32(v) => Ok(*v as f64),
        Value::I64(v) => Ok(*v as f64),
        Value::F64(v) => Ok(*v),
        Value::String(s) => Ok(s.trim().parse::<f64>()?),
        other => Err(unreadable::<T>(other)),
    }
}

macro_rules! integer_converter {
    ($ty:ty, $variant:ident, $store:ty) => {
        impl TypeConverter<$ty> for NumberConverter {
            fn to_value(&self, value: &$ty) -> MapperResult<Value> {
                let stored = <$store>::try_from(*value).map_err(|_| out_of_range::<$store>(value))?;
                Ok(Value::$variant(stored))
            }

            fn from_value(&self, value: &Value) -> MapperResult<$ty> {
                let wide = read_integer::<$ty>(value)?;
                <$ty>::try_from(wide).map_err(|_| out_of_range::<$ty>(wide))
            }
        }
    };
}

integer_converter!(i8, I32, i32);
integer_converter!(i16, I32, i32);
integer_converter!(i32, I32, i32);
integer_converter!(u8, I32, i32);
integer_converter!(u16, I32, i32);
integer_converter!(u32, I64, i64);
integer_converter!(i64, I64, i64);
integer_converter!(isize, I64, i64);
integer_converter!(u64, I64, i64);
integer_converter!(usize, I64, i64);

impl TypeConverter<i128> for NumberConverter {
    fn to_value(&self, value: &i128) -> MapperResult<Value> {
        Ok(Value::String(value.to_string()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<i128> {
        read_integer::<i128>(value)
    }
}

impl TypeConverter<u128> for NumberConverter {
    fn to_value(&self, value: &u128) -> MapperResult<Value> {
        Ok(Value::String(value.to_string()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<u128> {
        match value {
            Value::String(s) if s.trim().parse::<u128>().is_ok() => Ok(s.trim().parse::<u128>()?),
            other => {
                let wide = read_integer::<u128>(other)?;
                u128::try_from(wide).map_err(|_| out_of_range::<u128>(wide))
            }
        }
    }
}

impl TypeConverter<f64> for NumberConverter {
    fn to_value(&self, value: &f64) -> MapperResult<Value> {
        Ok(Value::F64(*value))
    }

    fn from_value(&self, value: &Value) -> MapperResult<f64> {
        read_float::<f64>(value)
    }
}

impl TypeConverter<f32> for NumberConverter {
    fn to_value(&self, value: &f32) -> MapperResult<Value> {
        Ok(Value::F64(*value as f64))
    }

    fn from_value(&self, value: &Value) -> MapperResult<f32> {
        Ok(read_float::<f32>(value)? as f32)
    }
}

pub(crate) fn register_all(registry: &mut ConverterRegistry) {
    registry.register::<i8, _>(NumberConverter);
    registry.register::<i16, _>(NumberConverter);
    registry.register::<i32, _>(NumberConverter);
    registry.register::<i64, _>(NumberConverter);
    registry.register::<i128, _>(NumberConverter);
    registry.register::<isize, _>(NumberConverter);
    registry.register::<u8, _>(NumberConverter);
    registry.register::<u16, _>(NumberConverter);
    registry.register::<u32, _>(NumberConverter);
    registry.register::<u64, _>(NumberConverter);
    registry.register::<u128, _>(NumberConverter);
    registry.register::<usize, _>(NumberConverter);
    registry.register::<f32, _>(NumberConverter);
    registry.register::<f64, _>(NumberConverter);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T>(value: T) -> T
    where
        NumberConverter: TypeConverter<T>,
    {
        let stored = NumberConverter.to_value(&value).unwrap();
        NumberConverter.from_value(&stored).unwrap()
    }

    #[test]
    fn test_round_trips() {
        assert_eq!(round_trip(i8::MIN), i8::MIN);
        assert_eq!(round_trip(u16::MAX), u16::MAX);
        assert_eq!(round_trip(u32::MAX), u32::MAX);
        assert_eq!(round_trip(i64::MIN), i64::MIN);
        assert_eq!(round_trip(i128::MAX), i128::MAX);
        assert_eq!(round_trip(u128::MAX), u128::MAX);
        assert_eq!(round_trip(1.25f32), 1.25f32);
        assert_eq!(round_trip(-0.5f64), -0.5f64);
    }

    #[test]
    fn test_storage_kinds() {
        assert_eq!(NumberConverter.to_value(&7u8).unwrap(), Value::I32(7));
        assert!(matches!(NumberConverter.to_value(&7u32).unwrap(), Value::I64(7)));
        assert_eq!(NumberConverter.to_value(&7i128).unwrap(), Value::from("7"));
    }

    #[test]
    fn test_u64_out_of_range() {
        let err = NumberConverter.to_value(&u64::MAX).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);
        assert_eq!(NumberConverter.to_value(&42u64).unwrap(), Value::I64(42));
    }

    #[test]
    fn test_narrowing_is_checked() {
        let result: MapperResult<i8> = NumberConverter.from_value(&Value::I32(300));
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::ConversionError);
        let result: MapperResult<u32> = NumberConverter.from_value(&Value::I64(-1));
        assert!(result.is_err());
    }

    #[test]
    fn test_lossy_reads() {
        let truncated: i32 = NumberConverter.from_value(&Value::F64(3.99)).unwrap();
        assert_eq!(truncated, 3);
        let widened: f64 = NumberConverter.from_value(&Value::I64(5)).unwrap();
        assert_eq!(widened, 5.0);
    }

    #[test]
    fn test_numeric_strings() {
        let v: i64 = NumberConverter.from_value(&Value::from(" 12 ")).unwrap();
        assert_eq!(v, 12);
        let v: f64 = NumberConverter.from_value(&Value::from("2.5")).unwrap();
        assert_eq!(v, 2.5);
        let err: MapperResult<i32> = NumberConverter.from_value(&Value::from("twelve"));
        assert_eq!(err.unwrap_err().kind(), &ErrorKind::ConversionError);
    }

    #[test]
    fn test_wrong_kind() {
        let err: MapperResult<i32> = NumberConverter.from_value(&Value::Bool(true));
        assert_eq!(err.unwrap_err().kind(), &ErrorKind::ConversionError);
    }
}
