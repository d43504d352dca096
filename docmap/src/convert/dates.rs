use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::convert::converter::unreadable;
use crate::convert::{ConverterRegistry, TypeConverter};
use crate::document::Value;
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// Converter for date and time types.
///
/// Everything is stored as a UTC [`Value::DateTime`]. Reading also accepts
/// an integer count of milliseconds since the epoch and an RFC 3339 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

fn read_datetime<T>(value: &Value) -> MapperResult<DateTime<Utc>> {
    match value {
        Value::DateTime(v) => Ok(*v),
        Value::I32(ms) => from_millis(*ms as i64),
        Value::I64(ms) => from_millis(*ms),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| {
                log::error!("Invalid date '{}': {}", s, e);
                MapperError::new(&format!("Invalid date '{}': {}", s, e), ErrorKind::ConversionError)
            }),
        other => Err(unreadable::<T>(other)),
    }
}

fn from_millis(ms: i64) -> MapperResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        log::error!("{} milliseconds is outside the supported date range", ms);
        MapperError::new(
            &format!("{} milliseconds is outside the supported date range", ms),
            ErrorKind::ConversionError,
        )
    })
}

impl TypeConverter<DateTime<Utc>> for DateConverter {
    fn to_value(&self, value: &DateTime<Utc>) -> MapperResult<Value> {
        Ok(Value::DateTime(*value))
    }

    fn from_value(&self, value: &Value) -> MapperResult<DateTime<Utc>> {
        read_datetime::<DateTime<Utc>>(value)
    }
}

impl TypeConverter<NaiveDateTime> for DateConverter {
    fn to_value(&self, value: &NaiveDateTime) -> MapperResult<Value> {
        Ok(Value::DateTime(Utc.from_utc_datetime(value)))
    }

    fn from_value(&self, value: &Value) -> MapperResult<NaiveDateTime> {
        Ok(read_datetime::<NaiveDateTime>(value)?.naive_utc())
    }
}

impl TypeConverter<NaiveDate> for DateConverter {
    fn to_value(&self, value: &NaiveDate) -> MapperResult<Value> {
        match value.and_hms_opt(0, 0, 0) {
            Some(midnight) => Ok(Value::DateTime(Utc.from_utc_datetime(&midnight))),
            None => Err(MapperError::new("Invalid date", ErrorKind::ConversionError)),
        }
    }

    fn from_value(&self, value: &Value) -> MapperResult<NaiveDate> {
        Ok(read_datetime::<NaiveDate>(value)?.date_naive())
    }
}

impl TypeConverter<SystemTime> for DateConverter {
    fn to_value(&self, value: &SystemTime) -> MapperResult<Value> {
        Ok(Value::DateTime(DateTime::<Utc>::from(*value)))
    }

    fn from_value(&self, value: &Value) -> MapperResult<SystemTime> {
        Ok(SystemTime::from(read_datetime::<SystemTime>(value)?))
    }
}

pub(crate) fn register_all(registry: &mut ConverterRegistry) {
    registry.register::<DateTime<Utc>, _>(DateConverter);
    registry.register::<NaiveDateTime, _>(DateConverter);
    registry.register::<NaiveDate, _>(DateConverter);
    registry.register::<SystemTime, _>(DateConverter);
}
