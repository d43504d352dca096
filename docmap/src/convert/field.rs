use std::any::type_name;
use std::sync::Arc;

use crate::common::{Shared, SharedList};
use crate::convert::converter::unreadable;
use crate::document::{Document, DocumentList, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::mapper::Mapper;
use crate::schema::{Entity, Schema, TypeDescriptor};

/// A type that can be the declared type of an entity field.
///
/// `FieldType` ties together everything the mapper needs to know about a
/// field: how it is classified in the schema ([`TypeDescriptor`]), and how
/// its value is encoded to and decoded from a document value. Decoding
/// [`Value::Null`] yields the type's empty value.
///
/// Implementations exist for:
/// * the scalar types with a standard converter (see [`scalar_field!`](crate::scalar_field)),
/// * `Option<F>` (nullable fields),
/// * [`Shared<E>`] for embedded entities, bound live to a nested document,
/// * [`SharedList<E>`] for lists, bound live to a nested [`DocumentList`],
/// * [`Document`], [`DocumentList`] and [`Value`], which pass through,
/// * enums deriving `DocEnum`, stored by variant name.
pub trait FieldType: Sized + Send + Sync + 'static {
    fn descriptor() -> TypeDescriptor;

    fn to_value(&self, mapper: &Mapper) -> MapperResult<Value>;

    fn from_value(mapper: &Mapper, value: Value) -> MapperResult<Self>;

    /// The schema of the embedded type, for embedded fields and lists of them.
    fn nested_schema(_mapper: &Mapper) -> Option<MapperResult<Arc<Schema>>> {
        None
    }
}

/// Implements [`FieldType`] for scalar types handled by a registered
/// [`TypeConverter`](crate::convert::TypeConverter).
///
/// A null decodes to `Default::default()`, or to the given expression with
/// the `Type => expr` form.
///
/// ```rust,ignore
/// scalar_field!(Celsius);
/// scalar_field!(Instant => Instant::ZERO);
/// ```
#[macro_export]
macro_rules! scalar_field {
    ($ty:ty => $null:expr) => {
        impl $crate::convert::FieldType for $ty {
            fn descriptor() -> $crate::schema::TypeDescriptor {
                $crate::schema::TypeDescriptor::scalar::<$ty>()
            }

            fn to_value(
                &self,
                mapper: &$crate::mapper::Mapper,
            ) -> $crate::errors::MapperResult<$crate::document::Value> {
                mapper.converters().to_value::<$ty>(self)
            }

            fn from_value(
                mapper: &$crate::mapper::Mapper,
                value: $crate::document::Value,
            ) -> $crate::errors::MapperResult<Self> {
                if value.is_null() {
                    return Ok($null);
                }
                mapper.converters().from_value::<$ty>(&value)
            }
        }
    };

    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::scalar_field!($ty => <$ty as ::core::default::Default>::default());
        )+
    };
}

scalar_field!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String,
    Vec<u8>,
    uuid::Uuid,
    crate::document::Pattern,
    crate::convert::GeoPoint,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDateTime,
    chrono::NaiveDate,
);
scalar_field!(std::time::SystemTime => std::time::SystemTime::UNIX_EPOCH);
scalar_field!(crate::document::Marker => crate::document::Marker::MinKey);

impl<F: FieldType> FieldType for Option<F> {
    fn descriptor() -> TypeDescriptor {
        F::descriptor().nullable()
    }

    fn to_value(&self, mapper: &Mapper) -> MapperResult<Value> {
        match self {
            Some(value) => value.to_value(mapper),
            None => Ok(Value::Null),
        }
    }

    fn from_value(mapper: &Mapper, value: Value) -> MapperResult<Self> {
        if value.is_null() {
            return Ok(None);
        }
        F::from_value(mapper, value).map(Some)
    }

    fn nested_schema(mapper: &Mapper) -> Option<MapperResult<Arc<Schema>>> {
        F::nested_schema(mapper)
    }
}

impl<E: Entity> FieldType for Shared<E> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::embedded::<E>()
    }

    fn to_value(&self, mapper: &Mapper) -> MapperResult<Value> {
        mapper.to_document(self).map(Value::Document)
    }

    fn from_value(mapper: &Mapper, value: Value) -> MapperResult<Self> {
        match value {
            Value::Null => Ok(Shared::default()),
            Value::Document(document) => mapper.to_entity::<E>(&document),
            other => Err(unreadable::<E>(&other)),
        }
    }

    fn nested_schema(mapper: &Mapper) -> Option<MapperResult<Arc<Schema>>> {
        Some(mapper.schema::<E>())
    }
}

impl<E: FieldType> FieldType for SharedList<E> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::array::<SharedList<E>>(Some(E::descriptor()))
    }

    fn to_value(&self, mapper: &Mapper) -> MapperResult<Value> {
        mapper.list_to_document(self).map(Value::List)
    }

    fn from_value(mapper: &Mapper, value: Value) -> MapperResult<Self> {
        match value {
            Value::Null => Ok(SharedList::default()),
            Value::List(list) => mapper.to_list::<E>(&list),
            other => Err(unreadable::<SharedList<E>>(&other)),
        }
    }

    fn nested_schema(mapper: &Mapper) -> Option<MapperResult<Arc<Schema>>> {
        E::nested_schema(mapper)
    }
}

impl FieldType for Document {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::document::<Document>()
    }

    fn to_value(&self, _mapper: &Mapper) -> MapperResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(_mapper: &Mapper, value: Value) -> MapperResult<Self> {
        match value {
            Value::Null => Ok(Document::new()),
            Value::Document(document) => Ok(document),
            other => Err(unreadable::<Document>(&other)),
        }
    }
}

impl FieldType for DocumentList {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::document::<DocumentList>()
    }

    fn to_value(&self, _mapper: &Mapper) -> MapperResult<Value> {
        Ok(Value::List(self.clone()))
    }

    fn from_value(_mapper: &Mapper, value: Value) -> MapperResult<Self> {
        match value {
            Value::Null => Ok(DocumentList::new()),
            Value::List(list) => Ok(list),
            other => Err(unreadable::<DocumentList>(&other)),
        }
    }
}

impl FieldType for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::document::<Value>()
    }

    fn to_value(&self, _mapper: &Mapper) -> MapperResult<Value> {
        Ok(self.clone())
    }

    fn from_value(_mapper: &Mapper, value: Value) -> MapperResult<Self> {
        Ok(value)
    }
}

/// A fieldless enum stored as the name of its variant.
///
/// Usually derived with `#[derive(DocEnum)]`, which also implements
/// [`FieldType`] on top of [`enum_to_value`] and [`enum_from_value`].
pub trait DocEnum: Sized {
    fn variant_name(&self) -> &'static str;

    fn from_variant_name(name: &str) -> Option<Self>;
}

pub fn enum_to_value<E: DocEnum>(value: &E) -> Value {
    Value::String(value.variant_name().to_string())
}

/// Parses a stored variant name; a null decodes to the default variant.
pub fn enum_from_value<E: DocEnum + Default>(value: &Value) -> MapperResult<E> {
    match value {
        Value::Null => Ok(E::default()),
        Value::String(name) => E::from_variant_name(name).ok_or_else(|| {
            log::error!("'{}' is not a variant of {}", name, type_name::<E>());
            MapperError::new(
                &format!("'{}' is not a variant of {}", name, type_name::<E>()),
                ErrorKind::ConversionError,
            )
        }),
        other => Err(unreadable::<E>(other)),
    }
}
