use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::document::Value;
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// A codec between a scalar Rust type and a document [`Value`].
///
/// Converters are registered per target type in a [`ConverterRegistry`].
/// Registering a converter for a type makes that type usable as a scalar
/// field of an entity (see [`scalar_field!`](crate::scalar_field)).
///
/// # Examples
///
/// ```rust,ignore
/// struct Celsius(f64);
///
/// struct CelsiusConverter;
///
/// impl TypeConverter<Celsius> for CelsiusConverter {
///     fn to_value(&self, value: &Celsius) -> MapperResult<Value> {
///         Ok(Value::F64(value.0))
///     }
///
///     fn from_value(&self, value: &Value) -> MapperResult<Celsius> {
///         value.as_number().map(Celsius).ok_or_else(|| ...)
///     }
/// }
/// ```
pub trait TypeConverter<T>: Send + Sync {
    /// Encodes `value` as a document value.
    fn to_value(&self, value: &T) -> MapperResult<Value>;

    /// Decodes a document value into `T`.
    fn from_value(&self, value: &Value) -> MapperResult<T>;
}

/// Scalar converters keyed by the type they handle.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ConverterRegistry::default()
    }

    /// A registry holding the standard numeric, date, geo-point and
    /// pass-through converters.
    pub fn with_defaults() -> Self {
        let mut registry = ConverterRegistry::new();
        super::numbers::register_all(&mut registry);
        super::dates::register_all(&mut registry);
        super::geo::register_all(&mut registry);
        super::passthrough::register_all(&mut registry);
        registry
    }

    /// Adds `converter` for `T`, replacing any converter already registered for it.
    pub fn register<T: 'static, C: TypeConverter<T> + 'static>(&mut self, converter: C) {
        let converter: Arc<dyn TypeConverter<T>> = Arc::new(converter);
        self.converters.insert(TypeId::of::<T>(), Arc::new(converter));
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.converters.contains_key(&type_id)
    }

    pub fn get<T: 'static>(&self) -> Option<Arc<dyn TypeConverter<T>>> {
        self.converters
            .get(&TypeId::of::<T>())
            .and_then(|any| any.downcast_ref::<Arc<dyn TypeConverter<T>>>())
            .cloned()
    }

    pub fn to_value<T: 'static>(&self, value: &T) -> MapperResult<Value> {
        self.require::<T>()?.to_value(value)
    }

    pub fn from_value<T: 'static>(&self, value: &Value) -> MapperResult<T> {
        self.require::<T>()?.from_value(value)
    }

    fn require<T: 'static>(&self) -> MapperResult<Arc<dyn TypeConverter<T>>> {
        self.get::<T>().ok_or_else(|| {
            log::error!("No converter is registered for {}", type_name::<T>());
            MapperError::new(
                &format!("No converter is registered for {}", type_name::<T>()),
                ErrorKind::MissingSchema,
            )
        })
    }
}

/// The error raised when a converter is handed a value of a kind it cannot read.
pub(crate) fn unreadable<T>(value: &Value) -> MapperError {
    log::error!("Cannot read a {} value as {}", value.kind_name(), type_name::<T>());
    MapperError::new(
        &format!("Cannot read a {} value as {}", value.kind_name(), type_name::<T>()),
        ErrorKind::ConversionError,
    )
}
