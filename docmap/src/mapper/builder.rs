use std::any::TypeId;
use std::collections::HashSet;

use crate::common::DEFAULT_PURGE_INTERVAL;
use crate::convert::{ConverterRegistry, TypeConverter};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::mapper::Mapper;
use crate::schema::Entity;

type Registration = fn(&Mapper) -> MapperResult<()>;

/// Configures and builds a [`Mapper`].
///
/// Every setter validates its argument on the spot; the first failure is
/// kept and returned by [`MapperBuilder::build`], so calls can be chained
/// without checking each one.
///
/// # Usage
///
/// ```rust,ignore
/// let mapper = Mapper::builder()
///     .register_converter::<Celsius, _>(CelsiusConverter)
///     .register::<User>()
///     .register::<Post>()
///     .purge_interval(256)
///     .build()?;
/// ```
pub struct MapperBuilder {
    error: Option<MapperError>,
    converters: ConverterRegistry,
    purge_interval: usize,
    registrations: Vec<Registration>,
}

impl MapperBuilder {
    pub fn new() -> Self {
        MapperBuilder {
            error: None,
            converters: ConverterRegistry::with_defaults(),
            purge_interval: DEFAULT_PURGE_INTERVAL,
            registrations: Vec::new(),
        }
    }

    /// Adds a scalar converter, replacing any converter registered for `T`.
    pub fn register_converter<T: 'static, C: TypeConverter<T> + 'static>(mut self, converter: C) -> Self {
        self.converters.register::<T, C>(converter);
        self
    }

    /// Derives the schema of `T`, and of every type it embeds, when the
    /// mapper is built.
    ///
    /// A declaration error then fails [`MapperBuilder::build`] instead of
    /// the first conversion of a `T`.
    pub fn register<T: Entity>(mut self) -> Self {
        self.registrations.push(register_entity::<T>);
        self
    }

    /// Sets how many identity-cache inserts happen between two sweeps of
    /// dead bindings.
    ///
    /// # Errors
    /// `ValidationError` if `interval` is zero.
    pub fn purge_interval(mut self, interval: usize) -> Self {
        if self.error.is_none() {
            if interval == 0 {
                log::error!("Purge interval must be greater than zero");
                self.error = Some(MapperError::new(
                    "Purge interval must be greater than zero",
                    ErrorKind::ValidationError,
                ));
            } else {
                self.purge_interval = interval;
            }
        }
        self
    }

    pub fn build(self) -> MapperResult<Mapper> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let mapper = Mapper::with_config(self.converters, self.purge_interval);
        for registration in &self.registrations {
            registration(&mapper)?;
        }
        log::debug!(
            "Mapper built with {} registered entities",
            self.registrations.len()
        );
        Ok(mapper)
    }
}

impl Default for MapperBuilder {
    fn default() -> Self {
        MapperBuilder::new()
    }
}

fn register_entity<T: Entity>(mapper: &Mapper) -> MapperResult<()> {
    let root = mapper.schema::<T>()?;
    let mut visited = HashSet::from([TypeId::of::<T>()]);
    let mut pending = vec![root];
    while let Some(schema) = pending.pop() {
        for property in schema.properties() {
            if let Some(nested) = property.nested_schema(mapper)? {
                if visited.insert(nested.type_id()) {
                    pending.push(nested);
                }
            }
        }
    }
    Ok(())
}
