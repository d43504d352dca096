use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::convert::FieldType;
use crate::document::Value;
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::index::IndexedDecl;
use crate::mapper::Mapper;
use crate::schema::{PropertyKind, Schema, TypeDescriptor};

type ReadFn = Arc<dyn Fn(&dyn Any, &Mapper) -> MapperResult<Value> + Send + Sync>;
type DecodeFn = Arc<dyn Fn(&Mapper, Value) -> MapperResult<Box<dyn Any + Send>> + Send + Sync>;
type AssignFn = Arc<dyn Fn(&mut dyn Any, Box<dyn Any + Send>) -> MapperResult<()> + Send + Sync>;
pub(crate) type NestedFn = fn(&Mapper) -> Option<MapperResult<Arc<Schema>>>;

fn wrong_record<T>() -> MapperError {
    log::error!("Accessor applied to a record that is not a {}", type_name::<T>());
    MapperError::new(
        &format!("Accessor applied to a record that is not a {}", type_name::<T>()),
        ErrorKind::InternalError,
    )
}

/// Type-erased read and write access to one field of a record.
#[derive(Clone)]
pub(crate) struct Accessor {
    read: ReadFn,
    decode: DecodeFn,
    assign: AssignFn,
}

impl Accessor {
    pub(crate) fn for_field<T: 'static, F: FieldType>(
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        Accessor {
            read: Arc::new(move |record: &dyn Any, mapper: &Mapper| {
                let record = record.downcast_ref::<T>().ok_or_else(wrong_record::<T>)?;
                get(record).to_value(mapper)
            }),
            decode: Arc::new(|mapper: &Mapper, value: Value| {
                let decoded = F::from_value(mapper, value)?;
                Ok(Box::new(decoded) as Box<dyn Any + Send>)
            }),
            assign: Arc::new(move |record: &mut dyn Any, value: Box<dyn Any + Send>| {
                let record = record.downcast_mut::<T>().ok_or_else(wrong_record::<T>)?;
                let value = value.downcast::<F>().map_err(|_| wrong_record::<F>())?;
                *get_mut(record) = *value;
                Ok(())
            }),
        }
    }

    /// Lifts an accessor on `P` to one on `T` that holds a `P`.
    pub(crate) fn through<T: 'static, P: 'static>(
        self,
        get: fn(&T) -> &P,
        get_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        let Accessor { read, decode, assign } = self;
        Accessor {
            read: Arc::new(move |record: &dyn Any, mapper: &Mapper| {
                let record = record.downcast_ref::<T>().ok_or_else(wrong_record::<T>)?;
                read(get(record) as &dyn Any, mapper)
            }),
            decode,
            assign: Arc::new(move |record: &mut dyn Any, value: Box<dyn Any + Send>| {
                let record = record.downcast_mut::<T>().ok_or_else(wrong_record::<T>)?;
                assign(get_mut(record) as &mut dyn Any, value)
            }),
        }
    }
}

/// How a field is declared: its Rust name and storage annotations.
///
/// ```rust,ignore
/// FieldDecl::new("id").id();
/// FieldDecl::new("display_name").name("displayName");
/// FieldDecl::new("extra").overflow();
/// FieldDecl::new("email").indexed(IndexedDecl::new().unique());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDecl {
    field_name: String,
    name: Option<String>,
    id: bool,
    overflow: bool,
    indexed: Option<IndexedDecl>,
}

impl FieldDecl {
    pub fn new(field_name: &str) -> Self {
        FieldDecl {
            field_name: field_name.to_string(),
            ..FieldDecl::default()
        }
    }

    /// Stores the field under `name` instead of its Rust name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Marks the identity field, always stored as `_id`.
    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// Marks the document that receives unmapped keys.
    pub fn overflow(mut self) -> Self {
        self.overflow = true;
        self
    }

    pub fn indexed(mut self, indexed: IndexedDecl) -> Self {
        self.indexed = Some(indexed);
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_id(&self) -> bool {
        self.id
    }

    pub fn is_overflow(&self) -> bool {
        self.overflow
    }

    pub fn get_indexed(&self) -> Option<&IndexedDecl> {
        self.indexed.as_ref()
    }
}

/// One mapped field of a [`Schema`].
pub struct Property {
    name: String,
    field_name: String,
    declaring_type: &'static str,
    descriptor: TypeDescriptor,
    is_id: bool,
    is_overflow: bool,
    indexed: Option<IndexedDecl>,
    nested: NestedFn,
    accessor: Accessor,
}

impl Property {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        field_name: String,
        declaring_type: &'static str,
        descriptor: TypeDescriptor,
        is_id: bool,
        is_overflow: bool,
        indexed: Option<IndexedDecl>,
        nested: NestedFn,
        accessor: Accessor,
    ) -> Self {
        Property {
            name,
            field_name,
            declaring_type,
            descriptor,
            is_id,
            is_overflow,
            indexed,
            nested,
            accessor,
        }
    }

    /// Storage key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust field name.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Name of the struct that declares the field.
    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> PropertyKind {
        self.descriptor.kind()
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn is_overflow(&self) -> bool {
        self.is_overflow
    }

    /// The single-field index declared on the field, if any.
    pub fn indexed(&self) -> Option<&IndexedDecl> {
        self.indexed.as_ref()
    }

    /// The schema of an embedded field (or of the elements of a list of
    /// embedded records), resolved on demand.
    ///
    /// Resolution is deferred to the first call so that a type may embed
    /// itself.
    pub fn nested_schema(&self, mapper: &Mapper) -> MapperResult<Option<Arc<Schema>>> {
        (self.nested)(mapper).transpose()
    }

    pub(crate) fn read(&self, record: &dyn Any, mapper: &Mapper) -> MapperResult<Value> {
        (self.accessor.read)(record, mapper)
    }

    pub(crate) fn decode(&self, mapper: &Mapper, value: Value) -> MapperResult<Box<dyn Any + Send>> {
        (self.accessor.decode)(mapper, value)
    }

    pub(crate) fn assign(&self, record: &mut dyn Any, value: Box<dyn Any + Send>) -> MapperResult<()> {
        (self.accessor.assign)(record, value)
    }
}

impl Debug for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("field_name", &self.field_name)
            .field("declaring_type", &self.declaring_type)
            .field("kind", &self.descriptor.kind())
            .field("type", &self.descriptor.type_name())
            .field("is_id", &self.is_id)
            .field("is_overflow", &self.is_overflow)
            .finish()
    }
}
