use std::any::{type_name, TypeId};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use crate::common::DOC_ID;
use crate::convert::FieldType;
use crate::document::Document;
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::index::{IndexDecl, IndexSpec, TextIndexDecl};
use crate::mapper::Mapper;
use crate::schema::property::{Accessor, NestedFn};
use crate::schema::{
    Entity, EntityKind, FieldDecl, Property, PropertyKind, Schema, TypeDescriptor,
};

struct PropertyDecl {
    decl: FieldDecl,
    declaring_type: &'static str,
    descriptor: TypeDescriptor,
    nested: NestedFn,
    accessor: Accessor,
}

#[derive(Clone)]
enum PendingIndex {
    Plain(IndexDecl),
    Text(TextIndexDecl),
}

/// The declarations of one type in an embedding chain.
struct Level {
    declaring_type: &'static str,
    fields: Vec<PropertyDecl>,
    indexes: Vec<PendingIndex>,
}

impl Level {
    fn new(declaring_type: &'static str) -> Self {
        Level {
            declaring_type,
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }
}

/// Collects the layout of an entity type inside [`Entity::describe`].
///
/// The builder records declarations as they come and validates them all
/// when the mapper builds the [`Schema`]. A declaration error (for example
/// from a base type) is kept and reported at that point.
///
/// # Usage
///
/// ```ignore
/// fn describe(builder: &mut SchemaBuilder<Self>) {
///     builder
///         .name("posts")
///         .index(IndexDecl::new(&["-created", "author"]))
///         .field(FieldDecl::new("id").id(), |p| &p.id, |p| &mut p.id)
///         .field(FieldDecl::new("title"), |p| &p.title, |p| &mut p.title)
///         .base(|p| &p.audit, |p| &mut p.audit);
/// }
/// ```
pub struct SchemaBuilder<T: Entity> {
    storage_name: Option<String>,
    own: Level,
    bases: Vec<Level>,
    error: Option<MapperError>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> SchemaBuilder<T> {
    pub(crate) fn new() -> Self {
        SchemaBuilder {
            storage_name: None,
            own: Level::new(type_name::<T>()),
            bases: Vec::new(),
            error: None,
            _marker: PhantomData,
        }
    }

    /// Sets the storage (collection) name; defaults to the type's simple name.
    pub fn name(&mut self, name: &str) -> &mut Self {
        if !name.is_empty() {
            self.storage_name = Some(name.to_string());
        }
        self
    }

    /// Declares a mapped field.
    ///
    /// # Arguments
    /// * `decl` - the field's Rust name and storage annotations
    /// * `get`, `get_mut` - accessors for the field on the record
    ///
    /// The field's layout comes from its [`FieldType`].
    pub fn field<F: FieldType>(
        &mut self,
        decl: FieldDecl,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> &mut Self {
        self.own.fields.push(PropertyDecl {
            decl,
            declaring_type: type_name::<T>(),
            descriptor: F::descriptor(),
            nested: F::nested_schema,
            accessor: Accessor::for_field(get, get_mut),
        });
        self
    }

    /// Flattens the fields and indexes of a base type held by the record.
    ///
    /// The base's fields are stored at the top level of this type's
    /// documents, after this type's own fields. Its indexes come after this
    /// type's indexes.
    pub fn base<P: Entity>(
        &mut self,
        get: fn(&T) -> &P,
        get_mut: fn(&mut T) -> &mut P,
    ) -> &mut Self {
        let mut base = SchemaBuilder::<P>::new();
        P::describe(&mut base);
        if let Some(error) = base.error.take() {
            self.fail(error);
            return self;
        }

        let SchemaBuilder { own, bases, .. } = base;
        for level in std::iter::once(own).chain(bases) {
            let fields = level
                .fields
                .into_iter()
                .map(|field| PropertyDecl {
                    accessor: field.accessor.through(get, get_mut),
                    ..field
                })
                .collect();
            self.bases.push(Level {
                declaring_type: level.declaring_type,
                fields,
                indexes: level.indexes,
            });
        }
        self
    }

    /// Declares a type-level index.
    pub fn index(&mut self, decl: IndexDecl) -> &mut Self {
        self.own.indexes.push(PendingIndex::Plain(decl));
        self
    }

    /// Declares a text index.
    pub fn text_index(&mut self, decl: TextIndexDecl) -> &mut Self {
        self.own.indexes.push(PendingIndex::Text(decl));
        self
    }

    /// Records a declaration error; the first one wins.
    pub fn fail(&mut self, error: MapperError) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    pub(crate) fn build(self, mapper: &Mapper) -> MapperResult<Schema> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let storage_name = self
            .storage_name
            .unwrap_or_else(|| simple_name(type_name::<T>()).to_string());

        let mut properties = Vec::new();
        let mut overflow: Option<Property> = None;
        let mut seen = HashSet::new();
        let mut indexes = Vec::new();

        for level in std::iter::once(self.own).chain(self.bases) {
            for pending in &level.indexes {
                indexes.push(match pending {
                    PendingIndex::Plain(decl) => IndexSpec::from_decl(decl),
                    PendingIndex::Text(decl) => IndexSpec::from_text_decl(decl),
                }
                .map_err(|e| in_type(level.declaring_type, e))?);
            }

            for field in level.fields {
                let property = derive_property(field, mapper)?;
                if property.is_overflow() {
                    if let Some(existing) = &overflow {
                        return Err(schema_error(&format!(
                            "Duplicate overflow field at {}.{}, already declared at {}.{}",
                            property.declaring_type(),
                            property.field_name(),
                            existing.declaring_type(),
                            existing.field_name()
                        )));
                    }
                    overflow = Some(property);
                    continue;
                }

                if !seen.insert(property.name().to_string()) {
                    return Err(schema_error(&format!(
                        "Duplicate property name '{}' at {}.{}",
                        property.name(),
                        property.declaring_type(),
                        property.field_name()
                    )));
                }
                properties.push(property);
            }

            // field-level indexes follow the type-level ones of the same type
            for property in properties.iter().filter(|p| p.declaring_type() == level.declaring_type) {
                if let Some(indexed) = property.indexed() {
                    let decl = indexed.for_field(property.name());
                    indexes.push(
                        IndexSpec::from_decl(&decl).map_err(|e| in_type(level.declaring_type, e))?,
                    );
                }
            }
        }

        let by_name: HashMap<String, usize> = properties
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name().to_string(), i))
            .collect();
        let id_index = properties.iter().position(|p| p.is_id());

        log::debug!(
            "Derived schema '{}' for {} with {} properties and {} indexes",
            storage_name,
            type_name::<T>(),
            properties.len(),
            indexes.len()
        );

        Ok(Schema::new(
            TypeId::of::<T>(),
            type_name::<T>(),
            storage_name,
            T::entity_kind(),
            properties,
            by_name,
            id_index,
            overflow,
            indexes,
        ))
    }
}

fn derive_property(field: PropertyDecl, mapper: &Mapper) -> MapperResult<Property> {
    let PropertyDecl {
        decl,
        declaring_type,
        descriptor,
        nested,
        accessor,
    } = field;
    let location = format!("{}.{}", declaring_type, decl.field_name());

    if decl.is_overflow() {
        if decl.get_name().is_some() {
            return Err(schema_error(&format!(
                "The overflow field at {} cannot have a storage name",
                location
            )));
        }
        if descriptor.type_id() != TypeId::of::<Document>() {
            return Err(schema_error(&format!(
                "The overflow field at {} must be a Document, found {}",
                location,
                descriptor.type_name()
            )));
        }
        return Ok(Property::new(
            decl.field_name().to_string(),
            decl.field_name().to_string(),
            declaring_type,
            descriptor,
            false,
            true,
            None,
            nested,
            accessor,
        ));
    }

    let name = match decl.get_name() {
        Some(name) if decl.is_id() && name != DOC_ID => {
            return Err(schema_error(&format!(
                "The id field at {} cannot be stored as '{}'",
                location, name
            )));
        }
        _ if decl.is_id() => DOC_ID.to_string(),
        Some(name) => name.to_string(),
        None => decl.field_name().to_string(),
    };
    validate_descriptor(&descriptor, mapper, &location)?;

    let is_id = name == DOC_ID;
    Ok(Property::new(
        name,
        decl.field_name().to_string(),
        declaring_type,
        descriptor,
        is_id,
        false,
        decl.get_indexed().cloned(),
        nested,
        accessor,
    ))
}

fn validate_descriptor(
    descriptor: &TypeDescriptor,
    mapper: &Mapper,
    location: &str,
) -> MapperResult<()> {
    match descriptor.kind() {
        PropertyKind::Scalar => {
            if !mapper.converters().contains_type(descriptor.type_id()) {
                return Err(schema_error(&format!(
                    "No converter registered for {} at {}",
                    descriptor.type_name(),
                    location
                )));
            }
        }
        PropertyKind::Embedded => {
            if descriptor.entity_kind() == Some(EntityKind::Entity) {
                return Err(schema_error(&format!(
                    "Cannot embed the top-level entity {} at {}",
                    descriptor.type_name(),
                    location
                )));
            }
        }
        PropertyKind::Array => match descriptor.element() {
            Some(element) => validate_descriptor(element, mapper, location)?,
            None => {
                log::error!("No element type for the list at {}", location);
                return Err(MapperError::new(
                    &format!("No element type for the list at {}", location),
                    ErrorKind::MissingElementType,
                ));
            }
        },
        PropertyKind::Enum | PropertyKind::Document => {}
    }
    Ok(())
}

fn simple_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

fn schema_error(message: &str) -> MapperError {
    log::error!("{}", message);
    MapperError::new(message, ErrorKind::SchemaError)
}

fn in_type(declaring_type: &str, cause: MapperError) -> MapperError {
    MapperError::new_with_cause(
        &format!("Invalid index declaration on {}", declaring_type),
        cause.kind().clone(),
        cause,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Shared, SharedList};
    use crate::doc;
    use crate::index::IndexedDecl;

    #[derive(Default)]
    struct Audit {
        created_by: String,
        revision: i64,
    }

    impl Entity for Audit {
        fn entity_kind() -> EntityKind {
            EntityKind::Embedded
        }

        fn describe(builder: &mut SchemaBuilder<Self>) {
            builder
                .index(IndexDecl::new(&["revision"]))
                .field(
                    FieldDecl::new("created_by")
                        .name("createdBy")
                        .indexed(IndexedDecl::new()),
                    |a| &a.created_by,
                    |a| &mut a.created_by,
                )
                .field(FieldDecl::new("revision"), |a| &a.revision, |a| &mut a.revision);
        }
    }

    #[derive(Default)]
    struct Post {
        id: Option<String>,
        title: String,
        tags: SharedList<String>,
        extra: Document,
        audit: Audit,
    }

    impl Entity for Post {
        fn describe(builder: &mut SchemaBuilder<Self>) {
            builder
                .name("posts")
                .index(IndexDecl::new(&["-title"]).unique())
                .field(FieldDecl::new("id").id(), |p| &p.id, |p| &mut p.id)
                .field(
                    FieldDecl::new("title").indexed(IndexedDecl::new().descending().sparse()),
                    |p| &p.title,
                    |p| &mut p.title,
                )
                .field(FieldDecl::new("tags"), |p| &p.tags, |p| &mut p.tags)
                .field(FieldDecl::new("extra").overflow(), |p| &p.extra, |p| &mut p.extra)
                .base(|p| &p.audit, |p| &mut p.audit);
        }
    }

    fn build<T: Entity>() -> MapperResult<Schema> {
        let mut builder = SchemaBuilder::<T>::new();
        T::describe(&mut builder);
        builder.build(&Mapper::new())
    }

    #[test]
    fn test_properties_in_declaration_order() {
        let schema = build::<Post>().unwrap();
        assert_eq!(schema.storage_name(), "posts");
        let names: Vec<&str> = schema.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["_id", "title", "tags", "createdBy", "revision"]);
        assert_eq!(schema.id_property().map(|p| p.field_name()), Some("id"));
        assert_eq!(schema.overflow_property().map(|p| p.field_name()), Some("extra"));
        assert!(schema.property("extra").is_none());
        assert_eq!(schema.property("createdBy").unwrap().field_name(), "created_by");
    }

    #[test]
    fn test_index_order() {
        let schema = build::<Post>().unwrap();
        let names: Vec<&str> = schema.indexes().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["title_-1", "title_-1", "revision_1", "createdBy_1"]);
        assert!(schema.indexes()[0].is_unique());
        assert!(schema.indexes()[1].is_sparse());
        assert_eq!(schema.indexes()[1].keys_document(), doc! { title: (-1) });
    }

    #[test]
    fn test_base_fields_read_through_holder() {
        let schema = build::<Post>().unwrap();
        let mapper = Mapper::new();
        let post = Post {
            audit: Audit {
                created_by: "ann".to_string(),
                revision: 3,
            },
            ..Post::default()
        };
        let property = schema.property("revision").unwrap();
        assert_eq!(property.read(&post, &mapper).unwrap(), 3i64.into());

        let mut post = post;
        let decoded = property.decode(&mapper, 7.into()).unwrap();
        property.assign(&mut post, decoded).unwrap();
        assert_eq!(post.audit.revision, 7);
    }

    #[test]
    fn test_default_storage_name() {
        #[derive(Default)]
        struct Plain {
            a: i32,
        }
        impl Entity for Plain {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("a"), |p| &p.a, |p| &mut p.a);
            }
        }
        let schema = build::<Plain>().unwrap();
        assert_eq!(schema.storage_name(), "Plain");
        assert!(schema.id_property().is_none());
    }

    #[test]
    fn test_field_named_id_is_the_id() {
        #[derive(Default)]
        struct Keyed {
            key: i64,
        }
        impl Entity for Keyed {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("key").name("_id"), |k| &k.key, |k| &mut k.key);
            }
        }
        let schema = build::<Keyed>().unwrap();
        assert!(schema.property("_id").unwrap().is_id());
    }

    #[test]
    fn test_renamed_id_is_rejected() {
        #[derive(Default)]
        struct BadId {
            key: i64,
        }
        impl Entity for BadId {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("key").id().name("key"), |k| &k.key, |k| &mut k.key);
            }
        }
        let err = build::<BadId>().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SchemaError);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        #[derive(Default)]
        struct Twice {
            a: i32,
            b: i32,
        }
        impl Entity for Twice {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder
                    .field(FieldDecl::new("a").name("x"), |t| &t.a, |t| &mut t.a)
                    .field(FieldDecl::new("b").name("x"), |t| &t.b, |t| &mut t.b);
            }
        }
        let err = build::<Twice>().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SchemaError);
        assert!(err.message().contains("'x'"));
    }

    #[test]
    fn test_overflow_rules() {
        #[derive(Default)]
        struct NamedOverflow {
            extra: Document,
        }
        impl Entity for NamedOverflow {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(
                    FieldDecl::new("extra").overflow().name("more"),
                    |t| &t.extra,
                    |t| &mut t.extra,
                );
            }
        }
        assert!(build::<NamedOverflow>().is_err());

        #[derive(Default)]
        struct TwoOverflows {
            a: Document,
            b: Document,
        }
        impl Entity for TwoOverflows {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder
                    .field(FieldDecl::new("a").overflow(), |t| &t.a, |t| &mut t.a)
                    .field(FieldDecl::new("b").overflow(), |t| &t.b, |t| &mut t.b);
            }
        }
        assert!(build::<TwoOverflows>().is_err());

        #[derive(Default)]
        struct ScalarOverflow {
            a: String,
        }
        impl Entity for ScalarOverflow {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("a").overflow(), |t| &t.a, |t| &mut t.a);
            }
        }
        let err = build::<ScalarOverflow>().unwrap_err();
        assert!(err.message().contains("must be a Document"));
    }

    #[test]
    fn test_embedding_an_entity_is_rejected() {
        #[derive(Default)]
        struct Owner {
            inner: Shared<Plain>,
        }
        #[derive(Default)]
        struct Plain {
            a: i32,
        }
        impl Entity for Plain {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("a"), |p| &p.a, |p| &mut p.a);
            }
        }
        impl Entity for Owner {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("inner"), |o| &o.inner, |o| &mut o.inner);
            }
        }
        let err = build::<Owner>().unwrap_err();
        assert!(err.message().contains("Owner.inner"));
    }

    #[test]
    fn test_list_of_embedded_entities_is_rejected() {
        #[derive(Default)]
        struct Plain {
            a: i32,
        }
        impl Entity for Plain {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("a"), |p| &p.a, |p| &mut p.a);
            }
        }
        #[derive(Default)]
        struct Owner {
            items: SharedList<Shared<Plain>>,
        }
        impl Entity for Owner {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.field(FieldDecl::new("items"), |o| &o.items, |o| &mut o.items);
            }
        }
        assert_eq!(build::<Owner>().unwrap_err().kind(), &ErrorKind::SchemaError);
    }

    #[test]
    fn test_recorded_error_wins() {
        #[derive(Default)]
        struct Failing;
        impl Entity for Failing {
            fn describe(builder: &mut SchemaBuilder<Self>) {
                builder.fail(MapperError::new("bad declaration", ErrorKind::SchemaError));
            }
        }
        assert_eq!(build::<Failing>().unwrap_err().message(), "bad declaration");
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("app::model::User"), "User");
        assert_eq!(simple_name("app::Wrapper<app::Inner>"), "Wrapper");
        assert_eq!(simple_name("User"), "User");
    }
}
