use std::any::{type_name, TypeId};

use crate::schema::{Entity, EntityKind};

/// How a property's value is laid out in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Encoded by a registered type converter
    Scalar,
    /// Stored as the variant name
    Enum,
    /// A nested entity, bound as a nested document
    Embedded,
    /// A list of elements, bound as a nested document list
    Array,
    /// A document value stored as is
    Document,
}

/// The declared type of a field, as seen by schema derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    kind: PropertyKind,
    type_name: &'static str,
    type_id: TypeId,
    element: Option<Box<TypeDescriptor>>,
    entity_kind: Option<EntityKind>,
    nullable: bool,
}

impl TypeDescriptor {
    pub fn new(kind: PropertyKind, type_name: &'static str, type_id: TypeId) -> Self {
        TypeDescriptor {
            kind,
            type_name,
            type_id,
            element: None,
            entity_kind: None,
            nullable: false,
        }
    }

    pub fn of<T: 'static>(kind: PropertyKind) -> Self {
        TypeDescriptor::new(kind, type_name::<T>(), TypeId::of::<T>())
    }

    pub fn scalar<T: 'static>() -> Self {
        TypeDescriptor::of::<T>(PropertyKind::Scalar)
    }

    pub fn enumeration<T: 'static>() -> Self {
        TypeDescriptor::of::<T>(PropertyKind::Enum)
    }

    pub fn document<T: 'static>() -> Self {
        TypeDescriptor::of::<T>(PropertyKind::Document)
    }

    pub fn embedded<E: Entity>() -> Self {
        let mut descriptor = TypeDescriptor::of::<E>(PropertyKind::Embedded);
        descriptor.entity_kind = Some(E::entity_kind());
        descriptor
    }

    pub fn array<T: 'static>(element: Option<TypeDescriptor>) -> Self {
        let mut descriptor = TypeDescriptor::of::<T>(PropertyKind::Array);
        descriptor.element = element.map(Box::new);
        descriptor
    }

    pub fn with_element(mut self, element: TypeDescriptor) -> Self {
        self.element = Some(Box::new(element));
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn element(&self) -> Option<&TypeDescriptor> {
        self.element.as_deref()
    }

    /// The entity kind of an embedded type.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.entity_kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}
