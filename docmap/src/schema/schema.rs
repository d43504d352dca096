use std::any::TypeId;
use std::collections::HashMap;

use crate::index::IndexSpec;
use crate::schema::{EntityKind, Property};

/// The derived document layout of an entity type.
///
/// A schema is built once per type by the [`Mapper`](crate::mapper::Mapper)
/// and shared behind an `Arc`. It lists the mapped properties in
/// declaration order (own fields first, then flattened base fields), the
/// optional overflow field, and the derived indexes.
#[derive(Debug)]
pub struct Schema {
    type_id: TypeId,
    type_name: &'static str,
    storage_name: String,
    kind: EntityKind,
    properties: Vec<Property>,
    by_name: HashMap<String, usize>,
    id_index: Option<usize>,
    overflow: Option<Property>,
    indexes: Vec<IndexSpec>,
}

impl Schema {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        type_id: TypeId,
        type_name: &'static str,
        storage_name: String,
        kind: EntityKind,
        properties: Vec<Property>,
        by_name: HashMap<String, usize>,
        id_index: Option<usize>,
        overflow: Option<Property>,
        indexes: Vec<IndexSpec>,
    ) -> Self {
        Schema {
            type_id,
            type_name,
            storage_name,
            kind,
            properties,
            by_name,
            id_index,
            overflow,
            indexes,
        }
    }

    /// The mapped property stored under `name`. The overflow field is not
    /// a mapped property.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.by_name.get(name).map(|&i| &self.properties[i])
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// The property stored as `_id`.
    pub fn id_property(&self) -> Option<&Property> {
        self.id_index.map(|i| &self.properties[i])
    }

    pub fn overflow_property(&self) -> Option<&Property> {
        self.overflow.as_ref()
    }

    /// Derived indexes: per type, type-level declarations first, then
    /// field-level ones; the entity's own type before its bases.
    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    /// Storage (collection) name.
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}
