use std::any::{Any, TypeId};
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::common::{Shared, SharedList};
use crate::convert::FieldType;
use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::mapper::Mapper;
use crate::schema::{Property, Schema};

/// Type-erased access to a record living in a [`Shared`] cell.
pub(crate) trait RecordCell: Send + Sync {
    fn read_record(&self, f: &mut dyn FnMut(&dyn Any));
    fn write_record(&self, f: &mut dyn FnMut(&mut dyn Any));
    fn address(&self) -> usize;
    fn record_type(&self) -> TypeId;
    fn record_type_name(&self) -> &'static str;
    fn as_any(&self) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Send + Sync + 'static> RecordCell for Shared<T> {
    fn read_record(&self, f: &mut dyn FnMut(&dyn Any)) {
        let guard = self.read();
        f(&*guard)
    }

    fn write_record(&self, f: &mut dyn FnMut(&mut dyn Any)) {
        let mut guard = self.write();
        f(&mut *guard)
    }

    fn address(&self) -> usize {
        Shared::address(self)
    }

    fn record_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn record_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        Shared::as_any(self)
    }
}

/// Type-erased positional access to a list living in a [`SharedList`] cell.
pub(crate) trait ListCell: Send + Sync {
    fn len(&self) -> usize;
    fn get(&self, mapper: &Mapper, index: usize) -> MapperResult<Value>;
    fn set(&self, mapper: &Mapper, index: usize, value: Value) -> MapperResult<()>;
    fn insert(&self, mapper: &Mapper, index: usize, value: Value) -> MapperResult<()>;
    fn remove(&self, mapper: &Mapper, index: usize) -> MapperResult<Option<Value>>;
    fn snapshot(&self, mapper: &Mapper) -> MapperResult<Vec<Value>>;
    fn address(&self) -> usize;
    fn element_type_name(&self) -> &'static str;
    fn as_any(&self) -> Arc<dyn Any + Send + Sync>;
}

impl<E: FieldType> ListCell for SharedList<E> {
    fn len(&self) -> usize {
        SharedList::len(self)
    }

    fn get(&self, mapper: &Mapper, index: usize) -> MapperResult<Value> {
        let items = self.read();
        match items.get(index) {
            Some(item) => item.to_value(mapper),
            None => Ok(Value::Null),
        }
    }

    fn set(&self, mapper: &Mapper, index: usize, value: Value) -> MapperResult<()> {
        let item = E::from_value(mapper, value)?;
        let mut items = self.write();
        while items.len() < index {
            items.push(E::from_value(mapper, Value::Null)?);
        }
        if index == items.len() {
            items.push(item);
        } else {
            items[index] = item;
        }
        Ok(())
    }

    fn insert(&self, mapper: &Mapper, index: usize, value: Value) -> MapperResult<()> {
        let item = E::from_value(mapper, value)?;
        let mut items = self.write();
        if index > items.len() {
            return Err(out_of_range(index, items.len()));
        }
        items.insert(index, item);
        Ok(())
    }

    fn remove(&self, mapper: &Mapper, index: usize) -> MapperResult<Option<Value>> {
        let removed = {
            let mut items = self.write();
            if index >= items.len() {
                return Ok(None);
            }
            items.remove(index)
        };
        removed.to_value(mapper).map(Some)
    }

    fn snapshot(&self, mapper: &Mapper) -> MapperResult<Vec<Value>> {
        let items = self.read();
        items.iter().map(|item| item.to_value(mapper)).collect()
    }

    fn address(&self) -> usize {
        SharedList::address(self)
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        SharedList::as_any(self)
    }
}

pub(crate) fn out_of_range(index: usize, len: usize) -> MapperError {
    log::error!("Index {} is out of range for a list of {} elements", index, len);
    MapperError::new(
        &format!("Index {} is out of range for a list of {} elements", index, len),
        ErrorKind::InvalidKey,
    )
}

/// State of a bound record that outlives any single view of it.
///
/// Holds the keys the schema does not map (unless the record has an
/// overflow field) and the order in which the view's keys were first seen.
/// The identity cache keeps it for as long as the record is alive, so a
/// view re-created after the previous one was dropped sees the same keys
/// in the same order.
#[derive(Clone, Default)]
pub(crate) struct RecordLayout {
    side_overflow: Document,
    order: Arc<Mutex<IndexSet<String>>>,
}

impl RecordLayout {
    /// An empty layout; keys are recorded as they are put.
    pub(crate) fn new() -> Self {
        RecordLayout::default()
    }

    /// A layout listing the mapped properties in schema order.
    pub(crate) fn for_schema(schema: &Schema) -> Self {
        let layout = RecordLayout::new();
        layout.record_properties(schema);
        layout
    }

    /// Appends the mapped properties not seen yet.
    pub(crate) fn record_properties(&self, schema: &Schema) {
        let mut order = self.order.lock();
        for property in schema.properties() {
            if !order.contains(property.name()) {
                order.insert(property.name().to_string());
            }
        }
    }

    fn record_key(&self, key: &str) {
        let mut order = self.order.lock();
        if !order.contains(key) {
            order.insert(key.to_string());
        }
    }

    fn forget_key(&self, key: &str) {
        self.order.lock().shift_remove(key);
    }

    fn ordered_keys(&self) -> Vec<String> {
        self.order.lock().iter().cloned().collect()
    }
}

/// The live connection between a document and the record it projects.
#[derive(Clone)]
pub(crate) struct Binding {
    schema: Arc<Schema>,
    record: Arc<dyn RecordCell>,
    mapper: Mapper,
    layout: RecordLayout,
}

impl Binding {
    pub(crate) fn new(
        schema: Arc<Schema>,
        record: Arc<dyn RecordCell>,
        mapper: Mapper,
        layout: RecordLayout,
    ) -> Self {
        Binding {
            schema,
            record,
            mapper,
            layout,
        }
    }

    pub(crate) fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub(crate) fn record(&self) -> &Arc<dyn RecordCell> {
        &self.record
    }

    pub(crate) fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub(crate) fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    fn read_property(&self, property: &Property) -> MapperResult<Value> {
        let mut result = None;
        self.record
            .read_record(&mut |record| result = Some(property.read(record, &self.mapper)));
        result.unwrap_or_else(|| Err(MapperError::new("record was not read", ErrorKind::InternalError)))
    }

    fn write_property(&self, property: &Property, value: Value) -> MapperResult<()> {
        let mut decoded = Some(property.decode(&self.mapper, value)?);
        let mut result = Ok(());
        self.record.write_record(&mut |record| {
            if let Some(decoded) = decoded.take() {
                result = property.assign(record, decoded);
            }
        });
        result
    }

    /// The document holding keys the schema does not map.
    ///
    /// Lives in the record's overflow field when the schema declares one,
    /// otherwise in the record's layout.
    pub(crate) fn overflow(&self) -> MapperResult<Document> {
        match self.schema.overflow_property() {
            None => Ok(self.layout.side_overflow.clone()),
            Some(property) => match self.read_property(property)? {
                Value::Document(document) => Ok(document),
                _ => {
                    let document = Document::new();
                    self.write_property(property, Value::Document(document.clone()))?;
                    Ok(document)
                }
            },
        }
    }

    pub(crate) fn get(&self, key: &str) -> MapperResult<Value> {
        match self.schema.property(key) {
            Some(property) => self.read_property(property),
            None => self.overflow()?.get(key),
        }
    }

    pub(crate) fn put(&self, key: &str, value: Value) -> MapperResult<()> {
        match self.schema.property(key) {
            Some(property) => self.write_property(property, value).map_err(|e| {
                MapperError::new_with_cause(
                    &format!(
                        "Cannot set field '{}' of {}",
                        property.field_name(),
                        property.declaring_type()
                    ),
                    e.kind().clone(),
                    e,
                )
            })?,
            None => self.overflow()?.put(key, value)?,
        }
        self.layout.record_key(key);
        Ok(())
    }

    pub(crate) fn remove(&self, key: &str) -> MapperResult<Option<Value>> {
        match self.schema.property(key) {
            Some(property) => {
                let previous = self.read_property(property)?;
                self.write_property(property, Value::Null)?;
                Ok(Some(previous))
            }
            None => {
                let previous = self.overflow()?.remove(key)?;
                self.layout.forget_key(key);
                Ok(previous)
            }
        }
    }

    pub(crate) fn contains(&self, key: &str) -> MapperResult<bool> {
        if self.schema.property(key).is_some() {
            return Ok(true);
        }
        self.overflow()?.contains(key)
    }

    /// Keys in the order they were first seen. Keys that reached an
    /// overflow field without going through the view come last.
    pub(crate) fn keys(&self) -> MapperResult<Vec<String>> {
        let overflow: IndexSet<String> = self.overflow()?.keys()?.into_iter().collect();
        let mut keys: IndexSet<String> = self
            .layout
            .ordered_keys()
            .into_iter()
            .filter(|key| self.schema.property(key).is_some() || overflow.contains(key))
            .collect();
        for property in self.schema.properties() {
            if !keys.contains(property.name()) {
                keys.insert(property.name().to_string());
            }
        }
        keys.extend(overflow);
        Ok(keys.into_iter().collect())
    }

    /// Snapshot of the live view, in key order.
    pub(crate) fn entries(&self) -> MapperResult<Vec<(String, Value)>> {
        let overflow = self.overflow()?;
        self.keys()?
            .into_iter()
            .map(|key| -> MapperResult<(String, Value)> {
                let value = match self.schema.property(&key) {
                    Some(property) => self.read_property(property)?,
                    None => overflow.get(&key)?,
                };
                Ok((key, value))
            })
            .collect()
    }
}

/// The live connection between a list and the typed list it projects.
#[derive(Clone)]
pub(crate) struct ListBinding {
    cell: Arc<dyn ListCell>,
    mapper: Mapper,
}

impl ListBinding {
    pub(crate) fn new(cell: Arc<dyn ListCell>, mapper: Mapper) -> Self {
        ListBinding { cell, mapper }
    }

    pub(crate) fn cell(&self) -> &Arc<dyn ListCell> {
        &self.cell
    }

    pub(crate) fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub(crate) fn len(&self) -> usize {
        self.cell.len()
    }

    pub(crate) fn get(&self, index: usize) -> MapperResult<Value> {
        self.cell.get(&self.mapper, index)
    }

    pub(crate) fn set(&self, index: usize, value: Value) -> MapperResult<()> {
        self.cell.set(&self.mapper, index, value)
    }

    pub(crate) fn insert(&self, index: usize, value: Value) -> MapperResult<()> {
        self.cell.insert(&self.mapper, index, value)
    }

    pub(crate) fn remove(&self, index: usize) -> MapperResult<Option<Value>> {
        self.cell.remove(&self.mapper, index)
    }

    pub(crate) fn snapshot(&self) -> MapperResult<Vec<Value>> {
        self.cell.snapshot(&self.mapper)
    }
}
