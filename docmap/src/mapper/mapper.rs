use std::any::{type_name, TypeId};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::common::{Shared, SharedList, DEFAULT_PURGE_INTERVAL};
use crate::convert::{ConverterRegistry, FieldType};
use crate::document::binding::{Binding, ListBinding, ListCell, RecordCell, RecordLayout};
use crate::document::{Document, DocumentList, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::mapper::identity::{IdentityCache, LiveView, View};
use crate::mapper::MapperBuilder;
use crate::schema::{Entity, Schema, SchemaBuilder};

static DEFAULT_CONVERTERS: Lazy<ConverterRegistry> = Lazy::new(ConverterRegistry::with_defaults);

/// The mapping context.
///
/// A `Mapper` owns the converter registry, the schema cache and the
/// identity cache. It is a cheap handle: clones share the same context.
/// Independent mappers never see each other's schemas or bindings.
///
/// # Identity
///
/// Converting the same live record twice yields the same [`Document`]
/// instance, and decoding a document that is already bound yields the
/// record it is bound to:
///
/// ```rust,ignore
/// let mapper = Mapper::new();
/// let user = Shared::new(User::default());
///
/// let first = mapper.to_document(&user)?;
/// let second = mapper.to_document(&user)?;
/// assert!(first.ptr_eq(&second));
///
/// first.put("email", "ada@example.com")?;
/// assert_eq!(user.read().email, "ada@example.com");
/// ```
#[derive(Clone)]
pub struct Mapper {
    inner: Arc<MapperInner>,
}

struct MapperInner {
    converters: ConverterRegistry,
    schemas: DashMap<TypeId, Arc<Schema>>,
    identity: IdentityCache,
}

impl Mapper {
    /// Creates a mapper with the standard converters.
    pub fn new() -> Self {
        Mapper::with_config(DEFAULT_CONVERTERS.clone(), DEFAULT_PURGE_INTERVAL)
    }

    pub fn builder() -> MapperBuilder {
        MapperBuilder::new()
    }

    pub(crate) fn with_config(converters: ConverterRegistry, purge_interval: usize) -> Self {
        Mapper {
            inner: Arc::new(MapperInner {
                converters,
                schemas: DashMap::new(),
                identity: IdentityCache::new(purge_interval),
            }),
        }
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.inner.converters
    }

    /// Returns the schema of `T`, deriving and caching it on first use.
    ///
    /// Derivation runs outside the cache lock. When two threads derive the
    /// same schema concurrently the first insert wins and both get it.
    ///
    /// # Errors
    /// `SchemaError` or `MissingElementType` when `T`'s declaration cannot
    /// be mapped.
    pub fn schema<T: Entity>(&self) -> MapperResult<Arc<Schema>> {
        let type_id = TypeId::of::<T>();
        if let Some(schema) = self.inner.schemas.get(&type_id) {
            return Ok(schema.value().clone());
        }

        let mut builder = SchemaBuilder::<T>::new();
        T::describe(&mut builder);
        let schema = Arc::new(builder.build(self)?);
        let schema = self
            .inner
            .schemas
            .entry(type_id)
            .or_insert(schema)
            .value()
            .clone();
        Ok(schema)
    }

    /// Returns true if the schema of `T` has been derived.
    pub fn has_schema<T: Entity>(&self) -> bool {
        self.inner.schemas.contains_key(&TypeId::of::<T>())
    }

    /// Returns the live document view of a record.
    ///
    /// The first call binds a new document to the record; later calls
    /// return that same document for as long as it is alive. Writes to the
    /// document go straight to the record's fields. Once that document is
    /// dropped, the next call builds a new view with the same unmapped keys
    /// and key order.
    pub fn to_document<T: Entity>(&self, record: &Shared<T>) -> MapperResult<Document> {
        let schema = self.schema::<T>()?;
        let address = record.address();

        let mut entries = self.inner.identity.lock();
        if let Some(document) = entries.document(address) {
            return Ok(document);
        }
        let layout = entries
            .layout(address)
            .unwrap_or_else(|| RecordLayout::for_schema(&schema));
        let document = Document::bound(Binding::new(
            schema,
            Arc::new(record.clone()),
            self.clone(),
            layout.clone(),
        ));
        entries.insert(
            address,
            &record.as_any(),
            View::Document(document.downgrade()),
            Some(layout),
        );
        Ok(document)
    }

    /// Returns the record a document is bound to, binding it first if the
    /// document is free-standing.
    ///
    /// A free-standing document is bound in place to a new `T::default()`:
    /// its mapped entries move into the record's fields, and the remaining
    /// ones into the overflow document.
    ///
    /// # Errors
    /// * `TypeConflict` - the document is bound to a record of another type
    /// * conversion errors of the entries; the document stays free-standing
    pub fn to_entity<T: Entity>(&self, document: &Document) -> MapperResult<Shared<T>> {
        if let Some(record) = document.bound_record() {
            return bound_record::<T>(&record);
        }

        let schema = self.schema::<T>()?;
        let record = Shared::new(T::default());
        let layout = RecordLayout::new();
        let binding = Binding::new(schema, Arc::new(record.clone()), self.clone(), layout.clone());
        if let Some(existing) = document.attach(binding)? {
            return bound_record::<T>(&existing);
        }

        self.inner.identity.lock().insert(
            record.address(),
            &record.as_any(),
            View::Document(document.downgrade()),
            Some(layout),
        );
        Ok(record)
    }

    /// Returns the live list view of a typed list.
    ///
    /// As with [`Mapper::to_document`], repeated calls return the same
    /// instance, and writes through it land in the typed list.
    pub fn list_to_document<E: FieldType>(&self, list: &SharedList<E>) -> MapperResult<DocumentList> {
        let address = list.address();
        let mut entries = self.inner.identity.lock();
        if let Some(view) = entries.list(address) {
            return Ok(view);
        }
        let view = DocumentList::bound(ListBinding::new(Arc::new(list.clone()), self.clone()));
        entries.insert(address, &list.as_any(), View::List(view.downgrade()), None);
        Ok(view)
    }

    /// Returns the typed list a document list is bound to, decoding its
    /// elements into a new list first if it is free-standing.
    ///
    /// # Errors
    /// `TypeConflict` when the list is bound to elements of another type.
    pub fn to_list<E: FieldType>(&self, list: &DocumentList) -> MapperResult<SharedList<E>> {
        if let Some(cell) = list.bound_cell() {
            return bound_list::<E>(&cell);
        }

        let mut created = None;
        let existing = list.attach_with(|values| {
            let items = values
                .iter()
                .map(|value| E::from_value(self, value.clone()))
                .collect::<MapperResult<Vec<E>>>()?;
            let typed = SharedList::new(items);
            created = Some(typed.clone());
            Ok(ListBinding::new(Arc::new(typed), self.clone()))
        })?;
        if let Some(cell) = existing {
            return bound_list::<E>(&cell);
        }

        let typed = created.ok_or_else(|| {
            log::error!("List binding completed without a typed list");
            MapperError::new("List binding completed without a typed list", ErrorKind::InternalError)
        })?;
        self.inner.identity.lock().insert(
            typed.address(),
            &typed.as_any(),
            View::List(list.downgrade()),
            None,
        );
        Ok(typed)
    }

    /// Encodes any field value.
    pub fn to_doc_value<F: FieldType>(&self, value: &F) -> MapperResult<Value> {
        value.to_value(self)
    }

    /// Decodes any field value.
    pub fn from_doc_value<F: FieldType>(&self, value: Value) -> MapperResult<F> {
        F::from_value(self, value)
    }

    /// Binds a free-standing document to an existing record.
    ///
    /// The document's entries are written into the record and the document
    /// becomes its live view.
    ///
    /// # Errors
    /// `AlreadyBound` if the document is already bound, or the record
    /// already has a live document.
    pub fn bind<T: Entity>(&self, document: &Document, record: &Shared<T>) -> MapperResult<()> {
        let schema = self.schema::<T>()?;
        let address = record.address();
        if document.is_bound() || self.inner.identity.lock().document(address).is_some() {
            return Err(already_bound::<T>());
        }

        let layout = RecordLayout::new();
        let binding = Binding::new(schema, Arc::new(record.clone()), self.clone(), layout.clone());
        if document.attach(binding)?.is_some() {
            return Err(already_bound::<T>());
        }

        let mut entries = self.inner.identity.lock();
        if entries.document(address).is_some() {
            // another view was bound to the record while attaching
            drop(entries);
            document.detach()?;
            return Err(already_bound::<T>());
        }
        entries.insert(
            address,
            &record.as_any(),
            View::Document(document.downgrade()),
            Some(layout),
        );
        Ok(())
    }

    /// Tears down the binding of one record. Its document keeps a snapshot
    /// of the last view and becomes free-standing.
    ///
    /// Returns false if the record had no live document.
    pub fn release<T: Entity>(&self, record: &Shared<T>) -> MapperResult<bool> {
        let view = self.inner.identity.lock().take(record.address());
        match view {
            Some(view) => {
                detach(view)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tears down every binding of this mapper.
    pub fn unmap_all(&self) -> MapperResult<()> {
        let views = self.inner.identity.lock().drain();
        log::debug!("Unmapping {} live bindings", views.len());
        views.into_iter().try_for_each(detach)
    }

    /// Drops identity-cache bindings whose record or view is gone. Returns
    /// the number of bindings removed.
    pub fn purge(&self) -> usize {
        let removed = self.inner.identity.lock().purge();
        if removed > 0 {
            log::warn!("Purged {} dead bindings from the identity cache", removed);
        }
        removed
    }

    /// The number of live bindings.
    pub fn binding_count(&self) -> usize {
        self.inner.identity.lock().live_count()
    }

    pub fn purge_interval(&self) -> usize {
        self.inner.identity.purge_interval()
    }

    /// Returns true if both handles share the same context.
    pub fn ptr_eq(&self, other: &Mapper) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn forget_document(&self, address: usize, document: &Document) {
        self.inner.identity.lock().forget_document(address, document);
    }

    pub(crate) fn forget_list(&self, address: usize, list: &DocumentList) {
        self.inner.identity.lock().forget_list(address, list);
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Mapper::new()
    }
}

impl Debug for Mapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("schemas", &self.inner.schemas.len())
            .field("purge_interval", &self.purge_interval())
            .finish()
    }
}

fn detach(view: LiveView) -> MapperResult<()> {
    match view {
        LiveView::Document(document) => document.detach().map(|_| ()),
        LiveView::List(list) => list.detach().map(|_| ()),
    }
}

fn bound_record<T: Entity>(record: &Arc<dyn RecordCell>) -> MapperResult<Shared<T>> {
    if record.record_type() == TypeId::of::<T>() {
        if let Some(shared) = Shared::<T>::from_any(record.as_any()) {
            return Ok(shared);
        }
    }
    log::error!(
        "Document is bound to a {}, cannot map it to a {}",
        record.record_type_name(),
        type_name::<T>()
    );
    Err(MapperError::new(
        &format!(
            "Document is bound to a {}, cannot map it to a {}",
            record.record_type_name(),
            type_name::<T>()
        ),
        ErrorKind::TypeConflict,
    ))
}

fn bound_list<E: FieldType>(cell: &Arc<dyn ListCell>) -> MapperResult<SharedList<E>> {
    match SharedList::<E>::from_any(cell.as_any()) {
        Some(list) => Ok(list),
        None => {
            log::error!(
                "List is bound to elements of type {}, cannot map it to {}",
                cell.element_type_name(),
                type_name::<E>()
            );
            Err(MapperError::new(
                &format!(
                    "List is bound to elements of type {}, cannot map it to {}",
                    cell.element_type_name(),
                    type_name::<E>()
                ),
                ErrorKind::TypeConflict,
            ))
        }
    }
}

fn already_bound<T>() -> MapperError {
    log::error!("Cannot bind a {}: document or record is already bound", type_name::<T>());
    MapperError::new(
        &format!("Cannot bind a {}: document or record is already bound", type_name::<T>()),
        ErrorKind::AlreadyBound,
    )
}
