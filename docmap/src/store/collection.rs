use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::common::{Shared, DOC_ID};
use crate::doc;
use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};
use crate::mapper::Mapper;
use crate::query::{Pipeline, Query, Update};
use crate::schema::{Entity, EntityKind, Schema};
use crate::store::{DocumentCursor, DocumentStore, WriteOutcome};

/// A typed collection of entities of type `T` over a [`DocumentStore`].
///
/// Documents read from the store are bound to new records through the
/// collection's [`Mapper`], so a loaded record's live document is the one
/// the store returned. Saving writes the record's live document back.
///
/// # Usage
///
/// ```rust,ignore
/// let posts = Collection::<Post>::new(&mapper, store)?;
/// let post = Shared::new(Post { title: "Hello".into(), ..Post::default() });
/// posts.save(&post)?;
///
/// let found = posts.find_one(&Query::new().equal("title", "Hello"))?;
/// ```
pub struct Collection<T: Entity> {
    mapper: Mapper,
    store: Arc<dyn DocumentStore>,
    schema: Arc<Schema>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Collection<T> {
    /// Opens the collection of `T`, ensuring every index of its schema.
    ///
    /// # Errors
    /// * `SchemaError` - `T` is an embedded type or its schema is invalid
    /// * errors reported by the store while creating indexes
    pub fn new(mapper: &Mapper, store: Arc<dyn DocumentStore>) -> MapperResult<Self> {
        let schema = mapper.schema::<T>()?;
        if schema.kind() == EntityKind::Embedded {
            log::error!("{} is embedded and has no collection", schema.type_name());
            return Err(MapperError::new(
                &format!("{} is embedded and has no collection", schema.type_name()),
                ErrorKind::SchemaError,
            ));
        }

        for index in schema.indexes() {
            log::debug!("Ensuring index {} on {}", index.name(), schema.storage_name());
            store.ensure_index(
                schema.storage_name(),
                &index.keys_document(),
                &index.options_document(),
            )?;
        }

        Ok(Collection {
            mapper: mapper.clone(),
            store,
            schema,
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        self.schema.storage_name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Loads the entity with the given `_id`.
    pub fn load<V: Into<Value>>(&self, id: V) -> MapperResult<Option<Shared<T>>> {
        let id: Value = id.into();
        let query = doc! { _id: id };
        let document = self.store.find_one(self.name(), &query)?;
        self.map_load(document)
    }

    pub fn find_one(&self, query: &Query) -> MapperResult<Option<Shared<T>>> {
        let document = self.store.find_one(self.name(), &query.to_document()?)?;
        self.map_load(document)
    }

    /// Returns a lazy cursor over every match of `query`.
    pub fn find(&self, query: &Query) -> MapperResult<Cursor<T>> {
        let documents = self.store.find(self.name(), &query.to_document()?)?;
        Ok(Cursor {
            mapper: self.mapper.clone(),
            documents,
            _marker: PhantomData,
        })
    }

    /// Inserts or replaces the record. When the store assigns an `_id`, it
    /// is written back through the live document.
    pub fn save(&self, record: &Shared<T>) -> MapperResult<()> {
        let document = self.mapper.to_document(record)?;
        let outcome = self
            .store
            .insert_or_replace(self.name(), &document)?
            .into_result()?;
        if let Some(id) = outcome.upserted_id {
            document.put(DOC_ID, id)?;
        }
        Ok(())
    }

    /// Removes the stored document of `record`, matched by `_id`.
    ///
    /// # Errors
    /// `ValidationError` if the record has no `_id` yet.
    pub fn remove(&self, record: &Shared<T>) -> MapperResult<u64> {
        let id = self.mapper.to_document(record)?.get(DOC_ID)?;
        if id.is_null() {
            log::error!("Cannot remove a {} that has no _id", self.schema.type_name());
            return Err(MapperError::new(
                &format!("Cannot remove a {} that has no _id", self.schema.type_name()),
                ErrorKind::ValidationError,
            ));
        }
        self.remove_by_id(id)
    }

    pub fn remove_by_id<V: Into<Value>>(&self, id: V) -> MapperResult<u64> {
        let id: Value = id.into();
        let query = doc! { _id: id };
        let outcome = self.store.remove(self.name(), &query)?.into_result()?;
        Ok(outcome.matched_count)
    }

    pub fn update(&self, query: &Query, update: &Update, upsert: bool) -> MapperResult<WriteOutcome> {
        self.store
            .update(self.name(), &query.to_document()?, &update.to_document()?, upsert)?
            .into_result()
    }

    /// Counts the matches of `query` with a `count` command.
    pub fn count(&self, query: &Query) -> MapperResult<u64> {
        let command = doc! {
            count: (self.name()),
            query: (query.to_document()?),
        };
        let response = self.store.run_command(&command)?;
        self.mapper.from_doc_value::<u64>(response.get("n")?)
    }

    /// Runs an aggregation pipeline with an `aggregate` command and returns
    /// the documents of the response's `result` list.
    pub fn aggregate(&self, pipeline: &Pipeline) -> MapperResult<Vec<Document>> {
        let command = doc! {
            aggregate: (self.name()),
            pipeline: (pipeline.to_list()),
        };
        let response = self.store.run_command(&command)?;
        match response.get("result")? {
            Value::List(result) => result
                .values()?
                .into_iter()
                .map(|value| match value {
                    Value::Document(document) => Ok(document),
                    other => Err(unexpected_response(&other)),
                })
                .collect(),
            other => Err(unexpected_response(&other)),
        }
    }

    fn map_load(&self, document: Option<Document>) -> MapperResult<Option<Shared<T>>> {
        document
            .map(|document| self.mapper.to_entity::<T>(&document))
            .transpose()
    }
}

fn unexpected_response(value: &Value) -> MapperError {
    log::error!("Unexpected aggregate response value {}", value);
    MapperError::new(
        &format!("Unexpected aggregate response value {}", value),
        ErrorKind::StoreError,
    )
}

impl<T: Entity> Debug for Collection<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .field("type", &self.schema.type_name())
            .finish()
    }
}

/// Iterates the records matching a [`Collection::find`] query.
pub struct Cursor<T: Entity> {
    mapper: Mapper,
    documents: DocumentCursor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Iterator for Cursor<T> {
    type Item = MapperResult<Shared<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let document = self.documents.next()?;
        Some(document.and_then(|document| self.mapper.to_entity::<T>(&document)))
    }
}
