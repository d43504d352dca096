use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// A lazy sequence of documents produced by a store query.
pub type DocumentCursor = Box<dyn Iterator<Item = MapperResult<Document>> + Send>;

/// The seam between the mapper and a document database driver.
///
/// # Purpose
/// Everything the typed [`Collection`](crate::store::Collection) needs from
/// a store, expressed over plain documents. Queries, updates, index keys and
/// commands are the documents the [`query`](crate::query) and
/// [`index`](crate::index) builders produce.
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; a collection shares its store.
///
/// # Implementations
/// - [`InMemoryStore`](crate::store::InMemoryStore): a process-local store
///   for tests and examples.
pub trait DocumentStore: Send + Sync {
    /// Returns the first document of `collection` matching `query`.
    fn find_one(&self, collection: &str, query: &Document) -> MapperResult<Option<Document>>;

    /// Returns every document of `collection` matching `query`.
    fn find(&self, collection: &str, query: &Document) -> MapperResult<DocumentCursor>;

    /// Inserts `document`, or replaces the stored document with the same
    /// `_id`.
    ///
    /// # Returns
    /// The outcome; `upserted_id` carries the id the store assigned when the
    /// document had none.
    fn insert_or_replace(&self, collection: &str, document: &Document) -> MapperResult<WriteOutcome>;

    /// Applies an update document to every match of `query`, inserting a
    /// new document when nothing matches and `upsert` is set.
    fn update(
        &self,
        collection: &str,
        query: &Document,
        update: &Document,
        upsert: bool,
    ) -> MapperResult<WriteOutcome>;

    /// Removes every document of `collection` matching `query`.
    fn remove(&self, collection: &str, query: &Document) -> MapperResult<WriteOutcome>;

    /// Runs a database command such as `{count: .., query: ..}` or
    /// `{aggregate: .., pipeline: [..]}` and returns its response.
    fn run_command(&self, command: &Document) -> MapperResult<Document>;

    /// Creates the index described by `keys` and `options` unless it exists.
    fn ensure_index(&self, collection: &str, keys: &Document, options: &Document) -> MapperResult<()>;
}

/// The result a store reports for a write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    pub matched_count: u64,
    pub upserted_id: Option<Value>,
    pub error: Option<String>,
}

impl WriteOutcome {
    pub fn matched(matched_count: u64) -> Self {
        WriteOutcome {
            matched_count,
            ..WriteOutcome::default()
        }
    }

    pub fn upserted(id: Value) -> Self {
        WriteOutcome {
            matched_count: 0,
            upserted_id: Some(id),
            error: None,
        }
    }

    pub fn failed(error: &str) -> Self {
        WriteOutcome {
            error: Some(error.to_string()),
            ..WriteOutcome::default()
        }
    }

    /// Turns a store-reported error into a `StoreError`.
    pub fn into_result(self) -> MapperResult<WriteOutcome> {
        match &self.error {
            Some(error) => {
                log::error!("Store reported a write error: {}", error);
                Err(MapperError::new(error, ErrorKind::StoreError))
            }
            None => Ok(self),
        }
    }
}
