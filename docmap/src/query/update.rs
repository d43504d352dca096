use std::fmt::{Display, Formatter};

use crate::common::{ADD_TO_SET, EACH, POP, PULL, PUSH, RENAME, SET, SET_ON_INSERT, UNSET};
use crate::document::{Document, DocumentList, Value};
use crate::errors::{MapperError, MapperResult};

/// Builds an update document.
///
/// Every operation lands in the sub-document of its operator, e.g.
/// `set("a", 1)` gives `{$set: {a: 1}}`. Pushing a second value to the
/// same field with `push`, `pull` or `add_to_set` switches it to the
/// batched form `{$each: [v1, v2]}`.
///
/// As with [`Query`](crate::query::Query), the first error is kept and
/// returned by [`Update::to_document`].
///
/// # Usage
///
/// ```rust
/// use docmap::doc;
/// use docmap::query::Update;
///
/// let update = Update::new().push("tags", "a").push("tags", "b");
/// assert_eq!(
///     update.to_document().unwrap(),
///     doc! { "$push": { tags: { "$each": ["a", "b"] } } }
/// );
/// ```
#[derive(Debug, Default)]
pub struct Update {
    update: Document,
    error: Option<MapperError>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    /// Puts a raw top-level entry.
    pub fn put<V: Into<Value>>(self, name: &str, value: V) -> Self {
        let result = self.update.put(name, value);
        self.record(result)
    }

    /// Puts `field: value` into the sub-document of `operator`.
    pub fn put_in<V: Into<Value>>(self, operator: &str, field: &str, value: V) -> Self {
        let result = self.insert(operator, field, value.into());
        self.record(result)
    }

    pub fn set<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.put_in(SET, field, value)
    }

    /// Sets a field only when an upsert inserts the document.
    pub fn set_on_insert<V: Into<Value>>(self, field: &str, value: V) -> Self {
        self.put_in(SET_ON_INSERT, field, value)
    }

    pub fn unset<S: AsRef<str>>(self, fields: &[S]) -> Self {
        fields
            .iter()
            .fold(self, |update, field| update.put_in(UNSET, field.as_ref(), 1))
    }

    pub fn push<V: Into<Value>>(self, field: &str, value: V) -> Self {
        let result = self.each(PUSH, field, value.into());
        self.record(result)
    }

    pub fn push_all<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values.into_iter().fold(self, |update, v| update.push(field, v))
    }

    pub fn pull<V: Into<Value>>(self, field: &str, value: V) -> Self {
        let result = self.each(PULL, field, value.into());
        self.record(result)
    }

    pub fn pull_all<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values.into_iter().fold(self, |update, v| update.pull(field, v))
    }

    pub fn add_to_set<V: Into<Value>>(self, field: &str, value: V) -> Self {
        let result = self.each(ADD_TO_SET, field, value.into());
        self.record(result)
    }

    pub fn add_all_to_set<I, V>(self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values
            .into_iter()
            .fold(self, |update, v| update.add_to_set(field, v))
    }

    /// Removes the last element of a list.
    pub fn pop(self, field: &str) -> Self {
        self.put_in(POP, field, 1)
    }

    /// Removes the first element of a list.
    pub fn pop_first(self, field: &str) -> Self {
        self.put_in(POP, field, -1)
    }

    pub fn rename(self, old_name: &str, new_name: &str) -> Self {
        self.put_in(RENAME, old_name, new_name)
    }

    /// A copy of the update document.
    ///
    /// # Errors
    /// The first error recorded while building.
    pub fn to_document(&self) -> MapperResult<Document> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.update.deep_copy()
    }

    fn record(mut self, result: MapperResult<()>) -> Self {
        if let Err(e) = result {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
        self
    }

    fn operator_document(&self, operator: &str) -> MapperResult<Document> {
        match self.update.get(operator)? {
            Value::Document(document) => Ok(document),
            _ => {
                let document = Document::new();
                self.update.put(operator, document.clone())?;
                Ok(document)
            }
        }
    }

    fn insert(&self, operator: &str, field: &str, value: Value) -> MapperResult<()> {
        self.operator_document(operator)?.put(field, value)
    }

    fn each(&self, operator: &str, field: &str, value: Value) -> MapperResult<()> {
        let fields = self.operator_document(operator)?;
        if !fields.contains(field)? {
            return fields.put(field, value);
        }

        if let Value::Document(batch) = fields.get(field)? {
            if let Value::List(values) = batch.get(EACH)? {
                return values.push(value);
            }
        }
        let first = fields.get(field)?;
        let batch = Document::new();
        batch.put(EACH, DocumentList::from_values(vec![first, value]))?;
        fields.put(field, batch)
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.update, f)
    }
}
