use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::common::FIELD_SEPARATOR;
use crate::document::binding::{Binding, RecordCell};
use crate::document::Value;
use crate::errors::{ErrorKind, MapperError, MapperResult};

pub(crate) enum DocumentState {
    Free(IndexMap<String, Value>),
    Bound(Binding),
}

/// An ordered, string-keyed record of [`Value`]s.
///
/// A `Document` is a shared handle: cloning it yields another handle to the
/// same record, and [`Document::ptr_eq`] tells whether two handles are the
/// same instance. A document is either *free-standing*, owning its entries in
/// insertion order, or *bound*, acting as a live view over the fields of a
/// typed record (see [`Mapper::to_document`](crate::mapper::Mapper::to_document)).
/// In the bound mode every read and write goes through to the record; keys
/// the record's schema does not map are kept in an overflow document.
///
/// Free-standing documents are internally synchronized and can be shared
/// between threads. Bound documents rely on the record's own lock, one field
/// at a time.
///
/// # Examples
///
/// ```rust,ignore
/// use docmap::doc;
///
/// let user = doc! {
///     name: "Ada",
///     address: { city: "London" },
///     tags: ["math", "engines"],
/// };
/// assert_eq!(user.dot_get("address.city")?, "London".into());
/// ```
#[derive(Clone)]
pub struct Document {
    inner: Arc<RwLock<DocumentState>>,
}

#[derive(Clone)]
pub(crate) struct WeakDocument(Weak<RwLock<DocumentState>>);

impl WeakDocument {
    pub(crate) fn upgrade(&self) -> Option<Document> {
        self.0.upgrade().map(|inner| Document { inner })
    }
}

impl Document {
    /// Creates an empty free-standing document.
    pub fn new() -> Self {
        Document {
            inner: Arc::new(RwLock::new(DocumentState::Free(IndexMap::new()))),
        }
    }

    pub(crate) fn bound(binding: Binding) -> Self {
        Document {
            inner: Arc::new(RwLock::new(DocumentState::Bound(binding))),
        }
    }

    fn binding(&self) -> Option<Binding> {
        match &*self.inner.read() {
            DocumentState::Bound(binding) => Some(binding.clone()),
            DocumentState::Free(_) => None,
        }
    }

    /// Returns the value stored under `key`, or [`Value::Null`] if there is none.
    pub fn get(&self, key: &str) -> MapperResult<Value> {
        let binding = match &*self.inner.read() {
            DocumentState::Free(map) => return Ok(map.get(key).cloned().unwrap_or_default()),
            DocumentState::Bound(binding) => binding.clone(),
        };
        binding.get(key)
    }

    /// Stores `value` under `key`, keeping the key's position if it already exists.
    ///
    /// The key is taken literally; use [`Document::dot_put`] for nested paths.
    /// An empty key fails with [`ErrorKind::InvalidKey`].
    pub fn put<'a, T: Into<Value>>(&self, key: impl Into<Cow<'a, str>>, value: T) -> MapperResult<()> {
        let key = key.into();
        validate_key(&key)?;
        let value = value.into();

        let binding = match &mut *self.inner.write() {
            DocumentState::Free(map) => {
                map.insert(key.into_owned(), value);
                return Ok(());
            }
            DocumentState::Bound(binding) => binding.clone(),
        };
        binding.put(&key, value)
    }

    /// Removes `key` and returns the previous value.
    ///
    /// On a bound document a mapped key cannot disappear; its field is reset
    /// to its empty value instead.
    pub fn remove(&self, key: &str) -> MapperResult<Option<Value>> {
        let binding = match &mut *self.inner.write() {
            DocumentState::Free(map) => return Ok(map.shift_remove(key)),
            DocumentState::Bound(binding) => binding.clone(),
        };
        binding.remove(key)
    }

    pub fn contains(&self, key: &str) -> MapperResult<bool> {
        let binding = match &*self.inner.read() {
            DocumentState::Free(map) => return Ok(map.contains_key(key)),
            DocumentState::Bound(binding) => binding.clone(),
        };
        binding.contains(key)
    }

    /// Keys in order.
    pub fn keys(&self) -> MapperResult<Vec<String>> {
        let binding = match &*self.inner.read() {
            DocumentState::Free(map) => return Ok(map.keys().cloned().collect()),
            DocumentState::Bound(binding) => binding.clone(),
        };
        binding.keys()
    }

    /// Snapshot of the key/value pairs in order.
    pub fn entries(&self) -> MapperResult<Vec<(String, Value)>> {
        let binding = match &*self.inner.read() {
            DocumentState::Free(map) => {
                return Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            DocumentState::Bound(binding) => binding.clone(),
        };
        binding.entries()
    }

    pub fn size(&self) -> MapperResult<usize> {
        match &*self.inner.read() {
            DocumentState::Free(map) => Ok(map.len()),
            DocumentState::Bound(binding) => Ok(binding.keys()?.len()),
        }
    }

    pub fn is_empty(&self) -> MapperResult<bool> {
        Ok(self.size()? == 0)
    }

    /// Copies every entry of `other` into this document.
    pub fn merge(&self, other: &Document) -> MapperResult<()> {
        if self.ptr_eq(other) {
            return Ok(());
        }
        for (key, value) in other.entries()? {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Recursively copies this document into a new free-standing one.
    pub fn deep_copy(&self) -> MapperResult<Document> {
        let copy = Document::new();
        for (key, value) in self.entries()? {
            copy.put(key, value.deep_copy()?)?;
        }
        Ok(copy)
    }

    /// Reads a dotted path, descending into nested documents and lists.
    ///
    /// Returns [`Value::Null`] when an intermediate step is missing or is not
    /// a container.
    pub fn dot_get(&self, path: &str) -> MapperResult<Value> {
        match path.split_once(FIELD_SEPARATOR) {
            None => self.get(path),
            Some((head, rest)) => match self.get(head)? {
                Value::Document(document) => document.dot_get(rest),
                Value::List(list) => list.dot_get(rest),
                _ => Ok(Value::Null),
            },
        }
    }

    /// Writes a dotted path, creating an empty nested document for every
    /// intermediate step that is missing or not a container.
    pub fn dot_put<T: Into<Value>>(&self, path: &str, value: T) -> MapperResult<()> {
        match path.split_once(FIELD_SEPARATOR) {
            None => self.put(path, value),
            Some((head, rest)) => match self.get(head)? {
                Value::Document(document) => document.dot_put(rest, value),
                Value::List(list) => list.dot_put(rest, value),
                _ => {
                    self.put(head, Document::new())?;
                    // a bound parent may have turned the new document into a view
                    match self.get(head)? {
                        Value::Document(document) => document.dot_put(rest, value),
                        other => {
                            log::error!("Cannot descend into '{}' holding a {}", head, other.kind_name());
                            Err(MapperError::new(
                                &format!("Cannot descend into '{}' holding a {}", head, other.kind_name()),
                                ErrorKind::InvalidKey,
                            ))
                        }
                    }
                }
            },
        }
    }

    pub fn dot_remove(&self, path: &str) -> MapperResult<Option<Value>> {
        match path.split_once(FIELD_SEPARATOR) {
            None => self.remove(path),
            Some((head, rest)) => match self.get(head)? {
                Value::Document(document) => document.dot_remove(rest),
                Value::List(list) => list.dot_remove(rest),
                _ => Ok(None),
            },
        }
    }

    pub fn dot_contains(&self, path: &str) -> MapperResult<bool> {
        match path.split_once(FIELD_SEPARATOR) {
            None => self.contains(path),
            Some((head, rest)) => match self.get(head)? {
                Value::Document(document) => document.dot_contains(rest),
                Value::List(list) => list.dot_contains(rest),
                _ => Ok(false),
            },
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(&*self.inner.read(), DocumentState::Bound(_))
    }

    /// Severs the live connection to the bound record.
    ///
    /// The current view is copied into the document, which becomes
    /// free-standing. Does nothing on a free-standing document.
    pub fn unbind(&self) -> MapperResult<()> {
        let binding = match self.binding() {
            Some(binding) => binding,
            None => return Ok(()),
        };
        if self.detach()? {
            binding.mapper().forget_document(binding.record().address(), self);
        }
        Ok(())
    }

    /// Returns true if both handles refer to the same document instance.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakDocument {
        WeakDocument(Arc::downgrade(&self.inner))
    }

    pub(crate) fn bound_record(&self) -> Option<Arc<dyn RecordCell>> {
        self.binding().map(|binding| binding.record().clone())
    }

    /// Turns a free-standing document into a view over `binding`'s record.
    ///
    /// Mapped entries are written to the record and the rest moves to the
    /// overflow document; the binding's layout keeps the entries' order.
    /// Returns the record already bound if another caller
    /// got there first. On failure the entries are put back.
    pub(crate) fn attach(&self, binding: Binding) -> MapperResult<Option<Arc<dyn RecordCell>>> {
        let mut state = self.inner.write();
        let entries = match &mut *state {
            DocumentState::Bound(existing) => return Ok(Some(existing.record().clone())),
            DocumentState::Free(map) => std::mem::take(map),
        };

        let result = entries
            .iter()
            .try_for_each(|(key, value)| binding.put(key, value.clone()));
        match result {
            Ok(()) => {
                // mapped properties missing from the entries follow them
                binding.layout().record_properties(binding.schema());
                *state = DocumentState::Bound(binding);
                Ok(None)
            }
            Err(e) => {
                *state = DocumentState::Free(entries);
                Err(e)
            }
        }
    }

    /// Replaces the live view with a snapshot; returns false if already free.
    pub(crate) fn detach(&self) -> MapperResult<bool> {
        let mut state = self.inner.write();
        let entries = match &*state {
            DocumentState::Bound(binding) => binding.entries()?,
            DocumentState::Free(_) => return Ok(false),
        };
        *state = DocumentState::Free(entries.into_iter().collect());
        Ok(true)
    }

    pub(crate) fn write_notation(&self, out: &mut String) {
        match self.entries() {
            Ok(entries) => super::display::write_document(&entries, out),
            Err(e) => {
                out.push_str("<unreadable: ");
                out.push_str(e.message());
                out.push('>');
            }
        }
    }
}

fn validate_key(key: &str) -> MapperResult<()> {
    if key.is_empty() {
        log::error!("Document does not support empty key");
        return Err(MapperError::new(
            "Document does not support empty key",
            ErrorKind::InvalidKey,
        ));
    }
    Ok(())
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.entries(), other.entries()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.write_notation(&mut out);
        f.write_str(&out)
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_bound() {
            write!(f, "Document(bound) {}", self)
        } else {
            write!(f, "Document {}", self)
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<IndexMap<String, Value>>();
        Document {
            inner: Arc::new(RwLock::new(DocumentState::Free(map))),
        }
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys.
pub fn normalize(key: &str) -> String {
    let trimmed = key.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Builds a free-standing [`Document`].
///
/// Nested `{ .. }` become documents and `[ .. ]` become lists. Keys may be
/// identifiers or string literals (needed for operator keys like `"$gt"`).
///
/// ```rust
/// use docmap::doc;
///
/// let query = doc! { age: { "$gt": 5 }, tags: ["a", "b"] };
/// assert_eq!(query.keys().unwrap(), vec!["age", "tags"]);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::document::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let doc = $crate::document::Document::new();
            $(
                doc.put($crate::document::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect("doc! keys are never empty");
            )*
            doc
        }
    };
}

/// Helper macro converting the values of a [`doc!`] invocation.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::document::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::document::Value::List($crate::document::DocumentList::from_values(
            vec![$($crate::doc_value!($value)),*]
        ))
    };

    ($value:expr) => {
        $crate::document::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::document::DocumentList;
    use std::thread;

    fn set_up() -> Document {
        doc! {
            score: 1034,
            location: {
                state: "NY",
                city: "New York",
                address: {
                    line1: "40",
                    zip: 10001,
                },
            },
            category: ["food", "produce", "grocery"],
            obj_array: [
                { value: 1 },
                { value: 2 },
            ],
        }
    }

    #[test]
    fn test_put_and_get() {
        let doc = Document::new();
        doc.put("name", "Ada").unwrap();
        assert_eq!(doc.get("name").unwrap(), Value::String("Ada".into()));
        assert_eq!(doc.get("missing").unwrap(), Value::Null);
    }

    #[test]
    fn test_empty_key_rejected() {
        let doc = Document::new();
        let err = doc.put("", 1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidKey);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let doc = Document::new();
        doc.put("z", 1).unwrap();
        doc.put("a", 2).unwrap();
        doc.put("m", 3).unwrap();
        doc.put("z", 4).unwrap();
        assert_eq!(doc.keys().unwrap(), vec!["z", "a", "m"]);

        doc.remove("a").unwrap();
        assert_eq!(doc.keys().unwrap(), vec!["z", "m"]);
    }

    #[test]
    fn test_remove_returns_previous() {
        let doc = doc! { a: 1 };
        assert_eq!(doc.remove("a").unwrap(), Some(Value::I32(1)));
        assert_eq!(doc.remove("a").unwrap(), None);
        assert!(!doc.contains("a").unwrap());
    }

    #[test]
    fn test_contains_distinguishes_null() {
        let doc = doc! { a: (Value::Null) };
        assert!(doc.contains("a").unwrap());
        assert!(!doc.contains("b").unwrap());
    }

    #[test]
    fn test_dot_get() {
        let doc = set_up();
        assert_eq!(doc.dot_get("location.city").unwrap(), Value::from("New York"));
        assert_eq!(doc.dot_get("location.address.zip").unwrap(), Value::I32(10001));
        assert_eq!(doc.dot_get("category.1").unwrap(), Value::from("produce"));
        assert_eq!(doc.dot_get("obj_array.0.value").unwrap(), Value::I32(1));
        assert_eq!(doc.dot_get("score.value").unwrap(), Value::Null);
        assert_eq!(doc.dot_get("nothing.here").unwrap(), Value::Null);
    }

    #[test]
    fn test_dot_put_auto_vivifies() {
        let doc = Document::new();
        doc.dot_put("a.b.c", 1).unwrap();
        assert_eq!(doc.dot_get("a.b.c").unwrap(), Value::I32(1));
        assert!(doc.get("a").unwrap().is_document());
    }

    #[test]
    fn test_dot_put_replaces_scalar_intermediate() {
        let doc = doc! { a: 5 };
        doc.dot_put("a.b", true).unwrap();
        assert_eq!(doc.dot_get("a.b").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_dot_put_into_list() {
        let doc = set_up();
        doc.dot_put("category.3", "bakery").unwrap();
        let list = doc.get("category").unwrap();
        assert_eq!(list.as_list().unwrap().len().unwrap(), 4);
    }

    #[test]
    fn test_dot_remove_and_contains() {
        let doc = set_up();
        assert!(doc.dot_contains("location.address.line1").unwrap());
        assert_eq!(doc.dot_remove("location.address.line1").unwrap(), Some(Value::from("40")));
        assert!(!doc.dot_contains("location.address.line1").unwrap());
        assert!(!doc.dot_contains("score.x").unwrap());
        assert_eq!(doc.dot_remove("score.x").unwrap(), None);
    }

    #[test]
    fn test_nested_values_are_shared_handles() {
        let doc = set_up();
        let location = doc.get("location").unwrap();
        location.as_document().unwrap().put("city", "Albany").unwrap();
        assert_eq!(doc.dot_get("location.city").unwrap(), Value::from("Albany"));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let doc = set_up();
        let copy = doc.deep_copy().unwrap();
        assert_eq!(doc, copy);
        assert!(!doc.ptr_eq(&copy));

        copy.dot_put("location.city", "Albany").unwrap();
        assert_eq!(doc.dot_get("location.city").unwrap(), Value::from("New York"));
    }

    #[test]
    fn test_equality_is_ordered() {
        let a = doc! { x: 1, y: 2 };
        let b = doc! { x: 1, y: 2 };
        let c = doc! { y: 2, x: 1 };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_merge() {
        let a = doc! { x: 1 };
        let b = doc! { y: 2, x: 3 };
        a.merge(&b).unwrap();
        assert_eq!(a, doc! { x: 3, y: 2 });
    }

    #[test]
    fn test_from_iterator() {
        let doc: Document = vec![("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(doc.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_display() {
        let doc = doc! { a: 1, b: "x", c: [true, (Value::Null)], d: {} };
        assert_eq!(doc.to_string(), r#"{"a": 1, "b": "x", "c": [true, null], "d": {}}"#);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("\"$gt\""), "$gt");
        assert_eq!(normalize("name"), "name");
    }

    #[test]
    fn test_unbind_free_document_is_noop() {
        let doc = doc! { a: 1 };
        doc.unbind().unwrap();
        assert!(!doc.is_bound());
        assert_eq!(doc, doc! { a: 1 });
    }

    #[test]
    fn test_concurrent_puts() {
        let doc = Document::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let doc = doc.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        doc.put(format!("k{}_{}", t, i), i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(doc.size().unwrap(), 800);
    }

    #[test]
    fn test_list_value_in_document() {
        let doc = Document::new();
        doc.put("items", DocumentList::from_values(vec![Value::I32(1)])).unwrap();
        assert_eq!(doc.dot_get("items.0").unwrap(), Value::I32(1));
    }
}
