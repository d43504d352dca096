use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::common::FIELD_SEPARATOR;
use crate::document::binding::{out_of_range, ListBinding, ListCell};
use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};

pub(crate) enum ListState {
    Free(Vec<Value>),
    Bound(ListBinding),
}

/// A document whose keys are the decimal indices `"0"`, `"1"`, ...
///
/// Besides keyed access it supports positional `push`, `insert` and
/// `remove_at`. Like [`Document`] it is a shared handle and is either
/// free-standing or bound to a typed list, in which case every access goes
/// through to the list's elements.
///
/// Keyed writes past the end pad the gap with nulls; a key that is not a
/// number reads as null and fails on write.
#[derive(Clone)]
pub struct DocumentList {
    inner: Arc<RwLock<ListState>>,
}

#[derive(Clone)]
pub(crate) struct WeakDocumentList(Weak<RwLock<ListState>>);

impl WeakDocumentList {
    pub(crate) fn upgrade(&self) -> Option<DocumentList> {
        self.0.upgrade().map(|inner| DocumentList { inner })
    }
}

fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<usize>().ok()
}

fn numeric_key(key: &str) -> MapperResult<usize> {
    parse_index(key).ok_or_else(|| {
        log::error!("A list can only use numeric keys, got '{}'", key);
        MapperError::new(
            &format!("A list can only use numeric keys, got '{}'", key),
            ErrorKind::InvalidKey,
        )
    })
}

impl DocumentList {
    pub fn new() -> Self {
        DocumentList::from_values(Vec::new())
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        DocumentList {
            inner: Arc::new(RwLock::new(ListState::Free(values))),
        }
    }

    pub(crate) fn bound(binding: ListBinding) -> Self {
        DocumentList {
            inner: Arc::new(RwLock::new(ListState::Bound(binding))),
        }
    }

    fn binding(&self) -> Option<ListBinding> {
        match &*self.inner.read() {
            ListState::Bound(binding) => Some(binding.clone()),
            ListState::Free(_) => None,
        }
    }

    pub fn len(&self) -> MapperResult<usize> {
        match &*self.inner.read() {
            ListState::Free(values) => Ok(values.len()),
            ListState::Bound(binding) => Ok(binding.len()),
        }
    }

    pub fn is_empty(&self) -> MapperResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Element at `index`, or [`Value::Null`] past the end.
    pub fn get_at(&self, index: usize) -> MapperResult<Value> {
        let binding = match &*self.inner.read() {
            ListState::Free(values) => return Ok(values.get(index).cloned().unwrap_or_default()),
            ListState::Bound(binding) => binding.clone(),
        };
        binding.get(index)
    }

    /// Replaces the element at `index`, padding with nulls past the end.
    pub fn set_at<T: Into<Value>>(&self, index: usize, value: T) -> MapperResult<()> {
        let value = value.into();
        let binding = match &mut *self.inner.write() {
            ListState::Free(values) => {
                if index < values.len() {
                    values[index] = value;
                } else {
                    values.resize(index, Value::Null);
                    values.push(value);
                }
                return Ok(());
            }
            ListState::Bound(binding) => binding.clone(),
        };
        binding.set(index, value)
    }

    pub fn push<T: Into<Value>>(&self, value: T) -> MapperResult<()> {
        let value = value.into();
        let binding = match &mut *self.inner.write() {
            ListState::Free(values) => {
                values.push(value);
                return Ok(());
            }
            ListState::Bound(binding) => binding.clone(),
        };
        let len = binding.len();
        binding.insert(len, value)
    }

    /// Inserts at `index`, shifting later elements; `index` may equal the length.
    pub fn insert<T: Into<Value>>(&self, index: usize, value: T) -> MapperResult<()> {
        let value = value.into();
        let binding = match &mut *self.inner.write() {
            ListState::Free(values) => {
                if index > values.len() {
                    return Err(out_of_range(index, values.len()));
                }
                values.insert(index, value);
                return Ok(());
            }
            ListState::Bound(binding) => binding.clone(),
        };
        binding.insert(index, value)
    }

    /// Removes the element at `index`, shifting later elements.
    pub fn remove_at(&self, index: usize) -> MapperResult<Option<Value>> {
        let binding = match &mut *self.inner.write() {
            ListState::Free(values) => {
                if index >= values.len() {
                    return Ok(None);
                }
                return Ok(Some(values.remove(index)));
            }
            ListState::Bound(binding) => binding.clone(),
        };
        binding.remove(index)
    }

    /// Snapshot of the elements in order.
    pub fn values(&self) -> MapperResult<Vec<Value>> {
        let binding = match &*self.inner.read() {
            ListState::Free(values) => return Ok(values.clone()),
            ListState::Bound(binding) => binding.clone(),
        };
        binding.snapshot()
    }

    pub fn get(&self, key: &str) -> MapperResult<Value> {
        match parse_index(key) {
            Some(index) => self.get_at(index),
            None => Ok(Value::Null),
        }
    }

    pub fn put<T: Into<Value>>(&self, key: &str, value: T) -> MapperResult<()> {
        let index = numeric_key(key)?;
        self.set_at(index, value)
    }

    pub fn remove(&self, key: &str) -> MapperResult<Option<Value>> {
        match parse_index(key) {
            Some(index) => self.remove_at(index),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> MapperResult<bool> {
        match parse_index(key) {
            Some(index) => Ok(index < self.len()?),
            None => Ok(false),
        }
    }

    /// `"0"` to `"len - 1"`.
    pub fn keys(&self) -> MapperResult<Vec<String>> {
        Ok((0..self.len()?).map(|i| i.to_string()).collect())
    }

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

    pub fn dot_put<T: Into<Value>>(&self, path: &str, value: T) -> MapperResult<()> {
        match path.split_once(FIELD_SEPARATOR) {
            None => self.put(path, value),
            Some((head, rest)) => match self.get(head)? {
                Value::Document(document) => document.dot_put(rest, value),
                Value::List(list) => list.dot_put(rest, value),
                _ => {
                    self.put(head, Document::new())?;
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

    pub fn deep_copy(&self) -> MapperResult<DocumentList> {
        let values = self
            .values()?
            .iter()
            .map(Value::deep_copy)
            .collect::<MapperResult<Vec<Value>>>()?;
        Ok(DocumentList::from_values(values))
    }

    pub fn is_bound(&self) -> bool {
        matches!(&*self.inner.read(), ListState::Bound(_))
    }

    /// Copies the current elements into the list and severs the live connection.
    pub fn unbind(&self) -> MapperResult<()> {
        let binding = match self.binding() {
            Some(binding) => binding,
            None => return Ok(()),
        };
        if self.detach()? {
            binding.mapper().forget_list(binding.cell().address(), self);
        }
        Ok(())
    }

    pub fn ptr_eq(&self, other: &DocumentList) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakDocumentList {
        WeakDocumentList(Arc::downgrade(&self.inner))
    }

    pub(crate) fn bound_cell(&self) -> Option<Arc<dyn ListCell>> {
        self.binding().map(|binding| binding.cell().clone())
    }

    /// Hands the elements to `bind`, which builds the typed list, and switches
    /// to the bound mode. Returns the cell already bound if another caller got
    /// there first.
    pub(crate) fn attach_with(
        &self,
        bind: impl FnOnce(&[Value]) -> MapperResult<ListBinding>,
    ) -> MapperResult<Option<Arc<dyn ListCell>>> {
        let mut state = self.inner.write();
        let binding = match &*state {
            ListState::Bound(existing) => return Ok(Some(existing.cell().clone())),
            ListState::Free(values) => bind(values)?,
        };
        *state = ListState::Bound(binding);
        Ok(None)
    }

    pub(crate) fn detach(&self) -> MapperResult<bool> {
        let mut state = self.inner.write();
        let values = match &*state {
            ListState::Bound(binding) => binding.snapshot()?,
            ListState::Free(_) => return Ok(false),
        };
        *state = ListState::Free(values);
        Ok(true)
    }

    pub(crate) fn write_notation(&self, out: &mut String) {
        match self.values() {
            Ok(values) => super::display::write_list(&values, out),
            Err(e) => {
                out.push_str("<unreadable: ");
                out.push_str(e.message());
                out.push('>');
            }
        }
    }
}

impl Default for DocumentList {
    fn default() -> Self {
        DocumentList::new()
    }
}

impl PartialEq for DocumentList {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.values(), other.values()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for DocumentList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.write_notation(&mut out);
        f.write_str(&out)
    }
}

impl Debug for DocumentList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_bound() {
            write!(f, "DocumentList(bound) {}", self)
        } else {
            write!(f, "DocumentList {}", self)
        }
    }
}

impl<V: Into<Value>> FromIterator<V> for DocumentList {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        DocumentList::from_values(iter.into_iter().map(Into::into).collect())
    }
}
