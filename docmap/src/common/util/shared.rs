use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub type Atomic<T> = Arc<RwLock<T>>;

#[inline]
pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

/// A shared, lockable cell holding a typed record.
///
/// Records that take part in live document binding live in a `Shared` cell.
/// Cloning the cell aliases the same record; the allocation address is the
/// record's identity for the mapper's identity cache.
pub struct Shared<T>(Atomic<T>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Shared(atomic(value))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Returns true if both cells hold the same record.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T: Send + Sync + 'static> Shared<T> {
    pub(crate) fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.0.clone()
    }

    pub(crate) fn from_any(any: Arc<dyn Any + Send + Sync>) -> Option<Shared<T>> {
        any.downcast::<RwLock<T>>().ok().map(Shared)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(self.0.clone())
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Shared::new(T::default())
    }
}

impl<T: Debug> Debug for Shared<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shared({:?})", &*self.0.read())
    }
}

/// A shared, lockable list of elements.
///
/// The list counterpart of [`Shared`]; a bound `DocumentList` reads and
/// writes the elements in place.
pub struct SharedList<E>(Atomic<Vec<E>>);

impl<E> SharedList<E> {
    pub fn new(items: Vec<E>) -> Self {
        SharedList(atomic(items))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<E>> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<E>> {
        self.0.write()
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn ptr_eq(&self, other: &SharedList<E>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<E: Send + Sync + 'static> SharedList<E> {
    pub(crate) fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.0.clone()
    }

    pub(crate) fn from_any(any: Arc<dyn Any + Send + Sync>) -> Option<SharedList<E>> {
        any.downcast::<RwLock<Vec<E>>>().ok().map(SharedList)
    }
}

impl<E> Clone for SharedList<E> {
    fn clone(&self) -> Self {
        SharedList(self.0.clone())
    }
}

impl<E> Default for SharedList<E> {
    fn default() -> Self {
        SharedList::new(Vec::new())
    }
}

impl<E> From<Vec<E>> for SharedList<E> {
    fn from(items: Vec<E>) -> Self {
        SharedList::new(items)
    }
}

impl<E: Debug> Debug for SharedList<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedList({:?})", &*self.0.read())
    }
}
