use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

use crate::document::binding::RecordLayout;
use crate::document::{Document, DocumentList, WeakDocument, WeakDocumentList};

/// The live view bound to a record.
#[derive(Clone)]
pub(crate) enum View {
    Document(WeakDocument),
    List(WeakDocumentList),
}

impl View {
    fn is_live(&self) -> bool {
        match self {
            View::Document(document) => document.upgrade().is_some(),
            View::List(list) => list.upgrade().is_some(),
        }
    }
}

/// A view that is still alive.
pub(crate) enum LiveView {
    Document(Document),
    List(DocumentList),
}

struct Entry {
    record: Weak<dyn Any + Send + Sync>,
    view: Option<View>,
    layout: Option<RecordLayout>,
}

impl Entry {
    fn record_is_live(&self) -> bool {
        self.record.strong_count() > 0
    }

    fn is_live(&self) -> bool {
        self.record_is_live() && self.view.as_ref().is_some_and(View::is_live)
    }
}

/// Associates live records, keyed by the address of their cell, with the
/// document or list currently bound to them.
///
/// Records and views are held weakly. A record's layout is held strongly
/// until the record itself is dropped, so it survives the view it was
/// created with. Dead entries are swept every `purge_interval` inserts.
pub(crate) struct IdentityCache {
    entries: Mutex<Entries>,
}

pub(crate) struct Entries {
    map: HashMap<usize, Entry>,
    inserts: usize,
    purge_interval: usize,
}

impl IdentityCache {
    pub(crate) fn new(purge_interval: usize) -> Self {
        IdentityCache {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                inserts: 0,
                purge_interval,
            }),
        }
    }

    /// Locks the cache. Check-then-insert sequences hold the guard
    /// throughout.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock()
    }

    pub(crate) fn purge_interval(&self) -> usize {
        self.entries.lock().purge_interval
    }
}

impl Entries {
    /// The live document bound to the record at `address`.
    pub(crate) fn document(&self, address: usize) -> Option<Document> {
        match self.live(address)? {
            LiveView::Document(document) => Some(document),
            LiveView::List(_) => None,
        }
    }

    /// The live list bound to the list cell at `address`.
    pub(crate) fn list(&self, address: usize) -> Option<DocumentList> {
        match self.live(address)? {
            LiveView::List(list) => Some(list),
            LiveView::Document(_) => None,
        }
    }

    /// The layout kept for the live record at `address`, whether or not a
    /// view of it is still alive.
    pub(crate) fn layout(&self, address: usize) -> Option<RecordLayout> {
        let entry = self.map.get(&address)?;
        if !entry.record_is_live() {
            return None;
        }
        entry.layout.clone()
    }

    fn live(&self, address: usize) -> Option<LiveView> {
        let entry = self.map.get(&address)?;
        // a dead record may share its address with a newer allocation
        entry.record.upgrade()?;
        match entry.view.as_ref()? {
            View::Document(document) => document.upgrade().map(LiveView::Document),
            View::List(list) => list.upgrade().map(LiveView::List),
        }
    }

    pub(crate) fn insert(
        &mut self,
        address: usize,
        record: &Arc<dyn Any + Send + Sync>,
        view: View,
        layout: Option<RecordLayout>,
    ) {
        self.map.insert(
            address,
            Entry {
                record: Arc::downgrade(record),
                view: Some(view),
                layout,
            },
        );
        self.inserts += 1;
        if self.inserts % self.purge_interval == 0 {
            let removed = self.purge();
            if removed > 0 {
                log::debug!("Swept {} dead bindings from the identity cache", removed);
            }
        }
    }

    /// Removes the entry at `address` if it is bound to `document` or dead.
    pub(crate) fn forget_document(&mut self, address: usize, document: &Document) -> bool {
        let matches = match self.map.get(&address) {
            Some(Entry {
                view: Some(View::Document(cached)),
                ..
            }) => cached.upgrade().map_or(true, |cached| cached.ptr_eq(document)),
            _ => false,
        };
        if matches {
            self.map.remove(&address);
        }
        matches
    }

    /// Removes the entry at `address` if it is bound to `list` or dead.
    pub(crate) fn forget_list(&mut self, address: usize, list: &DocumentList) -> bool {
        let matches = match self.map.get(&address) {
            Some(Entry {
                view: Some(View::List(cached)),
                ..
            }) => cached.upgrade().map_or(true, |cached| cached.ptr_eq(list)),
            _ => false,
        };
        if matches {
            self.map.remove(&address);
        }
        matches
    }

    /// Removes the entry at `address`, layout included, and returns its
    /// live view.
    pub(crate) fn take(&mut self, address: usize) -> Option<LiveView> {
        let view = self.live(address);
        self.map.remove(&address);
        view
    }

    /// Removes every entry and returns the views still alive.
    pub(crate) fn drain(&mut self) -> Vec<LiveView> {
        let addresses: Vec<usize> = self.map.keys().copied().collect();
        addresses
            .into_iter()
            .filter_map(|address| self.take(address))
            .collect()
    }

    /// Drops dead views, and whole entries once their record is gone.
    /// Returns the number of bindings removed.
    pub(crate) fn purge(&mut self) -> usize {
        let mut removed = 0;
        self.map.retain(|_, entry| {
            if entry.is_live() {
                return true;
            }
            if entry.view.take().is_some() {
                removed += 1;
            }
            entry.record_is_live() && entry.layout.is_some()
        });
        removed
    }

    pub(crate) fn live_count(&self) -> usize {
        self.map.values().filter(|entry| entry.is_live()).count()
    }
}
