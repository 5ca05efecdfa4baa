use parking_lot::RwLock;

/// Append-only list guarded by its own lock.
///
/// Readers take a snapshot; appends from other threads after the snapshot are
/// not observed by it.
#[derive(Debug)]
pub(crate) struct SyncList<T> {
    items: RwLock<Vec<T>>,
}

impl<T> Default for SyncList<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> SyncList<T> {
    pub(crate) fn push(&self, item: T) {
        self.items.write().push(item);
    }

    /// Appends unless `is_duplicate` matches an existing entry. Returns whether
    /// the item was added.
    pub(crate) fn push_unless(&self, item: T, is_duplicate: impl Fn(&T, &T) -> bool) -> bool {
        let mut items = self.items.write();
        if items.iter().any(|existing| is_duplicate(existing, &item)) {
            return false;
        }
        items.push(item);
        true
    }

    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.items.read().clone()
    }

    pub(crate) fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.items.read().iter().find(|item| predicate(item)).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.read().len()
    }
}
