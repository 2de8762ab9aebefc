use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::model::{Comment, Id};

/// Callback invoked when a cache entry is invalidated.
///
/// Used by collaborating caches (e.g. the forum feed, which displays
/// aggregate comment counts) to learn that their own view of a post is
/// stale. The hook receives the invalidated parent id; what to do about it
/// is the subscriber's business.
pub type InvalidateHook = Arc<dyn Fn(&Id) + Send + Sync>;

/// Shared per-parent-id comment cache.
///
/// - `fill(parent, comments)` stores a fetched child list.
/// - `get_fresh(parent)` reads it back, unless the entry was invalidated.
/// - `invalidate(parent)` marks the entry stale and notifies hooks.
///
/// Repeated reveals of the same node hit the cache and make no network
/// call; a successful submit invalidates the parent's entry so the next
/// read fetches again. Values are handed out as `Arc` clones (cheap).
///
/// Stale entries keep their data; `get_fresh` never returns them.
pub struct ThreadCache {
    entries: RwLock<HashMap<Id, Entry>>,
    hooks: RwLock<Vec<InvalidateHook>>,
}

struct Entry {
    comments: Arc<Vec<Comment>>,
    stale: bool,
}

impl ThreadCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Read the cached child list for `parent`, or `None` if the entry is
    /// missing or was invalidated.
    pub fn get_fresh(&self, parent: &Id) -> Option<Arc<Vec<Comment>>> {
        let entries = self.entries.read().unwrap();
        entries
            .get(parent)
            .filter(|e| !e.stale)
            .map(|e| Arc::clone(&e.comments))
    }

    /// Store a freshly fetched child list for `parent`, replacing any
    /// previous entry (stale or not). Returns the stored list.
    pub fn fill(&self, parent: &Id, comments: Vec<Comment>) -> Arc<Vec<Comment>> {
        let comments = Arc::new(comments);
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            parent.clone(),
            Entry {
                comments: Arc::clone(&comments),
                stale: false,
            },
        );
        comments
    }

    /// Mark the entry for `parent` stale and notify all hooks.
    ///
    /// Hooks fire even when no entry exists — the signal is about the
    /// parent id, not about this cache's contents.
    pub fn invalidate(&self, parent: &Id) {
        {
            let mut entries = self.entries.write().unwrap();
            if let Some(entry) = entries.get_mut(parent) {
                entry.stale = true;
            }
        }
        // Hooks run outside the entries lock; a hook may read the cache.
        let hooks = self.hooks.read().unwrap().clone();
        for hook in hooks {
            hook(parent);
        }
    }

    /// Whether a fresh entry exists for `parent`.
    pub fn contains_fresh(&self, parent: &Id) -> bool {
        self.get_fresh(parent).is_some()
    }

    /// Register a hook called on every invalidation.
    pub fn on_invalidate<F>(&self, hook: F)
    where
        F: Fn(&Id) + Send + Sync + 'static,
    {
        self.hooks.write().unwrap().push(Arc::new(hook));
    }

    /// Number of entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ThreadCache {
    fn default() -> Self {
        Self::new()
    }
}
