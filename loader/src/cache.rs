//!
//! [`ScriptCache`] maps a script `src` to the shared future of the element
//! injected for it.
//!
//! The cache only stores a handle to the element; the element itself is
//! owned by the document. An entry is valid only while that element remains
//! attached, which the loader re-checks on every lookup.
//!

use crate::result::Result;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::collections::HashMap;

/// Shared, single-threaded future resolving to the script element
pub type ScriptFuture<T, E> = Shared<LocalBoxFuture<'static, Result<T, E>>>;

/// Create a [`ScriptFuture`] that is already settled with `result`
pub fn settled<T, E>(result: Result<T, E>) -> ScriptFuture<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    futures::future::ready(result).boxed_local().shared()
}

pub struct CacheEntry<T, E> {
    /// Element the future was created for
    pub element: T,
    pub future: ScriptFuture<T, E>,
}

impl<T, E> Clone for CacheEntry<T, E>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        CacheEntry {
            element: self.element.clone(),
            future: self.future.clone(),
        }
    }
}

pub struct ScriptCache<T, E> {
    entries: RefCell<HashMap<String, CacheEntry<T, E>>>,
}

impl<T, E> Default for ScriptCache<T, E> {
    fn default() -> Self {
        ScriptCache {
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl<T, E> ScriptCache<T, E>
where
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, src: &str) -> Option<CacheEntry<T, E>> {
        self.entries.borrow().get(src).cloned()
    }

    /// Register the future for `src`, replacing any previous entry
    pub fn insert(&self, src: &str, element: T, future: ScriptFuture<T, E>) {
        self.entries
            .borrow_mut()
            .insert(src.to_string(), CacheEntry { element, future });
    }

    pub fn remove(&self, src: &str) -> Option<CacheEntry<T, E>> {
        self.entries.borrow_mut().remove(src)
    }

    pub fn contains(&self, src: &str) -> bool {
        self.entries.borrow().contains_key(src)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every entry unconditionally
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
