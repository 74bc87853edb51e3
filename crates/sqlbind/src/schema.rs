//! Per-type column schema cache.
//!
//! A struct type's flattened column list is computed once per distinct type
//! and shared across sessions. Multiple sessions may introspect the same
//! type concurrently, so the cache is a read-through map behind a `RwLock`:
//! read-lock fast path, write lock only on first population.

use crate::row::TableRow;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared cache of flattened column lists, keyed by type identity.
///
/// The cache owns every schema entry; sessions hold only shared references.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<TypeId, Arc<[&'static str]>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flattened column list for `T`, computed on first sight and
    /// cached for the lifetime of the cache.
    pub fn columns<T: TableRow + 'static>(&self) -> Arc<[&'static str]> {
        let key = TypeId::of::<T>();
        if let Some(cols) = self.entries.read().expect("schema cache poisoned").get(&key) {
            return Arc::clone(cols);
        }

        // Compute outside the write lock; another thread may race the
        // insert, in which case both arrive at the same column list.
        let cols: Arc<[&'static str]> = T::columns().into();
        let mut entries = self.entries.write().expect("schema cache poisoned");
        Arc::clone(entries.entry(key).or_insert(cols))
    }
}
