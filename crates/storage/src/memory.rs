//! MemoryStore: in-process ordered store
//!
//! This module implements [`OrderedStore`] using:
//! - one `BTreeMap<Vec<u8>, Vec<u8>>` per namespace
//! - a single `parking_lot::RwLock` over all namespaces
//! - `Arc` copy-on-write maps so cursors iterate a stable snapshot
//!
//! # Design Notes
//!
//! - **Batch atomicity**: `write_batch` validates every namespace, then
//!   applies all operations under one write lock. Readers see all of a
//!   batch or none of it.
//! - **Snapshot cursors**: a cursor clones the namespace's `Arc`. Writers
//!   call `Arc::make_mut`, which copies the map only while a cursor is
//!   still alive, so callers may mutate while iterating.
//! - **Durability**: `WriteOptions::sync` is accepted and ignored.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use rowtable_core::{Error, NamespaceOptions, Result, WriteOptions};

use crate::store::{BatchOp, NamespaceId, OrderedStore, ReadOptions, StoreCursor, WriteBatch};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
struct Inner {
    names: FxHashMap<String, NamespaceId>,
    options: Vec<NamespaceOptions>,
    maps: Vec<Arc<Map>>,
}

impl Inner {
    fn map(&self, namespace: NamespaceId) -> Result<&Arc<Map>> {
        self.maps
            .get(namespace.as_usize())
            .ok_or_else(|| unknown_namespace(namespace))
    }
}

fn unknown_namespace(namespace: NamespaceId) -> Error {
    Error::store(format!("unknown namespace id {}", namespace.as_u32()))
}

/// In-memory ordered store
///
/// Thread-safe through one `parking_lot::RwLock`. Suitable for tests and
/// for embedding where persistence is not required.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store with no namespaces
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a namespace by name
    pub fn namespace(&self, name: &str) -> Option<NamespaceId> {
        self.inner.read().names.get(name).copied()
    }

    /// Options the namespace was created with
    pub fn namespace_options(&self, name: &str) -> Option<NamespaceOptions> {
        let inner = self.inner.read();
        let id = inner.names.get(name)?;
        inner.options.get(id.as_usize()).cloned()
    }

    /// Number of namespaces
    pub fn namespace_count(&self) -> usize {
        self.inner.read().maps.len()
    }

    /// Number of entries in a namespace (0 for unknown ids)
    pub fn len(&self, namespace: NamespaceId) -> usize {
        self.inner
            .read()
            .maps
            .get(namespace.as_usize())
            .map_or(0, |map| map.len())
    }

    /// Check whether a namespace holds no entries
    pub fn is_empty(&self, namespace: NamespaceId) -> bool {
        self.len(namespace) == 0
    }

    /// Copy every entry of a namespace, in key order
    ///
    /// Intended for assertions that compare whole-store states.
    pub fn dump(&self, namespace: NamespaceId) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner
            .read()
            .maps
            .get(namespace.as_usize())
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

impl OrderedStore for MemoryStore {
    fn create_namespace(&self, name: &str, options: &NamespaceOptions) -> Result<NamespaceId> {
        let mut inner = self.inner.write();
        if let Some(id) = inner.names.get(name) {
            return Ok(*id);
        }

        let raw = u32::try_from(inner.maps.len())
            .map_err(|_| Error::store("namespace limit reached"))?;
        let id = NamespaceId::new(raw);
        inner.names.insert(name.to_string(), id);
        inner.options.push(options.clone());
        inner.maps.push(Arc::new(Map::new()));
        tracing::debug!(namespace = name, id = raw, "created namespace");
        Ok(id)
    }

    fn get(&self, namespace: NamespaceId, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read();
        Ok(inner.map(namespace)?.get(key).cloned())
    }

    fn write_batch(&self, batch: WriteBatch, _options: &WriteOptions) -> Result<()> {
        let mut inner = self.inner.write();

        // Validate before mutating anything so a bad batch leaves no trace
        for op in batch.ops() {
            inner.map(op.namespace())?;
        }

        for op in batch.into_ops() {
            match op {
                BatchOp::Put {
                    namespace,
                    key,
                    value,
                } => {
                    Arc::make_mut(&mut inner.maps[namespace.as_usize()]).insert(key, value);
                }
                BatchOp::Delete { namespace, key } => {
                    Arc::make_mut(&mut inner.maps[namespace.as_usize()]).remove(&key);
                }
            }
        }
        Ok(())
    }

    fn cursor(
        &self,
        namespace: NamespaceId,
        options: ReadOptions,
    ) -> Result<Box<dyn StoreCursor + '_>> {
        let map = Arc::clone(self.inner.read().map(namespace)?);
        Ok(Box::new(MemoryCursor {
            map,
            options,
            current: None,
        }))
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Cursor over a snapshot of one namespace.
struct MemoryCursor {
    map: Arc<Map>,
    options: ReadOptions,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl MemoryCursor {
    fn land(&mut self, entry: Option<(&Vec<u8>, &Vec<u8>)>) {
        self.current = entry
            .filter(|(k, _)| self.options.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()));
    }

    fn first_at_or_after(&mut self, target: &[u8]) {
        let start = match self.options.lower_bound() {
            Some(lower) if lower > target => lower,
            _ => target,
        };
        let map = Arc::clone(&self.map);
        self.land(
            map.range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
                .next(),
        );
    }
}

impl StoreCursor for MemoryCursor {
    fn seek_to_first(&mut self) {
        let map = Arc::clone(&self.map);
        let entry = match self.options.lower_bound() {
            Some(lower) => map
                .range::<[u8], _>((Bound::Included(lower), Bound::Unbounded))
                .next(),
            None => map.iter().next(),
        };
        self.land(entry);
    }

    fn seek(&mut self, target: &[u8]) {
        self.first_at_or_after(target);
    }

    fn seek_for_prev(&mut self, target: &[u8]) {
        let end = match self.options.upper_bound() {
            Some(upper) if upper <= target => Bound::Excluded(upper),
            _ => Bound::Included(target),
        };
        let map = Arc::clone(&self.map);
        self.land(map.range::<[u8], _>((Bound::Unbounded, end)).next_back());
    }

    fn next(&mut self) {
        let Some((key, _)) = self.current.take() else {
            return;
        };
        let map = Arc::clone(&self.map);
        self.land(
            map.range::<[u8], _>((Bound::Excluded(key.as_slice()), Bound::Unbounded))
                .next(),
        );
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map_or(&[], |(k, _)| k.as_slice())
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map_or(&[], |(_, v)| v.as_slice())
    }
}
