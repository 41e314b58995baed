//! Per-kind dedup caches.
//!
//! Each cache maps a constant's content to the canonical arena object for it,
//! so that every occurrence of the same constant across all segments resolves
//! to one shared object. Which notion of "same" applies is chosen per kind by
//! an [`IdentityStrategy`]:
//!
//! * ints, text and bytes compare by content,
//! * floats compare by bit pattern, keeping `0.0`/`-0.0` and NaN payloads apart,
//! * containers compare shallowly by the identity of their elements, which is
//!   enough because the elements were canonicalised before the container.

use hashbrown::HashTable;
use strum::{Display, EnumCount};

use crate::{
    hash::fast_hash_u64,
    heap::{Heap, HeapData},
    value::{ConstId, Value},
};

/// The kinds of constants that get deduplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Long,
    Float,
    Bytes,
    Unicode,
    Tuple,
    List,
    Dict,
    Set,
    FrozenSet,
}

impl CacheKind {
    /// Every kind, in discriminant order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Long,
        Self::Float,
        Self::Bytes,
        Self::Unicode,
        Self::Tuple,
        Self::List,
        Self::Dict,
        Self::Set,
        Self::FrozenSet,
    ];
}

/// Hash and equality used by one cache.
///
/// Implementations must keep `eq(a, b) => hash(a) == hash(b)`.
pub trait IdentityStrategy {
    fn hash(&self, data: &HeapData) -> u64;
    fn eq(&self, a: &HeapData, b: &HeapData) -> bool;
}

/// Content comparison for ints, text and bytes.
#[derive(Debug, Clone, Copy)]
pub struct ContentIdentity;

impl IdentityStrategy for ContentIdentity {
    fn hash(&self, data: &HeapData) -> u64 {
        match data {
            HeapData::Int(i) => fast_hash_u64(&i.to_le_bytes()),
            HeapData::LongInt(b) => fast_hash_u64(&b.to_signed_bytes_le()),
            HeapData::Str(s) => fast_hash_u64(s.as_str().as_bytes()),
            HeapData::Bytes(b) => fast_hash_u64(b),
            other => fast_hash_u64(other.type_name().as_bytes()),
        }
    }

    fn eq(&self, a: &HeapData, b: &HeapData) -> bool {
        match (a, b) {
            (HeapData::Int(a), HeapData::Int(b)) => a == b,
            (HeapData::LongInt(a), HeapData::LongInt(b)) => a == b,
            (HeapData::Str(a), HeapData::Str(b)) => a.as_str() == b.as_str(),
            (HeapData::Bytes(a), HeapData::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

/// Bit-pattern comparison for floats.
#[derive(Debug, Clone, Copy)]
pub struct FloatBitsIdentity;

impl IdentityStrategy for FloatBitsIdentity {
    fn hash(&self, data: &HeapData) -> u64 {
        match data {
            HeapData::Float(f) => fast_hash_u64(&f.to_bits().to_le_bytes()),
            _ => 0,
        }
    }

    fn eq(&self, a: &HeapData, b: &HeapData) -> bool {
        match (a, b) {
            (HeapData::Float(a), HeapData::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

/// Element-identity comparison for containers.
///
/// Sequences and dicts are order-sensitive. Sets hash order-insensitively and
/// compare by membership, since two sets with the same members are the same
/// constant whatever order they were written in.
#[derive(Debug, Clone, Copy)]
pub struct ShallowIdentity;

fn hash_sequence<'a>(items: impl Iterator<Item = &'a Value>) -> u64 {
    let mut buf = Vec::new();
    for item in items {
        buf.extend_from_slice(&item.identity_bytes());
    }
    fast_hash_u64(&buf)
}

impl IdentityStrategy for ShallowIdentity {
    fn hash(&self, data: &HeapData) -> u64 {
        match data {
            HeapData::Tuple(items) | HeapData::List(items) => hash_sequence(items.iter()),
            HeapData::Dict(map) => hash_sequence(map.iter().flat_map(|(k, v)| [k, v])),
            HeapData::Set(set) | HeapData::FrozenSet(set) => set
                .iter()
                .map(|item| fast_hash_u64(&item.identity_bytes()))
                .fold(set.len() as u64, u64::wrapping_add),
            _ => 0,
        }
    }

    fn eq(&self, a: &HeapData, b: &HeapData) -> bool {
        match (a, b) {
            (HeapData::Tuple(a), HeapData::Tuple(b)) | (HeapData::List(a), HeapData::List(b)) => a == b,
            (HeapData::Dict(a), HeapData::Dict(b)) => a.len() == b.len() && a.iter().eq(b.iter()),
            (HeapData::Set(a), HeapData::Set(b)) | (HeapData::FrozenSet(a), HeapData::FrozenSet(b)) => {
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            _ => false,
        }
    }
}

/// One dedup cache: a hash table of arena ids keyed by a strategy.
#[derive(Debug)]
pub struct ConstCache {
    kind: CacheKind,
    table: HashTable<ConstId>,
    hits: usize,
}

impl ConstCache {
    #[must_use]
    pub fn new(kind: CacheKind) -> Self {
        Self {
            kind,
            table: HashTable::new(),
            hits: 0,
        }
    }

    /// Returns the canonical id for `data`, allocating it if this is the first
    /// occurrence.
    pub fn intern(&mut self, heap: &mut Heap, data: HeapData, strategy: &impl IdentityStrategy) -> ConstId {
        let hash = strategy.hash(&data);
        if let Some(&existing) = self.table.find(hash, |&id| strategy.eq(heap.get(id), &data)) {
            self.hits += 1;
            return existing;
        }
        let id = heap.allocate(data);
        self.table.insert_unique(hash, id, |&id| strategy.hash(heap.get(id)));
        id
    }

    /// Registers an object allocated outside the cache as the canonical one
    /// for its content, unless an equal object is already cached.
    pub fn adopt(&mut self, heap: &Heap, id: ConstId, strategy: &impl IdentityStrategy) {
        let data = heap.get(id);
        let hash = strategy.hash(data);
        if self.table.find(hash, |&other| strategy.eq(heap.get(other), data)).is_none() {
            self.table.insert_unique(hash, id, |&other| strategy.hash(heap.get(other)));
        }
    }

    #[must_use]
    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            kind: self.kind,
            entries: self.table.len(),
            hits: self.hits,
        }
    }
}

/// Snapshot of one cache's size and hit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub kind: CacheKind,
    pub entries: usize,
    pub hits: usize,
}

/// The full set of caches, one per [`CacheKind`].
///
/// Tables allocate on first insert, so building this is cheap.
#[derive(Debug)]
pub struct ConstCaches {
    caches: [ConstCache; CacheKind::COUNT],
}

impl Default for ConstCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstCaches {
    #[must_use]
    pub fn new() -> Self {
        Self {
            caches: CacheKind::ALL.map(ConstCache::new),
        }
    }

    /// Returns the canonical id for `data` in the cache for `kind`.
    pub fn intern(&mut self, heap: &mut Heap, kind: CacheKind, data: HeapData) -> ConstId {
        let cache = &mut self.caches[kind as usize];
        match kind {
            CacheKind::Long | CacheKind::Bytes | CacheKind::Unicode => cache.intern(heap, data, &ContentIdentity),
            CacheKind::Float => cache.intern(heap, data, &FloatBitsIdentity),
            CacheKind::Tuple | CacheKind::List | CacheKind::Dict | CacheKind::Set | CacheKind::FrozenSet => {
                cache.intern(heap, data, &ShallowIdentity)
            }
        }
    }

    /// Seeds the cache for `kind` with an object allocated while no caches
    /// existed.
    pub fn adopt(&mut self, heap: &Heap, kind: CacheKind, id: ConstId) {
        let cache = &mut self.caches[kind as usize];
        match kind {
            CacheKind::Long | CacheKind::Bytes | CacheKind::Unicode => cache.adopt(heap, id, &ContentIdentity),
            CacheKind::Float => cache.adopt(heap, id, &FloatBitsIdentity),
            CacheKind::Tuple | CacheKind::List | CacheKind::Dict | CacheKind::Set | CacheKind::FrozenSet => {
                cache.adopt(heap, id, &ShallowIdentity)
            }
        }
    }

    #[must_use]
    pub fn get(&self, kind: CacheKind) -> &ConstCache {
        &self.caches[kind as usize]
    }

    #[must_use]
    pub fn stats(&self) -> Vec<CacheStats> {
        self.caches.iter().map(ConstCache::stats).collect()
    }
}
