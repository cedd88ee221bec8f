use std::{
    cmp::Ordering as CmpOrdering,
    sync::atomic::{AtomicUsize, Ordering},
};

use crossbeam_skiplist::SkipMap;

use crate::util::{Result, Slice, Status};

/// Largest sequence number; used to seek to the newest entry of a key.
pub const MAX_SEQUENCE: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Deletion = 0,
    Value = 1,
}

impl ValueKind {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ValueKind::Deletion),
            1 => Ok(ValueKind::Value),
            other => Err(Status::corruption(format!("Unknown value kind {other}"))),
        }
    }
}

/// Key as stored inside the engine: user key plus the sequence number and
/// kind of the write that produced it.
///
/// Ordered by user key ascending, then sequence descending, so the newest
/// version of a key is met first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    pub user_key: Slice,
    pub sequence: u64,
    pub kind: ValueKind,
}

impl InternalKey {
    pub fn new(user_key: Slice, sequence: u64, kind: ValueKind) -> Self {
        InternalKey {
            user_key,
            sequence,
            kind,
        }
    }

    /// Smallest internal key for `user_key` visible at `sequence`.
    pub fn lookup(user_key: Slice, sequence: u64) -> Self {
        InternalKey::new(user_key, sequence, ValueKind::Value)
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.user_key
            .cmp(&other.user_key)
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| (other.kind as u8).cmp(&(self.kind as u8)))
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Result of a point lookup in one layer of the LSM tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(Slice),
    /// The newest entry for the key is a tombstone; older layers must not
    /// be consulted.
    Deleted,
    /// This layer knows nothing about the key.
    NotFound,
}

impl LookupResult {
    pub fn from_entry(kind: ValueKind, value: Slice) -> Self {
        match kind {
            ValueKind::Value => LookupResult::Found(value),
            ValueKind::Deletion => LookupResult::Deleted,
        }
    }
}

pub struct MemTable {
    table: SkipMap<InternalKey, Slice>,
    approximate_memory: AtomicUsize,
}

impl MemTable {
    pub fn new() -> Self {
        MemTable {
            table: SkipMap::new(),
            approximate_memory: AtomicUsize::new(0),
        }
    }

    pub fn add(&self, sequence: u64, key: Slice, value: Slice) {
        self.insert(InternalKey::new(key, sequence, ValueKind::Value), value);
    }

    pub fn delete(&self, sequence: u64, key: Slice) {
        self.insert(
            InternalKey::new(key, sequence, ValueKind::Deletion),
            Slice::empty(),
        );
    }

    fn insert(&self, key: InternalKey, value: Slice) {
        // user key + sequence(8) + kind(1)
        let usage = key.user_key.size() + 9 + value.size();
        self.approximate_memory.fetch_add(usage, Ordering::Relaxed);
        self.table.insert(key, value);
    }

    pub fn get(&self, key: &Slice) -> LookupResult {
        let start = InternalKey::lookup(key.clone(), MAX_SEQUENCE);
        match self.table.range(start..).next() {
            Some(entry) if entry.key().user_key == *key => {
                LookupResult::from_entry(entry.key().kind, entry.value().clone())
            },
            _ => LookupResult::NotFound,
        }
    }

    /// All entries in internal key order, tombstones included.
    pub fn collect_entries(&self) -> Vec<(InternalKey, Slice)> {
        self.table
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn approximate_memory_usage(&self) -> usize {
        self.approximate_memory.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
