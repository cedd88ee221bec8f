#[allow(clippy::module_inception)]
pub mod memtable;

pub use memtable::{InternalKey, LookupResult, MAX_SEQUENCE, MemTable, ValueKind};
