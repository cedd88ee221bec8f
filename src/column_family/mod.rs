/// Column Family module
///
/// Column Families are named partitions of the keyspace sharing one
/// directory, one WAL and one MANIFEST. Each family has its own MemTable,
/// table files and options.
///
/// # Architecture
///
/// ```text
/// DB
///  ├─→ ColumnFamily("default")   (id 0, always present)
///  │    ├─→ MemTable
///  │    └─→ table files
///  ├─→ ColumnFamily("new_cf")
///  └─→ ColumnFamily("new_cf2")
/// ```
///
/// Families are created on a read-write DB and recorded in the MANIFEST.
/// Any later open, read-only ones included, resolves them by name.
mod column_family_data;
pub mod column_family_descriptor;
pub mod column_family_handle;
pub mod column_family_options;
mod column_family_set;

pub(crate) use column_family_data::ColumnFamilyData;
pub use column_family_descriptor::ColumnFamilyDescriptor;
pub use column_family_handle::ColumnFamilyHandle;
pub use column_family_options::ColumnFamilyOptions;
pub(crate) use column_family_set::{ColumnFamilySet, ResolvedFamily, resolve_descriptors};

/// Default column family name
pub const DEFAULT_COLUMN_FAMILY_NAME: &str = "default";
