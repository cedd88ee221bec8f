pub mod column_family;
pub mod compression;
pub mod db;
pub mod filename;
pub mod memtable;
pub mod options_file;
pub mod statistics;
pub mod table;
pub mod util;
pub mod version;
pub mod wal;

pub use column_family::{
    ColumnFamilyDescriptor, ColumnFamilyHandle, ColumnFamilyOptions, DEFAULT_COLUMN_FAMILY_NAME,
};
pub use db::{AccessMode, DB, DBOptions, ReadOptions, WriteBatch, WriteOptions};
pub use statistics::Statistics;
pub use table::format::CompressionType;
pub use util::{Code, Result, Slice, Status};
