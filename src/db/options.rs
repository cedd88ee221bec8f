use serde::{Deserialize, Serialize};

use crate::{column_family::ColumnFamilyOptions, table::CompressionType};

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Sync the WAL before the write returns
    pub sync: bool,
}

/// Per-read settings.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DBOptions {
    pub create_if_missing: bool,
    pub error_if_exists: bool,
    /// Create column families named in a read-write open that the
    /// MANIFEST does not know yet
    pub create_missing_column_families: bool,
    /// MemTable size of the default column family when it is opened
    /// without a descriptor
    pub write_buffer_size: usize,
    pub compression_type: CompressionType,
}

impl DBOptions {
    /// Options for a column family opened without its own descriptor.
    pub fn default_cf_options(&self) -> ColumnFamilyOptions {
        ColumnFamilyOptions {
            write_buffer_size: self.write_buffer_size,
            compression_type: self.compression_type,
        }
    }
}

impl Default for DBOptions {
    fn default() -> Self {
        DBOptions {
            create_if_missing: true,
            error_if_exists: false,
            create_missing_column_families: false,
            write_buffer_size: 4 * 1024 * 1024, // 4MB
            compression_type: CompressionType::Snappy,
        }
    }
}
