use serde::{Deserialize, Serialize};

use crate::table::format::CompressionType;

/// Options for a specific Column Family
///
/// # Example
///
/// ```ignore
/// use lsmkv::{ColumnFamilyOptions, CompressionType};
///
/// let options = ColumnFamilyOptions {
///     write_buffer_size: 8 * 1024 * 1024,
///     compression_type: CompressionType::Lz4,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFamilyOptions {
    /// Size of write buffer (MemTable) in bytes before flushing to disk
    /// Default: 4MB
    pub write_buffer_size: usize,

    /// Compression type for table files
    /// Default: Snappy
    pub compression_type: CompressionType,
}

impl Default for ColumnFamilyOptions {
    fn default() -> Self {
        ColumnFamilyOptions {
            write_buffer_size: 4 * 1024 * 1024,
            compression_type: CompressionType::Snappy,
        }
    }
}
