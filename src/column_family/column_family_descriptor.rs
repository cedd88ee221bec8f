use serde::{Deserialize, Serialize};

use crate::column_family::{ColumnFamilyOptions, DEFAULT_COLUMN_FAMILY_NAME};

/// Name and options of a column family to open or create.
///
/// # Example
///
/// ```ignore
/// use lsmkv::{ColumnFamilyDescriptor, DB, DBOptions};
///
/// let descriptors = vec![
///     ColumnFamilyDescriptor::from("default"),
///     ColumnFamilyDescriptor::from("new_cf2"),
/// ];
/// let (db, handles) =
///     DB::open_for_read_only_with_column_families("mydb", DBOptions::default(), descriptors)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamilyDescriptor {
    pub name: String,
    pub options: ColumnFamilyOptions,
}

impl ColumnFamilyDescriptor {
    pub fn new<S: Into<String>>(name: S, options: ColumnFamilyOptions) -> Self {
        ColumnFamilyDescriptor {
            name: name.into(),
            options,
        }
    }

    /// Descriptor of the `"default"` family with default options.
    pub fn default_family() -> Self {
        Self::from(DEFAULT_COLUMN_FAMILY_NAME)
    }
}

impl From<&str> for ColumnFamilyDescriptor {
    fn from(name: &str) -> Self {
        ColumnFamilyDescriptor::new(name, ColumnFamilyOptions::default())
    }
}
