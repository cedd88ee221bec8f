pub mod version_edit;
pub mod version_set;

pub use version_edit::{FileMetaData, VersionEdit};
pub use version_set::{ColumnFamilyVersion, VersionSet};
