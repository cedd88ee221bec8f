use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    column_family::ColumnFamilyOptions,
    memtable::{LookupResult, MemTable},
    table::TableReader,
    util::Slice,
};

/// Runtime state of an open column family
///
/// - Active MemTable (receives new writes)
/// - Table files flushed from earlier MemTables, newest first
/// - Options the family was opened or created with
///
/// ```text
/// put → MemTable ── full / flush ──→ table file (newest first)
///                                          ↓
/// get → MemTable → newest table → ... → oldest table
/// ```
pub struct ColumnFamilyData {
    id: u32,
    name: String,
    options: ColumnFamilyOptions,
    mem: RwLock<Arc<MemTable>>,
    tables: RwLock<Vec<Arc<TableReader>>>,
}

impl ColumnFamilyData {
    pub fn new(id: u32, name: String, options: ColumnFamilyOptions) -> Self {
        ColumnFamilyData {
            id,
            name,
            options,
            mem: RwLock::new(Arc::new(MemTable::new())),
            tables: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ColumnFamilyOptions {
        &self.options
    }

    pub fn mem(&self) -> Arc<MemTable> {
        Arc::clone(&self.mem.read())
    }

    /// Install an empty MemTable and return the one it replaces.
    pub fn switch_memtable(&self) -> Arc<MemTable> {
        std::mem::replace(&mut *self.mem.write(), Arc::new(MemTable::new()))
    }

    /// Register a table as the newest one.
    pub fn add_table(&self, table: Arc<TableReader>) {
        self.tables.write().insert(0, table);
    }

    pub fn num_tables(&self) -> usize {
        self.tables.read().len()
    }

    pub fn should_flush(&self) -> bool {
        self.mem.read().approximate_memory_usage() >= self.options.write_buffer_size
    }

    /// Lookup through the MemTable, then tables from newest to oldest.
    /// Returns the layer that answered: `None` for the MemTable,
    /// `Some(file_number)` for a table.
    pub fn get(&self, key: &Slice) -> (LookupResult, Option<u64>) {
        let from_mem = self.mem.read().get(key);
        if from_mem != LookupResult::NotFound {
            return (from_mem, None);
        }

        for table in self.tables.read().iter() {
            let result = table.get(key);
            if result != LookupResult::NotFound {
                return (result, Some(table.file_number()));
            }
        }
        (LookupResult::NotFound, None)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        filename,
        memtable::{InternalKey, ValueKind},
        table::{CompressionType, TableBuilder},
    };

    fn table_with(dir: &TempDir, number: u64, entries: &[(&str, u64, ValueKind)]) -> TableReader {
        let path = filename::table_file_name(dir.path(), number);
        let mut builder = TableBuilder::new(&path, CompressionType::None);
        for (k, seq, kind) in entries {
            builder
                .add(
                    &InternalKey::new(Slice::from(*k), *seq, *kind),
                    &Slice::from(format!("{k}@{seq}")),
                )
                .unwrap();
        }
        builder.finish().unwrap();
        TableReader::open(&path, number).unwrap()
    }

    #[test]
    fn test_newer_layers_shadow_older() {
        let temp_dir = TempDir::new().unwrap();
        let cf = ColumnFamilyData::new(1, "users".to_string(), ColumnFamilyOptions::default());

        cf.add_table(Arc::new(table_with(
            &temp_dir,
            5,
            &[("a", 1, ValueKind::Value), ("b", 2, ValueKind::Value)],
        )));
        cf.add_table(Arc::new(table_with(
            &temp_dir,
            6,
            &[("b", 3, ValueKind::Deletion), ("c", 4, ValueKind::Value)],
        )));
        cf.mem().add(5, Slice::from("c"), Slice::from("c@mem"));

        assert_eq!(
            cf.get(&Slice::from("a")),
            (LookupResult::Found(Slice::from("a@1")), Some(5))
        );
        assert_eq!(cf.get(&Slice::from("b")), (LookupResult::Deleted, Some(6)));
        assert_eq!(
            cf.get(&Slice::from("c")),
            (LookupResult::Found(Slice::from("c@mem")), None)
        );
        assert_eq!(cf.get(&Slice::from("d")), (LookupResult::NotFound, None));
    }

    #[test]
    fn test_switch_memtable() {
        let cf = ColumnFamilyData::new(
            1,
            "users".to_string(),
            ColumnFamilyOptions {
                write_buffer_size: 16,
                ..Default::default()
            },
        );
        assert!(!cf.should_flush());

        cf.mem().add(1, Slice::from("key"), Slice::from("a value"));
        assert!(cf.should_flush());

        let old = cf.switch_memtable();
        assert_eq!(old.len(), 1);
        assert!(cf.mem().is_empty());
        assert!(!cf.should_flush());
    }
}
