use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::Path,
};

use crate::{
    column_family::DEFAULT_COLUMN_FAMILY_NAME,
    filename,
    util::{Result, Status},
    version::version_edit::{FileMetaData, VersionEdit},
    wal::{self, RecoveryMode},
};

pub const BYTEWISE_COMPARATOR: &str = "leveldb.BytewiseComparator";

/// Attempts at reading CURRENT and the manifest it names, for readers racing
/// a writer that is rolling the manifest over.
const RECOVER_ATTEMPTS: usize = 3;

/// Persisted state of one column family: its name and live table files,
/// oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFamilyVersion {
    pub name: String,
    pub files: Vec<FileMetaData>,
}

/// VersionSet is the in-memory image of the MANIFEST.
///
/// It is the persisted column family registry: which families exist,
/// which table files each one owns, which WAL is live, and the file number
/// and sequence counters. A VersionSet recovered for reading has no
/// manifest writer and cannot log edits.
pub struct VersionSet {
    column_families: BTreeMap<u32, ColumnFamilyVersion>,
    log_number: u64,
    next_file_number: u64,
    last_sequence: u64,
    max_column_family: u32,
    manifest_number: u64,
    manifest: Option<wal::Writer>,
}

impl VersionSet {
    /// Initialize a fresh database: MANIFEST-000001 holding only the
    /// default column family, and CURRENT pointing at it.
    pub fn create(db_path: &Path) -> Result<Self> {
        let manifest_number = 1;
        let mut vs = VersionSet {
            column_families: BTreeMap::new(),
            log_number: 0,
            next_file_number: manifest_number + 1,
            last_sequence: 0,
            max_column_family: 0,
            manifest_number,
            manifest: None,
        };

        let mut edit = VersionEdit::new();
        edit.set_comparator(BYTEWISE_COMPARATOR);
        edit.create_column_family(0, DEFAULT_COLUMN_FAMILY_NAME);
        edit.set_log_number(0);
        edit.set_max_column_family(0);

        vs.manifest = Some(wal::Writer::new(filename::manifest_file_name(
            db_path,
            manifest_number,
        ))?);
        vs.log_and_apply(edit)?;
        set_current_file(db_path, manifest_number)?;

        log::info!(
            "created new database at {} with {}",
            db_path.display(),
            filename::manifest_name(manifest_number)
        );
        Ok(vs)
    }

    /// Rebuild state from the manifest named by CURRENT, without the
    /// ability to write.
    pub fn recover(db_path: &Path) -> Result<Self> {
        let mut last_err = None;
        for _ in 0..RECOVER_ATTEMPTS {
            let manifest_number = read_current_file(db_path)?;
            match Self::recover_from(db_path, manifest_number) {
                Err(e) if e.is_io_error() && manifest_missing(db_path, manifest_number) => {
                    log::debug!(
                        "{} vanished while recovering, re-reading CURRENT",
                        filename::manifest_name(manifest_number)
                    );
                    last_err = Some(e);
                },
                other => return other,
            }
        }
        Err(last_err.unwrap_or_else(|| Status::io_error("MANIFEST keeps changing")))
    }

    /// Recover, then roll over to a fresh manifest holding a snapshot of the
    /// recovered state so appends never follow a torn tail.
    pub fn recover_for_write(db_path: &Path) -> Result<Self> {
        let mut vs = Self::recover(db_path)?;
        let old_manifest = vs.manifest_number;
        let manifest_number = vs.new_file_number();

        let mut writer = wal::Writer::new(filename::manifest_file_name(db_path, manifest_number))?;
        writer.add_record(&vs.snapshot_edit().encode())?;
        writer.sync()?;
        set_current_file(db_path, manifest_number)?;

        vs.manifest = Some(writer);
        vs.manifest_number = manifest_number;

        if let Err(e) = fs::remove_file(filename::manifest_file_name(db_path, old_manifest)) {
            log::warn!(
                "failed to remove old {}: {e}",
                filename::manifest_name(old_manifest)
            );
        }
        Ok(vs)
    }

    fn recover_from(db_path: &Path, manifest_number: u64) -> Result<Self> {
        let manifest_path = filename::manifest_file_name(db_path, manifest_number);
        let mut reader = wal::Reader::new(&manifest_path, RecoveryMode::TolerateCorruptedTail)?;

        let mut vs = VersionSet {
            column_families: BTreeMap::new(),
            log_number: 0,
            next_file_number: manifest_number + 1,
            last_sequence: 0,
            max_column_family: 0,
            manifest_number,
            manifest: None,
        };

        let mut num_edits = 0;
        while let Some(record) = reader.read_record()? {
            let edit = VersionEdit::decode(&record)?;
            if let Some(cmp) = &edit.comparator
                && cmp != BYTEWISE_COMPARATOR
            {
                return Err(Status::invalid_argument(format!(
                    "Database was created with comparator {cmp}, expected {BYTEWISE_COMPARATOR}"
                )));
            }
            vs.apply(edit)?;
            num_edits += 1;
        }

        if !vs.column_families.contains_key(&0) {
            return Err(Status::corruption(
                "MANIFEST does not record the default column family",
            ));
        }

        log::debug!(
            "recovered {} edits from {}: {} column families, log {}, next file {}, last sequence {}",
            num_edits,
            filename::manifest_name(manifest_number),
            vs.column_families.len(),
            vs.log_number,
            vs.next_file_number,
            vs.last_sequence
        );
        Ok(vs)
    }

    /// An edit that recreates the whole current state.
    fn snapshot_edit(&self) -> VersionEdit {
        let mut edit = VersionEdit::new();
        edit.set_comparator(BYTEWISE_COMPARATOR);
        edit.set_log_number(self.log_number);
        edit.set_next_file_number(self.next_file_number);
        edit.set_last_sequence(self.last_sequence);
        edit.set_max_column_family(self.max_column_family);
        for (id, cf) in &self.column_families {
            edit.create_column_family(*id, cf.name.clone());
            for file in &cf.files {
                edit.add_file(*id, file.clone());
            }
        }
        edit
    }

    /// Persist `edit` to the manifest, then apply it in memory.
    pub fn log_and_apply(&mut self, mut edit: VersionEdit) -> Result<()> {
        if self.manifest.is_none() {
            return Err(Status::not_supported("MANIFEST was opened read-only"));
        }

        if edit.next_file_number.is_none() {
            edit.set_next_file_number(self.next_file_number);
        }
        if edit.last_sequence.is_none() {
            edit.set_last_sequence(self.last_sequence);
        }

        // Validate against a copy first so a bad edit is neither logged nor
        // half applied.
        let mut families = self.column_families.clone();
        Self::apply_families(&mut families, &edit)?;

        let encoded = edit.encode();
        if let Some(writer) = self.manifest.as_mut() {
            writer.add_record(&encoded)?;
            writer.sync()?;
        }

        self.column_families = families;
        self.apply_counters(&edit);
        Ok(())
    }

    fn apply(&mut self, edit: VersionEdit) -> Result<()> {
        Self::apply_families(&mut self.column_families, &edit)?;
        self.apply_counters(&edit);
        Ok(())
    }

    fn apply_counters(&mut self, edit: &VersionEdit) {
        if let Some(num) = edit.log_number {
            self.log_number = num;
        }
        if let Some(num) = edit.next_file_number {
            self.next_file_number = self.next_file_number.max(num);
        }
        if let Some(seq) = edit.last_sequence {
            self.last_sequence = self.last_sequence.max(seq);
        }
        let max_created = edit.created_column_families.iter().map(|(id, _)| *id).max();
        for id in edit.max_column_family.into_iter().chain(max_created) {
            self.max_column_family = self.max_column_family.max(id);
        }
    }

    fn apply_families(
        families: &mut BTreeMap<u32, ColumnFamilyVersion>,
        edit: &VersionEdit,
    ) -> Result<()> {
        for (id, name) in &edit.created_column_families {
            if families.contains_key(id) || families.values().any(|cf| cf.name == *name) {
                return Err(Status::corruption(format!(
                    "Column family {name} (id {id}) created twice"
                )));
            }
            families.insert(
                *id,
                ColumnFamilyVersion {
                    name: name.clone(),
                    files: Vec::new(),
                },
            );
        }

        for (id, number) in &edit.deleted_files {
            let cf = families.get_mut(id).ok_or_else(|| {
                Status::corruption(format!("File deleted from unknown column family {id}"))
            })?;
            cf.files.retain(|f| f.number != *number);
        }

        for (id, file) in &edit.new_files {
            let cf = families.get_mut(id).ok_or_else(|| {
                Status::corruption(format!("File added to unknown column family {id}"))
            })?;
            cf.files.push(file.clone());
        }

        for id in &edit.dropped_column_families {
            if *id == 0 {
                return Err(Status::corruption("Default column family cannot be dropped"));
            }
            if families.remove(id).is_none() {
                return Err(Status::corruption(format!(
                    "Dropped unknown column family {id}"
                )));
            }
        }

        Ok(())
    }

    /// Column families by id, default first.
    pub fn column_families(&self) -> impl Iterator<Item = (u32, &ColumnFamilyVersion)> {
        self.column_families.iter().map(|(id, cf)| (*id, cf))
    }

    pub fn find_column_family(&self, name: &str) -> Option<u32> {
        self.column_families
            .iter()
            .find(|(_, cf)| cf.name == name)
            .map(|(id, _)| *id)
    }

    /// Table files of a column family, oldest first.
    pub fn files(&self, cf_id: u32) -> &[FileMetaData] {
        self.column_families
            .get(&cf_id)
            .map(|cf| cf.files.as_slice())
            .unwrap_or(&[])
    }

    pub fn new_file_number(&mut self) -> u64 {
        let num = self.next_file_number;
        self.next_file_number += 1;
        num
    }

    pub fn next_column_family_id(&self) -> u32 {
        self.max_column_family + 1
    }

    pub fn log_number(&self) -> u64 {
        self.log_number
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Raise the last sequence in memory; persisted with the next edit.
    pub fn set_last_sequence(&mut self, seq: u64) {
        self.last_sequence = self.last_sequence.max(seq);
    }

    pub fn manifest_number(&self) -> u64 {
        self.manifest_number
    }

    pub fn is_writable(&self) -> bool {
        self.manifest.is_some()
    }
}

fn manifest_missing(db_path: &Path, number: u64) -> bool {
    !filename::manifest_file_name(db_path, number).exists()
}

/// Parse CURRENT. A missing CURRENT means there is no database here.
pub fn read_current_file(db_path: &Path) -> Result<u64> {
    let contents = match fs::read_to_string(filename::current_file_name(db_path)) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Status::invalid_argument(format!(
                "{}: does not exist (no CURRENT file)",
                db_path.display()
            )));
        },
        Err(e) => return Err(e.into()),
    };

    contents
        .trim_end()
        .strip_prefix("MANIFEST-")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| Status::corruption(format!("CURRENT names no manifest: {contents:?}")))
}

/// Point CURRENT at `manifest_number` atomically via a temp file rename.
fn set_current_file(db_path: &Path, manifest_number: u64) -> Result<()> {
    let tmp = db_path.join(format!("{manifest_number:06}.dbtmp"));
    {
        let mut file = fs::File::create(&tmp)?;
        writeln!(file, "{}", filename::manifest_name(manifest_number))?;
        file.sync_all()?;
    }
    fs::rename(&tmp, filename::current_file_name(db_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::util::Slice;

    fn file(number: u64) -> FileMetaData {
        FileMetaData::new(number, 100, Slice::from("a"), Slice::from("z"))
    }

    #[test]
    fn test_create_then_recover() {
        let temp_dir = TempDir::new().unwrap();
        VersionSet::create(temp_dir.path()).unwrap();

        assert_eq!(read_current_file(temp_dir.path()).unwrap(), 1);

        let vs = VersionSet::recover(temp_dir.path()).unwrap();
        let names: Vec<&str> = vs.column_families().map(|(_, cf)| cf.name.as_str()).collect();
        assert_eq!(names, vec!["default"]);
        assert!(!vs.is_writable());
    }

    #[test]
    fn test_recover_missing_database() {
        let temp_dir = TempDir::new().unwrap();
        let err = VersionSet::recover(temp_dir.path()).err().unwrap();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_column_families_and_files_persist() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut vs = VersionSet::create(temp_dir.path()).unwrap();
            let mut edit = VersionEdit::new();
            edit.create_column_family(1, "new_cf");
            edit.create_column_family(2, "new_cf2");
            vs.log_and_apply(edit).unwrap();

            let mut edit = VersionEdit::new();
            edit.add_file(2, file(10));
            edit.add_file(2, file(11));
            edit.set_last_sequence(42);
            vs.log_and_apply(edit).unwrap();

            let mut edit = VersionEdit::new();
            edit.delete_file(2, 10);
            edit.drop_column_family(1);
            vs.log_and_apply(edit).unwrap();
        }

        let vs = VersionSet::recover(temp_dir.path()).unwrap();
        assert_eq!(vs.find_column_family("new_cf2"), Some(2));
        assert_eq!(vs.find_column_family("new_cf"), None);
        assert_eq!(vs.files(2), &[file(11)]);
        assert_eq!(vs.last_sequence(), 42);
        // Dropped ids are never reused.
        assert_eq!(vs.next_column_family_id(), 3);
    }

    #[test]
    fn test_read_only_cannot_log() {
        let temp_dir = TempDir::new().unwrap();
        VersionSet::create(temp_dir.path()).unwrap();

        let mut vs = VersionSet::recover(temp_dir.path()).unwrap();
        let mut edit = VersionEdit::new();
        edit.create_column_family(1, "users");
        assert!(vs.log_and_apply(edit).is_err());
        assert_eq!(vs.find_column_family("users"), None);
    }

    #[test]
    fn test_invalid_edit_is_not_logged() {
        let temp_dir = TempDir::new().unwrap();
        let mut vs = VersionSet::create(temp_dir.path()).unwrap();

        let mut edit = VersionEdit::new();
        edit.add_file(5, file(3));
        assert!(vs.log_and_apply(edit).is_err());

        let vs = VersionSet::recover(temp_dir.path()).unwrap();
        assert!(vs.files(5).is_empty());
    }

    #[test]
    fn test_recover_for_write_rolls_manifest() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut vs = VersionSet::create(temp_dir.path()).unwrap();
            let mut edit = VersionEdit::new();
            edit.create_column_family(1, "users");
            edit.add_file(1, file(2));
            vs.log_and_apply(edit).unwrap();
        }

        let vs = VersionSet::recover_for_write(temp_dir.path()).unwrap();
        assert!(vs.is_writable());
        assert!(vs.manifest_number() > 1);
        assert!(!filename::manifest_file_name(temp_dir.path(), 1).exists());
        drop(vs);

        let vs = VersionSet::recover(temp_dir.path()).unwrap();
        assert_eq!(vs.find_column_family("users"), Some(1));
        assert_eq!(vs.files(1), &[file(2)]);
    }
}
