use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use parking_lot::RwLock;

use crate::{
    column_family::{ColumnFamilyData, ColumnFamilyDescriptor, DEFAULT_COLUMN_FAMILY_NAME},
    db::AccessMode,
    util::{Result, Status},
    version::VersionSet,
};

/// The column families open in one DB instance
///
/// Maps ids and names to runtime state. Which families exist on disk is
/// the MANIFEST's business (`VersionSet`); this set only holds the ones
/// this instance resolved at open time or created since.
pub struct ColumnFamilySet {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<u32, Arc<ColumnFamilyData>>,
    name_to_id: HashMap<String, u32>,
}

impl ColumnFamilySet {
    pub fn new() -> Self {
        ColumnFamilySet {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn insert(&self, cf: Arc<ColumnFamilyData>) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&cf.id()) || inner.name_to_id.contains_key(cf.name()) {
            return Err(Status::invalid_argument(format!(
                "Column family '{}' already exists",
                cf.name()
            )));
        }
        inner.name_to_id.insert(cf.name().to_string(), cf.id());
        inner.by_id.insert(cf.id(), cf);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<Arc<ColumnFamilyData>> {
        self.inner.read().by_id.get(&id).map(Arc::clone)
    }

    pub fn default_cf(&self) -> Result<Arc<ColumnFamilyData>> {
        self.get(0)
            .ok_or_else(|| Status::corruption("Default column family is not open"))
    }

    pub fn remove(&self, id: u32) -> Option<Arc<ColumnFamilyData>> {
        let mut inner = self.inner.write();
        let cf = inner.by_id.remove(&id)?;
        inner.name_to_id.remove(cf.name());
        Some(cf)
    }

    /// All open families ordered by id.
    pub fn list(&self) -> Vec<Arc<ColumnFamilyData>> {
        let mut cfs: Vec<_> = self.inner.read().by_id.values().map(Arc::clone).collect();
        cfs.sort_by_key(|cf| cf.id());
        cfs
    }

    pub fn count(&self) -> usize {
        self.inner.read().by_id.len()
    }
}

impl Default for ColumnFamilySet {
    fn default() -> Self {
        Self::new()
    }
}

/// A requested family matched against the MANIFEST. `id` is `None` when
/// the family does not exist yet and will be created by the open.
#[derive(Debug, Clone)]
pub struct ResolvedFamily {
    pub descriptor: ColumnFamilyDescriptor,
    pub id: Option<u32>,
}

/// Match the descriptors of an open against the persisted registry.
///
/// The result is index-aligned with `descriptors`.
///
/// - The list must be non-empty, name `"default"`, and not repeat a name.
/// - Read-only: every requested family must exist (`UnknownColumnFamily`);
///   any subset may be requested.
/// - Read-write: missing families are created when `create_missing` is
///   set and are `UnknownColumnFamily` otherwise; every existing family
///   must be requested, since its WAL records could not be recovered.
pub fn resolve_descriptors(
    versions: &VersionSet,
    mode: AccessMode,
    descriptors: &[ColumnFamilyDescriptor],
    create_missing: bool,
) -> Result<Vec<ResolvedFamily>> {
    if descriptors.is_empty() {
        return Err(Status::invalid_argument(
            "At least the default column family must be specified",
        ));
    }

    let mut seen = HashSet::new();
    for d in descriptors {
        if !seen.insert(d.name.as_str()) {
            return Err(Status::invalid_argument(format!(
                "Column family '{}' is specified more than once",
                d.name
            )));
        }
    }
    if !seen.contains(DEFAULT_COLUMN_FAMILY_NAME) {
        return Err(Status::invalid_argument(
            "Default column family must be specified",
        ));
    }

    let mut resolved = Vec::with_capacity(descriptors.len());
    for d in descriptors {
        let id = versions.find_column_family(&d.name);
        if id.is_none() && (mode.is_read_only() || !create_missing) {
            return Err(Status::unknown_column_family(&d.name));
        }
        resolved.push(ResolvedFamily {
            descriptor: d.clone(),
            id,
        });
    }

    if mode == AccessMode::ReadWrite {
        let unopened: Vec<&str> = versions
            .column_families()
            .map(|(_, cf)| cf.name.as_str())
            .filter(|name| !seen.contains(name))
            .collect();
        if !unopened.is_empty() {
            return Err(Status::invalid_argument(format!(
                "All column families must be opened in read-write mode, missing: {}",
                unopened.join(", ")
            )));
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{column_family::ColumnFamilyOptions, version::VersionEdit};

    fn versions_with(dir: &TempDir, names: &[&str]) -> VersionSet {
        let mut vs = VersionSet::create(dir.path()).unwrap();
        let mut edit = VersionEdit::new();
        for (i, name) in names.iter().enumerate() {
            edit.create_column_family(i as u32 + 1, *name);
        }
        vs.log_and_apply(edit).unwrap();
        vs
    }

    fn descriptors(names: &[&str]) -> Vec<ColumnFamilyDescriptor> {
        names
            .iter()
            .map(|n| ColumnFamilyDescriptor::from(*n))
            .collect()
    }

    #[test]
    fn test_set_insert_get_remove() {
        let set = ColumnFamilySet::new();
        set.insert(Arc::new(ColumnFamilyData::new(
            0,
            "default".to_string(),
            ColumnFamilyOptions::default(),
        )))
        .unwrap();
        set.insert(Arc::new(ColumnFamilyData::new(
            3,
            "users".to_string(),
            ColumnFamilyOptions::default(),
        )))
        .unwrap();

        assert_eq!(set.count(), 2);
        assert_eq!(set.get(3).unwrap().name(), "users");
        assert_eq!(set.default_cf().unwrap().name(), "default");

        let dup = ColumnFamilyData::new(4, "users".to_string(), ColumnFamilyOptions::default());
        assert!(set.insert(Arc::new(dup)).unwrap_err().is_invalid_argument());

        assert!(set.remove(3).is_some());
        assert!(set.get(3).is_none());

        // The name is free again after removal.
        let reused = ColumnFamilyData::new(5, "users".to_string(), ColumnFamilyOptions::default());
        set.insert(Arc::new(reused)).unwrap();
    }

    #[test]
    fn test_read_only_subset_in_request_order() {
        let temp_dir = TempDir::new().unwrap();
        let vs = versions_with(&temp_dir, &["new_cf", "new_cf2"]);

        let resolved = resolve_descriptors(
            &vs,
            AccessMode::ReadOnly,
            &descriptors(&["new_cf2", "default"]),
            false,
        )
        .unwrap();

        let ids: Vec<Option<u32>> = resolved.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(2), Some(0)]);
    }

    #[test]
    fn test_read_only_unknown_family() {
        let temp_dir = TempDir::new().unwrap();
        let vs = versions_with(&temp_dir, &[]);

        for create_missing in [false, true] {
            let err = resolve_descriptors(
                &vs,
                AccessMode::ReadOnly,
                &descriptors(&["default", "new_cf2"]),
                create_missing,
            )
            .unwrap_err();
            assert!(err.is_unknown_column_family());
        }
    }

    #[test]
    fn test_read_write_create_missing() {
        let temp_dir = TempDir::new().unwrap();
        let vs = versions_with(&temp_dir, &[]);
        let request = descriptors(&["default", "users"]);

        let err = resolve_descriptors(&vs, AccessMode::ReadWrite, &request, false).unwrap_err();
        assert!(err.is_unknown_column_family());

        let resolved = resolve_descriptors(&vs, AccessMode::ReadWrite, &request, true).unwrap();
        assert_eq!(resolved[1].id, None);
    }

    #[test]
    fn test_read_write_must_open_all() {
        let temp_dir = TempDir::new().unwrap();
        let vs = versions_with(&temp_dir, &["new_cf"]);

        let err = resolve_descriptors(
            &vs,
            AccessMode::ReadWrite,
            &descriptors(&["default"]),
            false,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.message().unwrap().contains("new_cf"));
    }

    #[test]
    fn test_malformed_descriptor_lists() {
        let temp_dir = TempDir::new().unwrap();
        let vs = versions_with(&temp_dir, &["new_cf"]);

        for request in [
            descriptors(&[]),
            descriptors(&["new_cf"]),
            descriptors(&["default", "default"]),
        ] {
            for mode in [AccessMode::ReadOnly, AccessMode::ReadWrite] {
                let err = resolve_descriptors(&vs, mode, &request, true).unwrap_err();
                assert!(err.is_invalid_argument(), "{request:?} {mode:?}");
            }
        }
    }
}
