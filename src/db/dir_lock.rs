use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use parking_lot::{Mutex, const_mutex};

use crate::{
    filename,
    util::{Result, Status},
};

/// Directories held by a read-write `DB` in this process.
static LOCKED_DIRS: Mutex<BTreeSet<PathBuf>> = const_mutex(BTreeSet::new());

/// Exclusive right to open a directory read-write, released on drop.
///
/// Read-only opens never take it, so any number of them can coexist with
/// one writer.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl DirLock {
    pub fn acquire(db_path: &Path) -> Result<Self> {
        let path = fs::canonicalize(db_path)?;

        if !LOCKED_DIRS.lock().insert(path.clone()) {
            return Err(Status::busy(format!(
                "{}: already opened read-write in this process",
                db_path.display()
            )));
        }
        let lock = DirLock { path };

        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(filename::lock_file_name(db_path))?;
        Ok(lock)
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        LOCKED_DIRS.lock().remove(&self.path);
    }
}
