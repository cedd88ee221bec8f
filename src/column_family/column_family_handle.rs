use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Handle to a Column Family
///
/// A handle belongs to the `DB` instance that created or resolved it and
/// is only accepted by that instance; another `DB` opened on the same
/// directory rejects it even if a family with the same name exists there.
///
/// Releasing a handle is dropping it. The owning `DB` counts live handles
/// so that closing it with handles still around can be reported.
///
/// # Example
///
/// ```ignore
/// let cf = db.create_column_family("users", ColumnFamilyOptions::default())?;
/// db.put_cf(&WriteOptions::default(), &cf, Slice::from("user1"), Slice::from("alice"))?;
/// db.release_column_family_handle(cf);
/// ```
pub struct ColumnFamilyHandle {
    pub(crate) id: u32,
    pub(crate) name: String,
    /// Instance id of the owning DB
    pub(crate) db_id: u64,
    live: Arc<AtomicUsize>,
}

impl ColumnFamilyHandle {
    pub(crate) fn new(id: u32, name: String, db_id: u64, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::Relaxed);
        ColumnFamilyHandle {
            id,
            name,
            db_id,
            live,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Clone for ColumnFamilyHandle {
    fn clone(&self) -> Self {
        ColumnFamilyHandle::new(
            self.id,
            self.name.clone(),
            self.db_id,
            Arc::clone(&self.live),
        )
    }
}

impl Drop for ColumnFamilyHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

impl PartialEq for ColumnFamilyHandle {
    fn eq(&self, other: &Self) -> bool {
        self.db_id == other.db_id && self.id == other.id
    }
}

impl Eq for ColumnFamilyHandle {}

impl Hash for ColumnFamilyHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.db_id.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for ColumnFamilyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnFamilyHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("db_id", &self.db_id)
            .finish()
    }
}
