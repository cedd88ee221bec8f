use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::{
    column_family::{
        ColumnFamilyData, ColumnFamilyDescriptor, ColumnFamilyHandle, ColumnFamilyOptions,
        ColumnFamilySet, DEFAULT_COLUMN_FAMILY_NAME, ResolvedFamily, resolve_descriptors,
    },
    db::{
        AccessMode, DBOptions, ReadOptions, WriteBatch, WriteOp, WriteOptions,
        access_mode::{Mutation, MutationGuard},
        dir_lock::DirLock,
    },
    filename,
    memtable::LookupResult,
    options_file,
    statistics::Statistics,
    table::{TableBuilder, TableReader},
    util::{Result, Slice, Status},
    version::{FileMetaData, VersionEdit, VersionSet},
    wal::{self, RecoveryMode},
};

/// Instance ids, so column family handles can be tied to their DB.
static NEXT_DB_ID: AtomicU64 = AtomicU64::new(1);

/// An open database directory.
///
/// A `DB` is opened either read-write or read-only and keeps that mode for
/// its whole life. Read-only instances serve point reads from what the
/// directory held when they were opened and reject every mutation with
/// `ReadOnlyViolation`.
///
/// ```text
/// put/delete/write ──→ MutationGuard ──→ WAL ──→ MemTable
///                                                   │ flush
/// get ──→ MemTable ──→ tables (newest first)  ←─────┘
/// ```
///
/// Any number of read-only instances can share a directory with at most
/// one read-write instance.
pub struct DB {
    id: u64,
    db_path: PathBuf,
    options: DBOptions,
    guard: MutationGuard,
    /// Persisted registry of column families and files
    versions: Mutex<VersionSet>,
    /// Column families opened by this instance
    column_families: ColumnFamilySet,
    /// Live WAL. `None` for read-only instances and after close. Writers
    /// hold this lock for the whole write, which serializes them.
    wal: Mutex<Option<wal::Writer>>,
    dir_lock: Mutex<Option<DirLock>>,
    closed: AtomicBool,
    live_handles: Arc<AtomicUsize>,
    statistics: Arc<Statistics>,
}

impl DB {
    /// Open read-write with only the default column family.
    pub fn open<P: AsRef<Path>>(path: P, options: DBOptions) -> Result<Self> {
        let descriptors = vec![ColumnFamilyDescriptor::new(
            DEFAULT_COLUMN_FAMILY_NAME,
            options.default_cf_options(),
        )];
        let (db, _handles) = Self::open_with_column_families(path, options, descriptors)?;
        Ok(db)
    }

    /// Open read-write. Every column family in the directory must be
    /// listed; handles are returned in the order of `descriptors`.
    pub fn open_with_column_families<P: AsRef<Path>>(
        path: P,
        options: DBOptions,
        descriptors: Vec<ColumnFamilyDescriptor>,
    ) -> Result<(Self, Vec<ColumnFamilyHandle>)> {
        let db_path = path.as_ref();

        if options.create_if_missing {
            fs::create_dir_all(db_path)
                .map_err(|e| Status::io_error(format!("Failed to create directory: {e}")))?;
        }

        let exists = filename::current_file_name(db_path).exists();
        if exists && options.error_if_exists {
            return Err(Status::invalid_argument(format!(
                "{}: database already exists",
                db_path.display()
            )));
        }
        if !exists && !options.create_if_missing {
            return Err(Status::invalid_argument(format!(
                "{}: does not exist (create_if_missing is false)",
                db_path.display()
            )));
        }

        let dir_lock = DirLock::acquire(db_path)?;

        let versions = if exists {
            VersionSet::recover_for_write(db_path)?
        } else {
            VersionSet::create(db_path)?
        };
        let resolved = resolve_descriptors(
            &versions,
            AccessMode::ReadWrite,
            &descriptors,
            options.create_missing_column_families,
        )?;

        let db = DB::new(db_path, options, AccessMode::ReadWrite, versions);
        *db.dir_lock.lock() = Some(dir_lock);

        let ids = db.create_missing_families(&resolved)?;
        db.load_families(&resolved, &ids)?;
        db.replay_wal()?;

        {
            let mut wal = db.wal.lock();
            db.flush_locked(&mut wal)?;
        }
        db.write_options_file()?;

        log::info!(
            "opened {} read-write with {} column families",
            db.db_path.display(),
            db.column_families.count()
        );
        let handles = db.handles_for(&resolved, &ids);
        Ok((db, handles))
    }

    /// Open read-only with only the default column family.
    pub fn open_for_read_only<P: AsRef<Path>>(path: P, options: DBOptions) -> Result<Self> {
        let descriptors = vec![ColumnFamilyDescriptor::new(
            DEFAULT_COLUMN_FAMILY_NAME,
            options.default_cf_options(),
        )];
        let (db, _handles) =
            Self::open_for_read_only_with_column_families(path, options, descriptors)?;
        Ok(db)
    }

    /// Open read-only. Every requested column family must already exist; any
    /// subset including `"default"` may be requested. Nothing in the
    /// directory is created, modified or locked.
    pub fn open_for_read_only_with_column_families<P: AsRef<Path>>(
        path: P,
        options: DBOptions,
        descriptors: Vec<ColumnFamilyDescriptor>,
    ) -> Result<(Self, Vec<ColumnFamilyHandle>)> {
        let db_path = path.as_ref();

        let versions = VersionSet::recover(db_path)?;
        let resolved = resolve_descriptors(&versions, AccessMode::ReadOnly, &descriptors, false)?;
        let ids = resolved
            .iter()
            .map(|r| {
                r.id.ok_or_else(|| Status::unknown_column_family(&r.descriptor.name))
            })
            .collect::<Result<Vec<u32>>>()?;

        let db = DB::new(db_path, options, AccessMode::ReadOnly, versions);
        db.load_families(&resolved, &ids)?;
        db.replay_wal()?;

        log::info!(
            "opened {} read-only with column families [{}]",
            db.db_path.display(),
            resolved
                .iter()
                .map(|r| r.descriptor.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let handles = db.handles_for(&resolved, &ids);
        Ok((db, handles))
    }

    /// Names of the column families recorded in a directory, default first,
    /// without opening it.
    pub fn list_column_families<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let versions = VersionSet::recover(path.as_ref())?;
        Ok(versions
            .column_families()
            .map(|(_, cf)| cf.name.clone())
            .collect())
    }

    fn new(db_path: &Path, options: DBOptions, mode: AccessMode, versions: VersionSet) -> Self {
        DB {
            id: NEXT_DB_ID.fetch_add(1, Ordering::Relaxed),
            db_path: db_path.to_path_buf(),
            options,
            guard: MutationGuard::new(mode),
            versions: Mutex::new(versions),
            column_families: ColumnFamilySet::new(),
            wal: Mutex::new(None),
            dir_lock: Mutex::new(None),
            closed: AtomicBool::new(false),
            live_handles: Arc::new(AtomicUsize::new(0)),
            statistics: Arc::new(Statistics::new()),
        }
    }

    /// Record the requested families the MANIFEST does not know yet.
    /// Returns the id of every requested family, index-aligned.
    fn create_missing_families(&self, resolved: &[ResolvedFamily]) -> Result<Vec<u32>> {
        let mut versions = self.versions.lock();
        let mut ids = Vec::with_capacity(resolved.len());
        for r in resolved {
            let id = match r.id {
                Some(id) => id,
                None => {
                    let id = versions.next_column_family_id();
                    let mut edit = VersionEdit::new();
                    edit.create_column_family(id, r.descriptor.name.clone());
                    edit.set_max_column_family(id);
                    versions.log_and_apply(edit)?;
                    log::info!("created column family '{}' (id {id}) on open", r.descriptor.name);
                    id
                },
            };
            ids.push(id);
        }
        Ok(ids)
    }

    /// Set up runtime state for the requested families and open their
    /// table files.
    fn load_families(&self, resolved: &[ResolvedFamily], ids: &[u32]) -> Result<()> {
        let versions = self.versions.lock();
        for (r, &id) in resolved.iter().zip(ids) {
            let cf = ColumnFamilyData::new(
                id,
                r.descriptor.name.clone(),
                r.descriptor.options.clone(),
            );
            for file in versions.files(id) {
                let path = filename::table_file_name(&self.db_path, file.number);
                cf.add_table(Arc::new(TableReader::open(&path, file.number)?));
            }
            log::debug!(
                "column family '{}' (id {id}): {} table files",
                cf.name(),
                cf.num_tables()
            );
            self.column_families.insert(Arc::new(cf))?;
        }
        Ok(())
    }

    /// Replay the live WAL into the MemTables of the open families.
    /// Records of families this instance did not open are skipped.
    fn replay_wal(&self) -> Result<()> {
        let mut versions = self.versions.lock();
        let log_number = versions.log_number();
        if log_number == 0 {
            return Ok(());
        }

        let path = filename::log_file_name(&self.db_path, log_number);
        let mut reader = match wal::Reader::new(&path, RecoveryMode::TolerateCorruptedTail) {
            Ok(reader) => reader,
            Err(e) if e.is_io_error() && !path.exists() => {
                // A writer flushed and removed it after we read the MANIFEST.
                log::warn!(
                    "WAL {} named by the MANIFEST is gone, reading without it",
                    path.display()
                );
                return Ok(());
            },
            Err(e) => return Err(e),
        };

        let mut records = 0;
        let mut skipped = 0;
        let mut max_sequence = versions.last_sequence();
        while let Some(record) = reader.read_record()? {
            let (first_sequence, batch) = WriteBatch::decode(&record)?;
            for (i, (cf_id, op)) in batch.ops().iter().enumerate() {
                let sequence = first_sequence + i as u64;
                max_sequence = max_sequence.max(sequence);
                let Some(cf) = self.column_families.get(*cf_id) else {
                    skipped += 1;
                    continue;
                };
                match op {
                    WriteOp::Put { key, value } => {
                        cf.mem().add(sequence, key.clone(), value.clone())
                    },
                    WriteOp::Delete { key } => cf.mem().delete(sequence, key.clone()),
                }
            }
            records += 1;
        }
        versions.set_last_sequence(max_sequence);
        self.statistics.record_wal_recovered(records);

        log::debug!(
            "replayed {records} records from {}, skipped {skipped} entries of unopened column families, last sequence {max_sequence}",
            path.display()
        );
        Ok(())
    }

    fn handles_for(&self, resolved: &[ResolvedFamily], ids: &[u32]) -> Vec<ColumnFamilyHandle> {
        resolved
            .iter()
            .zip(ids)
            .map(|(r, &id)| self.make_handle(id, r.descriptor.name.clone()))
            .collect()
    }

    fn make_handle(&self, id: u32, name: String) -> ColumnFamilyHandle {
        ColumnFamilyHandle::new(id, name, self.id, Arc::clone(&self.live_handles))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Status::invalid_argument("DB is closed"));
        }
        Ok(())
    }

    /// Look up the runtime state behind a handle issued by this instance.
    fn cf_data(&self, handle: &ColumnFamilyHandle) -> Result<Arc<ColumnFamilyData>> {
        if handle.db_id != self.id {
            return Err(Status::invalid_argument(format!(
                "Column family handle '{}' belongs to another DB instance",
                handle.name
            )));
        }
        self.column_families.get(handle.id).ok_or_else(|| {
            Status::invalid_argument(format!(
                "Column family '{}' has been dropped",
                handle.name
            ))
        })
    }

    #[inline]
    pub fn put(&self, options: &WriteOptions, key: Slice, value: Slice) -> Result<()> {
        self.guard.check(Mutation::Put, &self.statistics)?;
        self.ensure_open()?;
        let mut batch = WriteBatch::with_capacity(1);
        batch.put_in(0, key, value);
        self.write_batch(options, &batch)
    }

    pub fn put_cf(
        &self,
        options: &WriteOptions,
        cf_handle: &ColumnFamilyHandle,
        key: Slice,
        value: Slice,
    ) -> Result<()> {
        self.guard.check(Mutation::Put, &self.statistics)?;
        self.ensure_open()?;
        let cf = self.cf_data(cf_handle)?;
        let mut batch = WriteBatch::with_capacity(1);
        batch.put_in(cf.id(), key, value);
        self.write_batch(options, &batch)
    }

    #[inline]
    pub fn delete(&self, options: &WriteOptions, key: Slice) -> Result<()> {
        self.guard.check(Mutation::Delete, &self.statistics)?;
        self.ensure_open()?;
        let mut batch = WriteBatch::with_capacity(1);
        batch.delete_in(0, key);
        self.write_batch(options, &batch)
    }

    pub fn delete_cf(
        &self,
        options: &WriteOptions,
        cf_handle: &ColumnFamilyHandle,
        key: Slice,
    ) -> Result<()> {
        self.guard.check(Mutation::Delete, &self.statistics)?;
        self.ensure_open()?;
        let cf = self.cf_data(cf_handle)?;
        let mut batch = WriteBatch::with_capacity(1);
        batch.delete_in(cf.id(), key);
        self.write_batch(options, &batch)
    }

    /// Apply a batch atomically. On a read-only instance the whole batch
    /// is rejected, whatever column families it names.
    pub fn write(&self, options: &WriteOptions, batch: &WriteBatch) -> Result<()> {
        self.guard.check(Mutation::Write, &self.statistics)?;
        self.ensure_open()?;
        self.write_batch(options, batch)
    }

    fn write_batch(&self, options: &WriteOptions, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Resolve every target before the WAL sees the batch.
        let targets = batch
            .ops()
            .iter()
            .map(|(cf_id, _)| {
                self.column_families.get(*cf_id).ok_or_else(|| {
                    Status::invalid_argument(format!("Column family id {cf_id} is not open"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut wal = self.wal.lock();
        let writer = wal
            .as_mut()
            .ok_or_else(|| Status::invalid_argument("DB is closed"))?;

        let first_sequence = self.versions.lock().last_sequence() + 1;
        let record = batch.encode(first_sequence);
        writer.add_record(&record)?;
        self.statistics.record_wal_write(record.len() as u64);
        if options.sync {
            writer.sync()?;
            self.statistics.record_wal_sync();
        }

        for (i, ((_, op), cf)) in batch.ops().iter().zip(&targets).enumerate() {
            let sequence = first_sequence + i as u64;
            match op {
                WriteOp::Put { key, value } => {
                    self.statistics
                        .record_write((key.size() + value.size()) as u64);
                    cf.mem().add(sequence, key.clone(), value.clone());
                },
                WriteOp::Delete { key } => {
                    self.statistics.record_delete();
                    cf.mem().delete(sequence, key.clone());
                },
            }
        }
        self.versions
            .lock()
            .set_last_sequence(first_sequence + batch.count() as u64 - 1);
        self.statistics.record_batch();

        // The batch is committed; a failed flush leaves it in the WAL.
        if targets.iter().any(|cf| cf.should_flush())
            && let Err(e) = self.flush_locked(&mut wal)
        {
            log::warn!("automatic flush failed: {e}");
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, options: &ReadOptions, key: &Slice) -> Result<Option<Slice>> {
        self.ensure_open()?;
        let cf = self.column_families.default_cf()?;
        self.get_from(options, &cf, key)
    }

    pub fn get_cf(
        &self,
        options: &ReadOptions,
        cf_handle: &ColumnFamilyHandle,
        key: &Slice,
    ) -> Result<Option<Slice>> {
        self.ensure_open()?;
        let cf = self.cf_data(cf_handle)?;
        self.get_from(options, &cf, key)
    }

    fn get_from(
        &self,
        _options: &ReadOptions,
        cf: &ColumnFamilyData,
        key: &Slice,
    ) -> Result<Option<Slice>> {
        let (result, table) = cf.get(key);

        match table {
            None if result != LookupResult::NotFound => self.statistics.record_memtable_hit(),
            _ => self.statistics.record_memtable_miss(),
        }
        if table.is_some() {
            self.statistics.record_table_read(true);
        } else if result == LookupResult::NotFound && cf.num_tables() > 0 {
            self.statistics.record_table_read(false);
        }

        match result {
            LookupResult::Found(value) => {
                self.statistics.record_read(value.size() as u64);
                Ok(Some(value))
            },
            LookupResult::Deleted | LookupResult::NotFound => Ok(None),
        }
    }

    /// Write every non-empty MemTable to a table file and switch to a new
    /// WAL.
    pub fn flush(&self) -> Result<()> {
        self.guard.check(Mutation::Flush, &self.statistics)?;
        self.ensure_open()?;
        let mut wal = self.wal.lock();
        if wal.is_none() {
            return Err(Status::invalid_argument("DB is closed"));
        }
        self.flush_locked(&mut wal)
    }

    /// Caller holds the WAL lock, so no write can slip in between the
    /// MemTables being written out and the WAL being replaced.
    fn flush_locked(&self, wal: &mut Option<wal::Writer>) -> Result<()> {
        let mut versions = self.versions.lock();
        let old_log = versions.log_number();
        let new_log = versions.new_file_number();
        let new_writer = wal::Writer::new(filename::log_file_name(&self.db_path, new_log))?;

        let mut edit = VersionEdit::new();
        edit.set_log_number(new_log);

        let mut flushed = Vec::new();
        for cf in self.column_families.list() {
            let mem = cf.mem();
            if mem.is_empty() {
                continue;
            }

            let number = versions.new_file_number();
            let path = filename::table_file_name(&self.db_path, number);
            let mut builder = TableBuilder::new(&path, cf.options().compression_type);
            for (key, value) in mem.collect_entries() {
                builder.add(&key, &value)?;
            }
            let props = builder.finish()?;

            log::info!(
                "flushed column family '{}': {} entries to {} ({} bytes)",
                cf.name(),
                props.num_entries,
                path.display(),
                props.file_size
            );
            edit.add_file(
                cf.id(),
                FileMetaData::new(number, props.file_size, props.smallest, props.largest),
            );
            flushed.push((cf, path, number, props.file_size));
        }

        edit.set_last_sequence(versions.last_sequence());
        versions.log_and_apply(edit)?;

        for (cf, path, number, file_size) in flushed {
            cf.add_table(Arc::new(TableReader::open(&path, number)?));
            cf.switch_memtable();
            self.statistics.record_memtable_flush(file_size);
        }

        *wal = Some(new_writer);
        if old_log != 0 {
            match fs::remove_file(filename::log_file_name(&self.db_path, old_log)) {
                Ok(()) => {},
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => log::warn!("failed to remove WAL {old_log:06}.log: {e}"),
            }
        }
        Ok(())
    }

    /// Create a column family, recorded in the MANIFEST so later opens of
    /// either mode can find it by name.
    pub fn create_column_family(
        &self,
        name: &str,
        options: ColumnFamilyOptions,
    ) -> Result<ColumnFamilyHandle> {
        self.guard.check(Mutation::CreateColumnFamily, &self.statistics)?;
        self.ensure_open()?;

        let _wal = self.wal.lock();
        let id = {
            let mut versions = self.versions.lock();
            if versions.find_column_family(name).is_some() {
                return Err(Status::invalid_argument(format!(
                    "Column family '{name}' already exists"
                )));
            }
            let id = versions.next_column_family_id();
            let mut edit = VersionEdit::new();
            edit.create_column_family(id, name);
            edit.set_max_column_family(id);
            versions.log_and_apply(edit)?;
            id
        };

        self.column_families
            .insert(Arc::new(ColumnFamilyData::new(id, name.to_string(), options)))?;
        if let Err(e) = self.write_options_file() {
            log::warn!("failed to write OPTIONS after creating '{name}': {e}");
        }

        log::info!("created column family '{name}' (id {id})");
        Ok(self.make_handle(id, name.to_string()))
    }

    /// Drop a column family and delete its table files. The default
    /// family cannot be dropped.
    pub fn drop_column_family(&self, cf_handle: &ColumnFamilyHandle) -> Result<()> {
        self.guard.check(Mutation::DropColumnFamily, &self.statistics)?;
        self.ensure_open()?;
        let cf = self.cf_data(cf_handle)?;
        if cf.id() == 0 {
            return Err(Status::invalid_argument(
                "Default column family cannot be dropped",
            ));
        }

        let _wal = self.wal.lock();
        let files: Vec<u64> = {
            let mut versions = self.versions.lock();
            let files = versions.files(cf.id()).iter().map(|f| f.number).collect();
            let mut edit = VersionEdit::new();
            edit.drop_column_family(cf.id());
            versions.log_and_apply(edit)?;
            files
        };
        self.column_families.remove(cf.id());

        for number in files {
            if let Err(e) = fs::remove_file(filename::table_file_name(&self.db_path, number)) {
                log::warn!("failed to remove table {number:06}.sst: {e}");
            }
        }
        if let Err(e) = self.write_options_file() {
            log::warn!("failed to write OPTIONS after dropping '{}': {e}", cf.name());
        }

        log::info!("dropped column family '{}' (id {})", cf.name(), cf.id());
        Ok(())
    }

    fn write_options_file(&self) -> Result<()> {
        let number = self.versions.lock().new_file_number();
        let descriptors: Vec<ColumnFamilyDescriptor> = self
            .column_families
            .list()
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(cf.name(), cf.options().clone()))
            .collect();
        options_file::write_options_file(&self.db_path, number, &self.options, &descriptors)
    }

    /// Release a handle. Equivalent to dropping it.
    pub fn release_column_family_handle(&self, handle: ColumnFamilyHandle) {
        log::debug!("released handle of column family '{}'", handle.name);
        drop(handle);
    }

    /// Handle of the default column family.
    pub fn default_cf(&self) -> ColumnFamilyHandle {
        self.make_handle(0, DEFAULT_COLUMN_FAMILY_NAME.to_string())
    }

    /// Handles of every column family this instance has open, by id.
    pub fn column_families(&self) -> Vec<ColumnFamilyHandle> {
        self.column_families
            .list()
            .iter()
            .map(|cf| self.make_handle(cf.id(), cf.name().to_string()))
            .collect()
    }

    /// Close the database. Later calls return `Ok` and do nothing; every
    /// other operation fails with `InvalidArgument`.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let result = match self.wal.lock().take() {
            Some(mut writer) => writer.sync(),
            None => Ok(()),
        };
        self.dir_lock.lock().take();

        let live = self.live_handles.load(Ordering::Relaxed);
        if live > 0 {
            log::warn!(
                "closing {} with {live} column family handles still alive",
                self.db_path.display()
            );
        }
        log::info!("closed {} ({})", self.db_path.display(), self.mode());
        result
    }

    pub fn mode(&self) -> AccessMode {
        self.guard.mode()
    }

    pub fn is_read_only(&self) -> bool {
        self.mode().is_read_only()
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }
}

impl Drop for DB {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("error closing {}: {e}", self.db_path.display());
        }
    }
}
