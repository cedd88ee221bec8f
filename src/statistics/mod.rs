use std::sync::atomic::{AtomicU64, Ordering};

/// Per-DB statistics
///
/// Thread-safe counters updated with relaxed atomics. Each `DB` instance
/// has its own; a read-only handle only ever counts reads and rejections.
#[derive(Debug, Default)]
pub struct Statistics {
    pub num_keys_written: AtomicU64,
    pub num_keys_read: AtomicU64,
    pub num_keys_deleted: AtomicU64,
    pub num_batches_written: AtomicU64,

    pub bytes_written: AtomicU64,
    pub bytes_read: AtomicU64,

    pub memtable_hits: AtomicU64,
    pub memtable_misses: AtomicU64,
    pub num_memtable_flushes: AtomicU64,
    pub bytes_flushed: AtomicU64,

    pub wal_writes: AtomicU64,
    pub wal_syncs: AtomicU64,
    pub wal_bytes_written: AtomicU64,
    pub wal_records_recovered: AtomicU64,

    pub table_reads: AtomicU64,
    pub table_hits: AtomicU64,
    pub table_misses: AtomicU64,

    /// Mutations turned away because the handle is read-only
    pub read_only_rejections: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    #[inline]
    pub fn record_write(&self, bytes: u64) {
        self.num_keys_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read(&self, bytes: u64) {
        self.num_keys_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delete(&self) {
        self.num_keys_deleted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_batch(&self) {
        self.num_batches_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_memtable_hit(&self) {
        self.memtable_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_memtable_miss(&self) {
        self.memtable_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_memtable_flush(&self, bytes: u64) {
        self.num_memtable_flushes.fetch_add(1, Ordering::Relaxed);
        self.bytes_flushed.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_wal_write(&self, bytes: u64) {
        self.wal_writes.fetch_add(1, Ordering::Relaxed);
        self.wal_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_wal_sync(&self) {
        self.wal_syncs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_wal_recovered(&self, records: u64) {
        self.wal_records_recovered
            .fetch_add(records, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_table_read(&self, hit: bool) {
        self.table_reads.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.table_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.table_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_read_only_rejection(&self) {
        self.read_only_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn memtable_hit_rate(&self) -> f64 {
        let hits = self.memtable_hits.load(Ordering::Relaxed);
        let misses = self.memtable_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.num_keys_written,
            &self.num_keys_read,
            &self.num_keys_deleted,
            &self.num_batches_written,
            &self.bytes_written,
            &self.bytes_read,
            &self.memtable_hits,
            &self.memtable_misses,
            &self.num_memtable_flushes,
            &self.bytes_flushed,
            &self.wal_writes,
            &self.wal_syncs,
            &self.wal_bytes_written,
            &self.wal_records_recovered,
            &self.table_reads,
            &self.table_hits,
            &self.table_misses,
            &self.read_only_rejections,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        writeln!(f, "** DB Statistics **")?;
        writeln!(
            f,
            "Keys: {} written, {} read, {} deleted, {} batches",
            load(&self.num_keys_written),
            load(&self.num_keys_read),
            load(&self.num_keys_deleted),
            load(&self.num_batches_written)
        )?;
        writeln!(
            f,
            "MemTable: {} hits, {} misses ({:.1}% hit rate), {} flushes ({} bytes)",
            load(&self.memtable_hits),
            load(&self.memtable_misses),
            self.memtable_hit_rate() * 100.0,
            load(&self.num_memtable_flushes),
            load(&self.bytes_flushed)
        )?;
        writeln!(
            f,
            "WAL: {} writes, {} syncs, {} bytes, {} records recovered",
            load(&self.wal_writes),
            load(&self.wal_syncs),
            load(&self.wal_bytes_written),
            load(&self.wal_records_recovered)
        )?;
        writeln!(
            f,
            "Tables: {} reads, {} hits, {} misses",
            load(&self.table_reads),
            load(&self.table_hits),
            load(&self.table_misses)
        )?;
        write!(
            f,
            "Read-only rejections: {}",
            load(&self.read_only_rejections)
        )
    }
}
