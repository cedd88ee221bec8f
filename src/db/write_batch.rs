use crate::{
    column_family::ColumnFamilyHandle,
    memtable::ValueKind,
    util::{
        Result, Slice, Status,
        coding::{Decoder, put_fixed32, put_fixed64, put_length_prefixed},
    },
};

/// Size of the batch header: first sequence(8) + count(4)
const HEADER_SIZE: usize = 12;

/// Write operation type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: Slice, value: Slice },
    Delete { key: Slice },
}

/// WriteBatch accumulates mutations across column families for atomic
/// execution.
///
/// Each operation is tagged with the id of the column family it targets.
/// A batch is applied as one WAL record, and on a read-only `DB` it is
/// rejected as a whole before anything is applied.
///
/// Record layout:
///
/// ```text
/// first_sequence(8) count(4) { kind(1) cf_id(4) key [value] }*
/// ```
///
/// where `key` and `value` are length-prefixed and `value` is present only
/// for puts. Operation `i` gets sequence `first_sequence + i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    /// Operations in insertion order
    ops: Vec<(u32, WriteOp)>,
    /// Sum of key and value sizes
    data_size: usize,
}

impl WriteBatch {
    #[inline]
    pub fn new() -> Self {
        WriteBatch::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        WriteBatch {
            ops: Vec::with_capacity(capacity),
            data_size: 0,
        }
    }

    /// Put into the default column family.
    pub fn put(&mut self, key: Slice, value: Slice) {
        self.put_in(0, key, value);
    }

    pub fn put_cf(&mut self, cf: &ColumnFamilyHandle, key: Slice, value: Slice) {
        self.put_in(cf.id(), key, value);
    }

    /// Delete from the default column family.
    pub fn delete(&mut self, key: Slice) {
        self.delete_in(0, key);
    }

    pub fn delete_cf(&mut self, cf: &ColumnFamilyHandle, key: Slice) {
        self.delete_in(cf.id(), key);
    }

    pub(crate) fn put_in(&mut self, cf_id: u32, key: Slice, value: Slice) {
        self.data_size += key.size() + value.size();
        self.ops.push((cf_id, WriteOp::Put { key, value }));
    }

    pub(crate) fn delete_in(&mut self, cf_id: u32, key: Slice) {
        self.data_size += key.size();
        self.ops.push((cf_id, WriteOp::Delete { key }));
    }

    #[inline]
    pub fn ops(&self) -> &[(u32, WriteOp)] {
        &self.ops
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Encode as a WAL record whose first operation gets `first_sequence`.
    pub fn encode(&self, first_sequence: u64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.data_size + self.ops.len() * 13);
        put_fixed64(&mut buf, first_sequence);
        put_fixed32(&mut buf, self.ops.len() as u32);

        for (cf_id, op) in &self.ops {
            match op {
                WriteOp::Put { key, value } => {
                    buf.push(ValueKind::Value as u8);
                    put_fixed32(&mut buf, *cf_id);
                    put_length_prefixed(&mut buf, key.data());
                    put_length_prefixed(&mut buf, value.data());
                },
                WriteOp::Delete { key } => {
                    buf.push(ValueKind::Deletion as u8);
                    put_fixed32(&mut buf, *cf_id);
                    put_length_prefixed(&mut buf, key.data());
                },
            }
        }
        buf
    }

    /// Decode a WAL record into its first sequence and the batch.
    pub fn decode(data: &[u8]) -> Result<(u64, WriteBatch)> {
        let mut decoder = Decoder::new(data, "write batch");
        let first_sequence = decoder.get_fixed64()?;
        let count = decoder.get_fixed32()? as usize;

        let mut batch = WriteBatch::with_capacity(count.min(decoder.remaining()));
        for _ in 0..count {
            let kind = ValueKind::from_u8(decoder.get_u8()?)?;
            let cf_id = decoder.get_fixed32()?;
            let key = Slice::from(decoder.get_length_prefixed()?);
            match kind {
                ValueKind::Value => {
                    let value = Slice::from(decoder.get_length_prefixed()?);
                    batch.put_in(cf_id, key, value);
                },
                ValueKind::Deletion => batch.delete_in(cf_id, key),
            }
        }

        if !decoder.is_empty() {
            return Err(Status::corruption(format!(
                "write batch: {} trailing bytes",
                decoder.remaining()
            )));
        }
        Ok((first_sequence, batch))
    }
}
