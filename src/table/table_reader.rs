use std::{fs, path::Path};

use crate::{
    compression,
    memtable::{InternalKey, LookupResult, MAX_SEQUENCE, ValueKind},
    table::format::{FOOTER_SIZE, Footer},
    util::{Result, Slice, Status, coding::Decoder},
};

/// An opened table file. The data block is checked and decoded once at
/// open time; lookups are binary searches over the decoded entries.
pub struct TableReader {
    file_number: u64,
    entries: Vec<(InternalKey, Slice)>,
}

impl TableReader {
    pub fn open<P: AsRef<Path>>(path: P, file_number: u64) -> Result<Self> {
        let data = fs::read(path.as_ref()).map_err(|e| {
            Status::io_error(format!(
                "Failed to read table {}: {e}",
                path.as_ref().display()
            ))
        })?;

        if data.len() < FOOTER_SIZE {
            return Err(Status::corruption(format!(
                "Table {file_number} is too short"
            )));
        }

        let (body, footer) = data.split_at(data.len() - FOOTER_SIZE);
        let footer = Footer::decode(footer)?;
        if footer.block_size != body.len() as u64 {
            return Err(Status::corruption(format!(
                "Table {file_number}: block size mismatch"
            )));
        }
        if crc32fast::hash(body) != footer.checksum {
            return Err(Status::corruption(format!(
                "Table {file_number}: block checksum mismatch"
            )));
        }

        let block = compression::decompress(footer.compression, body)?;
        let mut dec = Decoder::new(&block, "table entry");
        // num_entries is not covered by the checksum.
        let mut entries = Vec::with_capacity((footer.num_entries as usize).min(block.len()));
        while !dec.is_empty() {
            let user_key = Slice::from(dec.get_length_prefixed()?);
            let sequence = dec.get_fixed64()?;
            let kind = ValueKind::from_u8(dec.get_u8()?)?;
            let value = Slice::from(dec.get_length_prefixed()?);
            entries.push((InternalKey::new(user_key, sequence, kind), value));
        }

        if entries.len() as u64 != footer.num_entries {
            return Err(Status::corruption(format!(
                "Table {file_number}: expected {} entries, found {}",
                footer.num_entries,
                entries.len()
            )));
        }

        Ok(TableReader {
            file_number,
            entries,
        })
    }

    pub fn get(&self, key: &Slice) -> LookupResult {
        let target = InternalKey::lookup(key.clone(), MAX_SEQUENCE);
        let idx = self.entries.partition_point(|(k, _)| *k < target);
        match self.entries.get(idx) {
            Some((k, v)) if k.user_key == *key => LookupResult::from_entry(k.kind, v.clone()),
            _ => LookupResult::NotFound,
        }
    }

    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }
}
