use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    compression,
    memtable::InternalKey,
    table::format::{CompressionType, Footer},
    util::{
        Result, Slice, Status,
        coding::{put_fixed64, put_length_prefixed},
    },
};

/// What a finished table looks like, for the MANIFEST.
#[derive(Debug, Clone)]
pub struct TableProperties {
    pub file_size: u64,
    pub num_entries: u64,
    pub smallest: Slice,
    pub largest: Slice,
}

/// Writes a table file from entries supplied in internal key order.
pub struct TableBuilder {
    path: PathBuf,
    compression: CompressionType,
    block: Vec<u8>,
    num_entries: u64,
    last_key: Option<InternalKey>,
    smallest: Option<Slice>,
}

impl TableBuilder {
    pub fn new<P: AsRef<Path>>(path: P, compression: CompressionType) -> Self {
        TableBuilder {
            path: path.as_ref().to_path_buf(),
            compression,
            block: Vec::new(),
            num_entries: 0,
            last_key: None,
            smallest: None,
        }
    }

    pub fn add(&mut self, key: &InternalKey, value: &Slice) -> Result<()> {
        if let Some(last) = &self.last_key
            && key <= last
        {
            return Err(Status::invalid_argument(format!(
                "Table entries out of order: {:?} after {:?}",
                key.user_key, last.user_key
            )));
        }

        put_length_prefixed(&mut self.block, key.user_key.data());
        put_fixed64(&mut self.block, key.sequence);
        self.block.push(key.kind as u8);
        put_length_prefixed(&mut self.block, value.data());

        if self.smallest.is_none() {
            self.smallest = Some(key.user_key.clone());
        }
        self.last_key = Some(key.clone());
        self.num_entries += 1;
        Ok(())
    }

    /// Write the file and sync it. Empty tables are rejected; callers skip
    /// flushing empty memtables.
    pub fn finish(self) -> Result<TableProperties> {
        let (Some(smallest), Some(last)) = (self.smallest, self.last_key) else {
            return Err(Status::invalid_argument("Cannot build an empty table"));
        };

        let block = compression::compress(self.compression, &self.block)?;
        let footer = Footer {
            compression: self.compression,
            block_size: block.len() as u64,
            num_entries: self.num_entries,
            checksum: crc32fast::hash(&block),
        };

        let mut file = File::create(&self.path).map_err(|e| {
            Status::io_error(format!(
                "Failed to create table {}: {e}",
                self.path.display()
            ))
        })?;
        file.write_all(&block)?;
        file.write_all(&footer.encode())?;
        file.sync_all()?;

        Ok(TableProperties {
            file_size: (block.len() + crate::table::format::FOOTER_SIZE) as u64,
            num_entries: self.num_entries,
            smallest,
            largest: last.user_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::memtable::ValueKind;

    fn ikey(k: &str, seq: u64) -> InternalKey {
        InternalKey::new(Slice::from(k), seq, ValueKind::Value)
    }

    #[test]
    fn test_out_of_order_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut builder =
            TableBuilder::new(temp_dir.path().join("000001.sst"), CompressionType::None);

        builder.add(&ikey("b", 1), &Slice::from("v")).unwrap();
        let err = builder.add(&ikey("a", 2), &Slice::from("v")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_empty_table_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let builder = TableBuilder::new(temp_dir.path().join("000001.sst"), CompressionType::None);
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_properties() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("000001.sst");
        let mut builder = TableBuilder::new(&path, CompressionType::Snappy);

        builder.add(&ikey("apple", 3), &Slice::from("red")).unwrap();
        builder.add(&ikey("apple", 1), &Slice::from("green")).unwrap();
        builder.add(&ikey("pear", 2), &Slice::from("yellow")).unwrap();

        let props = builder.finish().unwrap();
        assert_eq!(props.num_entries, 3);
        assert_eq!(props.smallest, Slice::from("apple"));
        assert_eq!(props.largest, Slice::from("pear"));
        assert_eq!(props.file_size, std::fs::metadata(&path).unwrap().len());
    }
}
