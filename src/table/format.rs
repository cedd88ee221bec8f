/// Table file format
///
/// A table file holds the flushed contents of one memtable of one column
/// family: a single data block followed by a fixed-size footer.
///
/// File layout:
/// - Data block (possibly compressed)
/// - Footer (29 bytes)
///
/// Data block entry (before compression):
/// - User key length (4 bytes) + user key
/// - Sequence number (8 bytes)
/// - Value kind (1 byte: 0 = deletion, 1 = value)
/// - Value length (4 bytes) + value
///
/// Footer:
/// - Compression type (1 byte)
/// - Data block size on disk (8 bytes)
/// - Number of entries (8 bytes)
/// - CRC32 of the on-disk data block (4 bytes)
/// - Magic number (8 bytes: 0x88e3f3fb2af1ecd7)
use serde::{Deserialize, Serialize};

use crate::util::{
    Result, Status,
    coding::{Decoder, put_fixed32, put_fixed64},
};

pub const FOOTER_SIZE: usize = 29;

pub const MAGIC_NUMBER: u64 = 0x88e3f3fb2af1ecd7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressionType {
    None = 0,
    Snappy = 1,
    Lz4 = 2,
}

impl CompressionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Snappy),
            2 => Some(CompressionType::Lz4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub compression: CompressionType,
    pub block_size: u64,
    pub num_entries: u64,
    pub checksum: u32,
}

impl Footer {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FOOTER_SIZE);
        buf.push(self.compression as u8);
        put_fixed64(&mut buf, self.block_size);
        put_fixed64(&mut buf, self.num_entries);
        put_fixed32(&mut buf, self.checksum);
        put_fixed64(&mut buf, MAGIC_NUMBER);
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != FOOTER_SIZE {
            return Err(Status::corruption("Table footer has wrong size"));
        }

        let mut dec = Decoder::new(data, "table footer");
        let compression = CompressionType::from_u8(dec.get_u8()?)
            .ok_or_else(|| Status::corruption("Unknown table compression type"))?;
        let block_size = dec.get_fixed64()?;
        let num_entries = dec.get_fixed64()?;
        let checksum = dec.get_fixed32()?;
        if dec.get_fixed64()? != MAGIC_NUMBER {
            return Err(Status::corruption("Bad table magic number"));
        }

        Ok(Footer {
            compression,
            block_size,
            num_entries,
            checksum,
        })
    }
}
