use std::{fs, path::Path};

use crate::{
    util::{Result, Status},
    wal::log_format::{BLOCK_SIZE, HEADER_SIZE, RecordType, calculate_checksum, decode_header},
};

/// How damage at the end of a log is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Any malformed fragment is corruption.
    AbsoluteConsistency,
    /// A malformed or incomplete record at the very end of the file is
    /// treated as end of log. This is what a reader sees when a writer was
    /// killed, or is still running, in the middle of an append.
    TolerateCorruptedTail,
}

/// Reads framed records back from a log file.
///
/// The file is read into memory when the reader is created, so the reader
/// sees the log as it was at that moment even if a writer keeps appending.
pub struct Reader {
    data: Vec<u8>,
    offset: usize,
    mode: RecoveryMode,
}

enum Fragment {
    Record(RecordType, Vec<u8>),
    Eof,
}

impl Reader {
    pub fn new<P: AsRef<Path>>(path: P, mode: RecoveryMode) -> Result<Self> {
        let data = fs::read(path.as_ref()).map_err(|e| {
            Status::io_error(format!(
                "Failed to read log file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Ok(Self::from_bytes(data, mode))
    }

    pub fn from_bytes(data: Vec<u8>, mode: RecoveryMode) -> Self {
        Reader {
            data,
            offset: 0,
            mode,
        }
    }

    /// Next logical record, `None` at end of log.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut assembled: Option<Vec<u8>> = None;

        loop {
            let (record_type, fragment) = match self.read_fragment()? {
                Fragment::Record(t, f) => (t, f),
                Fragment::Eof => {
                    if assembled.is_some() {
                        return self.tail_damage("incomplete fragmented record at end of log");
                    }
                    return Ok(None);
                },
            };

            match (record_type, assembled.as_mut()) {
                (RecordType::Full, None) => return Ok(Some(fragment)),
                (RecordType::First, None) => assembled = Some(fragment),
                (RecordType::Middle, Some(buf)) => buf.extend_from_slice(&fragment),
                (RecordType::Last, Some(buf)) => {
                    buf.extend_from_slice(&fragment);
                    return Ok(assembled);
                },
                (t, _) => {
                    return Err(Status::corruption(format!(
                        "Unexpected {t:?} fragment at offset {}",
                        self.offset
                    )));
                },
            }
        }
    }

    fn read_fragment(&mut self) -> Result<Fragment> {
        loop {
            let block_left = BLOCK_SIZE - self.offset % BLOCK_SIZE;
            if block_left < HEADER_SIZE {
                self.offset += block_left;
                continue;
            }

            let remaining = self.data.len().saturating_sub(self.offset);
            if remaining == 0 {
                return Ok(Fragment::Eof);
            }
            if remaining < HEADER_SIZE {
                return self.tail_damage("truncated fragment header");
            }

            let (checksum, length, type_byte) =
                decode_header(&self.data[self.offset..self.offset + HEADER_SIZE]);
            let length = length as usize;
            let start = self.offset + HEADER_SIZE;

            if start + length > self.data.len() {
                return self.tail_damage("truncated fragment data");
            }

            let Some(record_type) = RecordType::from_u8(type_byte) else {
                if start + length == self.data.len() {
                    return self.tail_damage("unknown fragment type");
                }
                return Err(Status::corruption(format!(
                    "Unknown fragment type {type_byte} at offset {}",
                    self.offset
                )));
            };

            let fragment = &self.data[start..start + length];
            if calculate_checksum(record_type, fragment) != checksum {
                if start + length == self.data.len() {
                    return self.tail_damage("checksum mismatch in last fragment");
                }
                return Err(Status::corruption(format!(
                    "Checksum mismatch at offset {}",
                    self.offset
                )));
            }

            let fragment = fragment.to_vec();
            self.offset = start + length;
            return Ok(Fragment::Record(record_type, fragment));
        }
    }

    fn tail_damage<T: Default>(&mut self, what: &str) -> Result<T> {
        match self.mode {
            RecoveryMode::TolerateCorruptedTail => {
                log::debug!("ignoring {what} at log offset {}", self.offset);
                self.offset = self.data.len();
                Ok(T::default())
            },
            RecoveryMode::AbsoluteConsistency => Err(Status::corruption(format!(
                "{what} at offset {}",
                self.offset
            ))),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment::Eof
    }
}
