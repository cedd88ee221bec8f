use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use crate::{
    util::{Result, Status},
    wal::log_format::{BLOCK_SIZE, HEADER_SIZE, RecordType, calculate_checksum, encode_header},
};

/// Appends framed records to a log file.
///
/// Opening an existing file continues in the block the file ends in, so a
/// MANIFEST can be appended to across opens.
pub struct Writer {
    file: File,
    /// Bytes in the file, including what this writer appended
    offset: usize,
    /// Position inside the current block
    block_offset: usize,
}

impl Writer {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|e| {
                Status::io_error(format!(
                    "Failed to open log file {}: {e}",
                    path.as_ref().display()
                ))
            })?;

        let offset = file
            .metadata()
            .map_err(|e| Status::io_error(format!("Failed to stat log file: {e}")))?
            .len() as usize;

        Ok(Writer {
            file,
            offset,
            block_offset: offset % BLOCK_SIZE,
        })
    }

    /// Append one logical record. The record is written with a single
    /// `write_all` so a crash leaves at most one torn record at the tail.
    pub fn add_record(&mut self, data: &[u8]) -> Result<()> {
        let mut out = Vec::with_capacity(data.len() + HEADER_SIZE * 2);
        let mut rest = data;
        let mut is_first = true;

        loop {
            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                out.resize(out.len() + leftover, 0);
                self.block_offset = 0;
            }

            let avail = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let fragment_len = rest.len().min(avail);
            let is_last = fragment_len == rest.len();
            let record_type = RecordType::for_fragment(is_first, is_last);

            let (fragment, tail) = rest.split_at(fragment_len);
            let checksum = calculate_checksum(record_type, fragment);
            out.extend_from_slice(&encode_header(checksum, fragment_len as u16, record_type));
            out.extend_from_slice(fragment);
            self.block_offset += HEADER_SIZE + fragment_len;

            rest = tail;
            is_first = false;
            if is_last {
                break;
            }
        }

        self.file
            .write_all(&out)
            .map_err(|e| Status::io_error(format!("Log append failed: {e}")))?;
        self.offset += out.len();
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .map_err(|e| Status::io_error(format!("Log sync failed: {e}")))
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}
