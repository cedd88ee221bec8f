//! Little-endian encoding helpers shared by the WAL batch format, the
//! MANIFEST edits and table files.

use crate::util::{Result, Status};

pub fn put_fixed32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn put_fixed64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Length-prefixed (u32) byte string.
pub fn put_length_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    put_fixed32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

/// Cursor over an encoded buffer. Every read past the end is reported as
/// corruption with the caller supplied context.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], context: &'static str) -> Self {
        Decoder {
            data,
            pos: 0,
            context,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Status::corruption(format!(
                "{}: truncated at offset {}",
                self.context, self.pos
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_fixed32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn get_fixed64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn get_length_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.get_fixed32()? as usize;
        self.take(len)
    }

    pub fn get_string(&mut self) -> Result<String> {
        let raw = self.get_length_prefixed()?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| Status::corruption(format!("{}: invalid UTF-8", self.context)))
    }
}
