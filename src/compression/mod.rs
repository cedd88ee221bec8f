//! Block compression for table files.

use crate::{
    table::format::CompressionType,
    util::{Result, Status},
};

pub fn compress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| Status::io_error(format!("Snappy compression failed: {e}"))),
        CompressionType::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
    }
}

pub fn decompress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| Status::corruption(format!("Snappy decompression failed: {e}"))),
        CompressionType::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| Status::corruption(format!("LZ4 decompression failed: {e:?}"))),
    }
}
