pub mod format;
pub mod table_builder;
pub mod table_reader;

pub use format::{CompressionType, FOOTER_SIZE, Footer};
pub use table_builder::{TableBuilder, TableProperties};
pub use table_reader::TableReader;
