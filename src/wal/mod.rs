pub mod log_format;
pub mod reader;
pub mod writer;

pub use log_format::{BLOCK_SIZE, HEADER_SIZE, RecordType};
pub use reader::{Reader, RecoveryMode};
pub use writer::Writer;
