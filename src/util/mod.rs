pub mod coding;
pub mod slice;
pub mod status;

pub use slice::Slice;
pub use status::{Code, Result, Status};
