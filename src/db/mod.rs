mod access_mode;
#[allow(clippy::module_inception)]
mod db;
mod dir_lock;
pub mod options;
pub mod write_batch;

pub use access_mode::{AccessMode, Mutation, MutationGuard};
pub use db::DB;
pub use options::{DBOptions, ReadOptions, WriteOptions};
pub use write_batch::{WriteBatch, WriteOp};
