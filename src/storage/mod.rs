// file: src/storage/mod.rs
// description: object storage module exports
// reference: internal module structure

pub mod local;
pub mod memory;
pub mod store;

pub use local::LocalBucketStore;
pub use memory::MemoryStore;
pub use store::{ObjectMeta, ObjectStore};
