//! Component A — Memory Store.
//!
//! The authoritative, content-addressed record of each memory on disk.
//! Every other component references memories only by id; no component but
//! this one may mutate a memory record.

mod file_format;
mod filter;
mod record;
mod store;

pub use filter::MemoryFilter;
pub use record::{Memory, Scope, Status};
pub use store::{MemoryChanges, MemoryStore};
