//! Database models for persistent storage.
//!
//! Timestamps are stored as UTC milliseconds. Composite natural keys are
//! flattened into string primary keys with a zero-padded owner prefix so
//! rows of one owner sort together.

mod account;
mod catalog;
mod market;

pub use account::*;
pub use catalog::*;
pub use market::*;

/// Primary key of a per-owner row keyed by name
pub fn owner_key(owner: u64, name: &str) -> String {
    format!("{:020}/{}", owner, name)
}
