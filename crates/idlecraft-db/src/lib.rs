//! Idlecraft DB - durable ledger store using native_db
//!
//! Provides persistent storage for:
//! - The installed catalog (items, tools, recipes, level thresholds)
//! - Accounts, inventories, tool instances and category XP
//! - Market listings and purchase history
//!
//! [`Store`] implements `idlecraft_core::LedgerStore`, so every core
//! operation runs against it unchanged.

mod error;
mod ledger;
mod models;
mod store;

pub use error::{Error, Result};
pub use store::Store;
