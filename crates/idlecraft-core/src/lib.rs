//! Idlecraft Core - progression and economy engine of an idle crafting game
//!
//! This crate holds the stateful rules of the economy:
//! - Passive generation from enabled repeating tools (`generation`)
//! - Time-accounted item crafting on occupied tools (`crafting`)
//! - Tool crafting and upgrades gated by category level (`toolcraft`)
//! - Escrowed market listings with lazy expiry and history (`market`)
//! - Category XP and level recomputation (`leveling`)
//!
//! Every operation is a function of `&mut dyn Ledger` plus explicit inputs
//! and runs inside one [`LedgerStore::transact`] call, so a failure at any
//! step leaves the store untouched. [`Engine`] wraps the operations with a
//! clock, config and RNG for hosts such as the scheduler binary.
//!
//! ## Stores
//!
//! [`MemoryStore`] keeps everything in memory and is used by tests. The
//! `idlecraft-db` crate provides the durable store.

pub mod account;
pub mod catalog;
mod config;
pub mod crafting;
mod engine;
mod error;
pub mod generation;
mod identity;
pub mod inventory;
pub mod ledger;
pub mod leveling;
pub mod market;
mod memory;
pub mod reports;
mod rng;
pub mod time;
pub mod toolcraft;
pub mod users;

pub use account::{CategoryXp, CraftingRun, NewUser, User, UserItem, UserTool};
pub use catalog::{
    Catalog, CatalogIndex, CategoryLevel, CraftingRecipe, Item, Tool, ToolCraftingRecipe,
    ToolGeneratable,
};
pub use config::EngineConfig;
pub use crafting::{CraftProgress, ReconcileReport};
pub use engine::Engine;
pub use error::{Error, ErrorKind, Result, Shortfall};
pub use generation::{CappedGrant, GenerationReport, Grant, SkippedEntry};
pub use identity::{ListingId, Owner, Sequence, ToolInstanceId, ToolKey, UserId};
pub use ledger::{Ledger, LedgerStore};
pub use leveling::LevelChange;
pub use market::{Listing, MarketRecord, NewListing, QuickSale};
pub use memory::MemoryStore;
pub use reports::{CraftingRecipeEntry, InventoryReport, ToolRecipeEntry};
pub use rng::GameRng;
pub use rust_decimal::Decimal;
pub use time::{Clock, ManualClock, SystemClock};
pub use toolcraft::ToolCraftOutcome;
