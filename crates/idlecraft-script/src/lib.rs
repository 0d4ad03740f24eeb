//! Idlecraft Script - RON catalog loader
//!
//! Loads the static game content from RON files:
//! - Items and tools (per tier)
//! - Generators of repeating tools
//! - Item and tool recipes, grouped by output
//! - Category level tables
//!
//! The loader flattens grouped definitions into catalog rows and rejects
//! duplicates and dangling references before anything reaches the store.

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{load_catalog, CatalogLoader};
pub use schema::{CatalogFile, GeneratorDef, ItemRecipeDef, LevelTableDef, ToolRecipeDef};
