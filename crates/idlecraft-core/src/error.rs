//! Error types for idlecraft-core
//!
//! Every variant maps to one [`ErrorKind`] so the presentation layer can
//! pick a status without matching on individual variants.

use crate::identity::{ListingId, ToolInstanceId, ToolKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// One missing input: how much was required and how much the owner holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub item: String,
    pub required: u64,
    pub available: u64,
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x '{}' (have {})",
            self.required, self.item, self.available
        )
    }
}

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InsufficientResources,
    InvalidState,
    Unauthorized,
    SelfTradeForbidden,
    LevelTooLow,
    Validation,
    Conflict,
    Storage,
}

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("tool not found: {0}")]
    ToolNotFound(ToolKey),

    #[error("tool instance not found: {0}")]
    ToolInstanceNotFound(ToolInstanceId),

    #[error("crafting recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    #[error("insufficient items: {}", format_shortfalls(.0))]
    InsufficientItems(Vec<Shortfall>),

    #[error("insufficient gold: need {required}, have {available}")]
    InsufficientGold { required: Decimal, available: Decimal },

    #[error("listing {listing} holds {available}, requested {requested}")]
    ListingQuantityExceeded {
        listing: ListingId,
        requested: u64,
        available: u64,
    },

    #[error("tool '{0}' not available")]
    ToolNotAvailable(String),

    #[error("tool '{name}' already owned at tier {owned_tier}")]
    AlreadyOwned { name: String, owned_tier: u32 },

    #[error("cannot own more than {max} instances of '{name}'")]
    MaxInstancesReached { name: String, max: u32 },

    #[error("not allowed: {0}")]
    Unauthorized(String),

    #[error("buyer and seller are the same account")]
    SelfTradeForbidden,

    #[error("minimum level {required} required in category '{category}', current level {current}")]
    LevelTooLow {
        category: String,
        required: u32,
        current: u32,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Taxonomy bucket of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UserNotFound(_)
            | Error::ItemNotFound(_)
            | Error::ToolNotFound(_)
            | Error::ToolInstanceNotFound(_)
            | Error::RecipeNotFound(_)
            | Error::ListingNotFound(_) => ErrorKind::NotFound,
            Error::InsufficientItems(_)
            | Error::InsufficientGold { .. }
            | Error::ListingQuantityExceeded { .. } => ErrorKind::InsufficientResources,
            Error::ToolNotAvailable(_)
            | Error::AlreadyOwned { .. }
            | Error::MaxInstancesReached { .. } => ErrorKind::InvalidState,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::SelfTradeForbidden => ErrorKind::SelfTradeForbidden,
            Error::LevelTooLow { .. } => ErrorKind::LevelTooLow,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }
}

fn format_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
