//! Per-owner records: accounts, inventory rows, tool instances and XP

use crate::identity::{ToolInstanceId, ToolKey, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A player account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub gold: Decimal,
    pub energy: f64,
    /// Always `1 + Σ category levels`; recomputed, never incremented
    pub total_level: u32,
    pub created_at: DateTime<Utc>,
}

/// Registration input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
        }
    }
}

/// Inventory row, unique per (owner, item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserItem {
    pub owner: UserId,
    pub item: String,
    pub quantity: u64,
}

/// An in-progress crafting run on a tool instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingRun {
    pub item: String,
    /// Batches still to produce; always > 0 while the run exists
    pub remaining: u64,
    /// Start of the batch currently in progress
    pub last_used: DateTime<Utc>,
}

/// An owned copy of a catalog tool
///
/// Occupancy is a single optional [`CraftingRun`], so "occupied",
/// "ongoing item set" and "remaining > 0" cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTool {
    pub id: ToolInstanceId,
    pub owner: UserId,
    pub tool: String,
    pub tier: u32,
    /// Per-owner instance number (1 for single instances)
    pub instance_no: u32,
    pub is_enabled: bool,
    pub acquired_at: DateTime<Utc>,
    pub crafting: Option<CraftingRun>,
}

impl UserTool {
    pub fn key(&self) -> ToolKey {
        ToolKey::new(self.tool.clone(), self.tier)
    }

    pub fn is_occupied(&self) -> bool {
        self.crafting.is_some()
    }

    pub fn ongoing_item(&self) -> Option<&str> {
        self.crafting.as_ref().map(|run| run.item.as_str())
    }

    pub fn remaining(&self) -> u64 {
        self.crafting.as_ref().map(|run| run.remaining).unwrap_or(0)
    }

    pub fn last_used(&self) -> Option<DateTime<Utc>> {
        self.crafting.as_ref().map(|run| run.last_used)
    }
}

/// XP and level of one owner in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryXp {
    pub owner: UserId,
    pub category: String,
    pub current_xp: u64,
    pub level: u32,
}

impl CategoryXp {
    /// Fresh row at level 0 with no XP
    pub fn new(owner: UserId, category: impl Into<String>) -> Self {
        Self {
            owner,
            category: category.into(),
            current_xp: 0,
            level: 0,
        }
    }
}
