//! Per-owner models: accounts, inventory, tool instances, XP and sequences.

use super::owner_key;
use idlecraft_core::time::from_millis;
use idlecraft_core::{
    CategoryXp, CraftingRun, Result, ToolInstanceId, User, UserId, UserItem, UserTool,
};
use native_db::*;
use native_model::{native_model, Model};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stored user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 10, version = 1)]
#[native_db]
pub struct StoredUser {
    /// Primary key - user ID.
    #[primary_key]
    pub id: u64,
    #[secondary_key(unique)]
    pub username: String,
    #[secondary_key(unique)]
    pub email: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub gold: Decimal,
    pub energy: f64,
    pub total_level: u32,
    pub created_at_ms: i64,
}

impl StoredUser {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.raw(),
            username: user.username.clone(),
            email: user.email.clone(),
            gold: user.gold,
            energy: user.energy,
            total_level: user.total_level,
            created_at_ms: user.created_at.timestamp_millis(),
        }
    }

    pub fn to_user(&self) -> Result<User> {
        Ok(User {
            id: UserId::new(self.id),
            username: self.username.clone(),
            email: self.email.clone(),
            gold: self.gold,
            energy: self.energy,
            total_level: self.total_level,
            created_at: from_millis(self.created_at_ms)?,
        })
    }
}

/// Stored inventory row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 11, version = 1)]
#[native_db]
pub struct StoredUserItem {
    /// Primary key - `owner/item`.
    #[primary_key]
    pub key: String,
    #[secondary_key]
    pub owner: u64,
    pub item: String,
    pub quantity: u64,
}

impl StoredUserItem {
    pub fn new(owner: UserId, item: &str, quantity: u64) -> Self {
        Self {
            key: owner_key(owner.raw(), item),
            owner: owner.raw(),
            item: item.to_string(),
            quantity,
        }
    }

    pub fn to_user_item(&self) -> UserItem {
        UserItem {
            owner: UserId::new(self.owner),
            item: self.item.clone(),
            quantity: self.quantity,
        }
    }
}

/// Stored tool instance.
///
/// Occupancy is flattened into three columns; a row is occupied only when
/// all of them are set and `remaining > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 12, version = 1)]
#[native_db]
pub struct StoredUserTool {
    /// Primary key - tool instance ID.
    #[primary_key]
    pub id: u64,
    #[secondary_key]
    pub owner: u64,
    pub tool: String,
    pub tier: u32,
    pub instance_no: u32,
    pub is_enabled: bool,
    pub acquired_at_ms: i64,
    pub ongoing_item: Option<String>,
    pub remaining: u64,
    pub last_used_ms: Option<i64>,
}

impl StoredUserTool {
    pub fn from_tool(tool: &UserTool) -> Self {
        let (ongoing_item, remaining, last_used_ms) = match &tool.crafting {
            Some(run) => (
                Some(run.item.clone()),
                run.remaining,
                Some(run.last_used.timestamp_millis()),
            ),
            None => (None, 0, None),
        };
        Self {
            id: tool.id.raw(),
            owner: tool.owner.raw(),
            tool: tool.tool.clone(),
            tier: tool.tier,
            instance_no: tool.instance_no,
            is_enabled: tool.is_enabled,
            acquired_at_ms: tool.acquired_at.timestamp_millis(),
            ongoing_item,
            remaining,
            last_used_ms,
        }
    }

    pub fn to_tool(&self) -> Result<UserTool> {
        let crafting = match (&self.ongoing_item, self.last_used_ms) {
            (Some(item), Some(last_used)) if self.remaining > 0 => Some(CraftingRun {
                item: item.clone(),
                remaining: self.remaining,
                last_used: from_millis(last_used)?,
            }),
            _ => None,
        };
        Ok(UserTool {
            id: ToolInstanceId::new(self.id),
            owner: UserId::new(self.owner),
            tool: self.tool.clone(),
            tier: self.tier,
            instance_no: self.instance_no,
            is_enabled: self.is_enabled,
            acquired_at: from_millis(self.acquired_at_ms)?,
            crafting,
        })
    }
}

/// Stored category XP row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 13, version = 1)]
#[native_db]
pub struct StoredCategoryXp {
    /// Primary key - `owner/category`.
    #[primary_key]
    pub key: String,
    #[secondary_key]
    pub owner: u64,
    pub category: String,
    pub current_xp: u64,
    pub level: u32,
}

impl StoredCategoryXp {
    pub fn from_xp(xp: &CategoryXp) -> Self {
        Self {
            key: owner_key(xp.owner.raw(), &xp.category),
            owner: xp.owner.raw(),
            category: xp.category.clone(),
            current_xp: xp.current_xp,
            level: xp.level,
        }
    }

    pub fn to_xp(&self) -> CategoryXp {
        CategoryXp {
            owner: UserId::new(self.owner),
            category: self.category.clone(),
            current_xp: self.current_xp,
            level: self.level,
        }
    }
}

/// Stored ID sequence counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 14, version = 1)]
#[native_db]
pub struct StoredSequence {
    /// Primary key - sequence name.
    #[primary_key]
    pub name: String,
    /// Last issued value.
    pub value: u64,
}
