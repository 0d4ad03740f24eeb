//! Catalog models: static content written once by the loader.

use idlecraft_core::{CategoryLevel, CraftingRecipe, Item, Tool, ToolCraftingRecipe, ToolGeneratable};
use native_db::*;
use native_model::{native_model, Model};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stored catalog item.
///
/// Flattened so the gold value can be stored as a decimal string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredItem {
    /// Primary key - unique item name.
    #[primary_key]
    pub unique_name: String,
    pub name: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub gold_value: Decimal,
    pub probability: f64,
    pub is_legendary: bool,
    pub is_craftable: bool,
    pub xp_yield: u64,
    pub description: Option<String>,
}

impl StoredItem {
    pub fn from_item(item: &Item) -> Self {
        Self {
            unique_name: item.unique_name.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            gold_value: item.gold_value,
            probability: item.probability,
            is_legendary: item.is_legendary,
            is_craftable: item.is_craftable,
            xp_yield: item.xp_yield,
            description: item.description.clone(),
        }
    }

    pub fn to_item(&self) -> Item {
        Item {
            unique_name: self.unique_name.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            gold_value: self.gold_value,
            probability: self.probability,
            is_legendary: self.is_legendary,
            is_craftable: self.is_craftable,
            xp_yield: self.xp_yield,
            description: self.description.clone(),
        }
    }
}

/// Stored catalog tool at one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredTool {
    /// Primary key - `name#tier`.
    #[primary_key]
    pub key: String,
    pub tool: Tool,
}

impl StoredTool {
    pub fn from_tool(tool: &Tool) -> Self {
        Self {
            key: tool.key().to_string(),
            tool: tool.clone(),
        }
    }
}

/// Stored generator entry. Keyed by load order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredGeneratable {
    #[primary_key]
    pub position: u64,
    pub row: ToolGeneratable,
}

/// Stored crafting recipe row. Keyed by load order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct StoredCraftingRecipe {
    #[primary_key]
    pub position: u64,
    pub row: CraftingRecipe,
}

/// Stored tool recipe row. Keyed by load order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 5, version = 1)]
#[native_db]
pub struct StoredToolRecipe {
    #[primary_key]
    pub position: u64,
    pub row: ToolCraftingRecipe,
}

/// Stored category level threshold. Keyed by load order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 6, version = 1)]
#[native_db]
pub struct StoredCategoryLevel {
    #[primary_key]
    pub position: u64,
    pub row: CategoryLevel,
}
