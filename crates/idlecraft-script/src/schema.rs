//! Authoring schema for catalog files
//!
//! Items and tools are written exactly as the core rows. Recipes and level
//! tables use a grouped form: one entry per output with an `inputs` map,
//! which the loader flattens into one row per input.

use idlecraft_core::{
    CategoryLevel, CraftingRecipe, Item, Tool, ToolCraftingRecipe, ToolGeneratable, ToolKey,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn default_one() -> u64 {
    1
}

fn default_tier() -> u32 {
    1
}

/// One catalog file; every section is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub generators: Vec<GeneratorDef>,
    #[serde(default)]
    pub item_recipes: Vec<ItemRecipeDef>,
    #[serde(default)]
    pub tool_recipes: Vec<ToolRecipeDef>,
    #[serde(default)]
    pub levels: Vec<LevelTableDef>,
}

/// What a repeating tool produces each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorDef {
    pub tool: String,
    pub item: String,
    #[serde(default = "default_one")]
    pub quantity: u64,
    /// Resource item and quantity consumed per tick
    #[serde(default)]
    pub consumes: Option<(String, u64)>,
}

impl GeneratorDef {
    pub fn to_row(&self) -> ToolGeneratable {
        ToolGeneratable {
            tool: self.tool.clone(),
            item: self.item.clone(),
            resource: self.consumes.as_ref().map(|(item, _)| item.clone()),
            resource_quantity: self.consumes.as_ref().map(|(_, qty)| *qty),
            output_quantity: self.quantity,
        }
    }
}

/// On-demand recipe for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecipeDef {
    pub output: String,
    #[serde(default = "default_one")]
    pub output_quantity: u64,
    pub tool: String,
    #[serde(default = "default_tier")]
    pub tool_tier: u32,
    /// Seconds per batch
    pub duration_secs: f64,
    pub inputs: IndexMap<String, u64>,
}

impl ItemRecipeDef {
    pub fn to_rows(&self) -> Vec<CraftingRecipe> {
        self.inputs
            .iter()
            .map(|(item, qty)| CraftingRecipe {
                input_item: item.clone(),
                input_quantity: *qty,
                tool: self.tool.clone(),
                tool_tier: self.tool_tier,
                output_item: self.output.clone(),
                output_quantity: self.output_quantity,
                generation_duration: self.duration_secs,
            })
            .collect()
    }
}

/// Cost and gate of one tool tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecipeDef {
    pub tool: String,
    #[serde(default = "default_tier")]
    pub tier: u32,
    pub category: String,
    #[serde(default)]
    pub minimum_level: u32,
    pub inputs: IndexMap<String, u64>,
}

impl ToolRecipeDef {
    pub fn key(&self) -> ToolKey {
        ToolKey::new(self.tool.clone(), self.tier)
    }

    pub fn to_rows(&self) -> Vec<ToolCraftingRecipe> {
        self.inputs
            .iter()
            .map(|(item, qty)| ToolCraftingRecipe {
                input_item: item.clone(),
                input_quantity: *qty,
                output_tool: self.tool.clone(),
                output_tier: self.tier,
                category: self.category.clone(),
                minimum_category_level: self.minimum_level,
            })
            .collect()
    }
}

/// Level thresholds of one category
///
/// `starting_xp[n]` is the XP at which level `n` begins, so the first
/// entry is normally 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTableDef {
    pub category: String,
    pub starting_xp: Vec<u64>,
}

impl LevelTableDef {
    pub fn to_rows(&self) -> Vec<CategoryLevel> {
        self.starting_xp
            .iter()
            .enumerate()
            .map(|(level, xp)| CategoryLevel {
                category: self.category.clone(),
                level: level as u32,
                starting_xp: *xp,
            })
            .collect()
    }

    /// Thresholds must strictly increase with the level
    pub fn is_ascending(&self) -> bool {
        self.starting_xp.windows(2).all(|w| w[0] < w[1])
    }
}
