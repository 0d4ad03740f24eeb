//! Static game content: items, tools, recipes and level thresholds
//!
//! Catalog rows are written once by the content loader and only read by
//! gameplay. Operations never traverse rows lazily; they build a
//! [`CatalogIndex`] of ordered maps keyed by natural keys once per
//! operation or sweep.

use crate::error::{Error, Result};
use crate::identity::ToolKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn default_one_f64() -> f64 {
    1.0
}

fn default_one_u64() -> u64 {
    1
}

fn default_tier() -> u32 {
    1
}

/// Catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique key
    pub unique_name: String,
    /// Display name
    pub name: String,
    pub category: String,
    /// Price paid when the item is sold back to the game
    #[serde(default)]
    pub gold_value: Decimal,
    /// Base drop chance for repeating tools
    #[serde(default = "default_one_f64")]
    pub probability: f64,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_craftable: bool,
    /// Category XP granted per produced unit
    #[serde(default = "default_one_u64")]
    pub xp_yield: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Catalog tool at one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub unique_name: String,
    #[serde(default = "default_tier")]
    pub tier: u32,
    /// Display name
    pub name: String,
    pub category: String,
    /// Generates output on every generation tick while enabled
    #[serde(default)]
    pub is_repeating: bool,
    #[serde(default = "default_one_f64")]
    pub probability_boost: f64,
    /// Cap on the owner's quantity of any single item this tool generates
    #[serde(default)]
    pub storage_capacity: Option<u64>,
    #[serde(default)]
    pub is_multiple_craftable: bool,
    #[serde(default)]
    pub max_crafting_number: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Tool {
    pub fn key(&self) -> ToolKey {
        ToolKey::new(self.unique_name.clone(), self.tier)
    }
}

/// What a repeating tool produces per tick, and at what cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolGeneratable {
    /// Applies to every tier of this tool
    pub tool: String,
    pub item: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub resource_quantity: Option<u64>,
    #[serde(default = "default_one_u64")]
    pub output_quantity: u64,
}

impl ToolGeneratable {
    /// Resource item and the quantity consumed per tick, if any
    pub fn resource_cost(&self) -> Option<(&str, u64)> {
        self.resource
            .as_deref()
            .map(|r| (r, self.resource_quantity.unwrap_or(1)))
    }
}

/// One input row of an on-demand item recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftingRecipe {
    pub input_item: String,
    pub input_quantity: u64,
    pub tool: String,
    #[serde(default = "default_tier")]
    pub tool_tier: u32,
    pub output_item: String,
    #[serde(default = "default_one_u64")]
    pub output_quantity: u64,
    /// Seconds per produced batch
    pub generation_duration: f64,
}

/// One input row of a tool recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCraftingRecipe {
    pub input_item: String,
    pub input_quantity: u64,
    pub output_tool: String,
    #[serde(default = "default_tier")]
    pub output_tier: u32,
    pub category: String,
    #[serde(default)]
    pub minimum_category_level: u32,
}

impl ToolCraftingRecipe {
    pub fn output_key(&self) -> ToolKey {
        ToolKey::new(self.output_tool.clone(), self.output_tier)
    }
}

/// Level boundary within a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLevel {
    pub category: String,
    pub level: u32,
    pub starting_xp: u64,
}

/// The full static content, as produced by a loader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub generatables: Vec<ToolGeneratable>,
    #[serde(default)]
    pub crafting_recipes: Vec<CraftingRecipe>,
    #[serde(default)]
    pub tool_recipes: Vec<ToolCraftingRecipe>,
    #[serde(default)]
    pub category_levels: Vec<CategoryLevel>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check keys, references and quantities
    ///
    /// Rejects duplicate item names, duplicate tool keys, duplicate
    /// category levels, references to unknown items or tools, zero
    /// quantities and non-positive crafting durations. All rows of one
    /// recipe must agree on everything but their input, and level
    /// thresholds must rise with the level.
    pub fn validate(&self) -> Result<()> {
        let mut items = BTreeSet::new();
        for item in &self.items {
            if !items.insert(item.unique_name.as_str()) {
                return Err(Error::Conflict(format!(
                    "duplicate item '{}'",
                    item.unique_name
                )));
            }
            if !item.probability.is_finite() || item.probability < 0.0 {
                return Err(Error::Validation(format!(
                    "item '{}' has invalid probability {}",
                    item.unique_name, item.probability
                )));
            }
            if item.gold_value.is_sign_negative() && !item.gold_value.is_zero() {
                return Err(Error::Validation(format!(
                    "item '{}' has negative gold value {}",
                    item.unique_name, item.gold_value
                )));
            }
        }

        let mut tool_names = BTreeSet::new();
        let mut tool_keys = BTreeSet::new();
        for tool in &self.tools {
            if !tool_keys.insert(tool.key()) {
                return Err(Error::Conflict(format!("duplicate tool '{}'", tool.key())));
            }
            tool_names.insert(tool.unique_name.as_str());
        }

        let known_item = |name: &str| -> Result<()> {
            if items.contains(name) {
                Ok(())
            } else {
                Err(Error::ItemNotFound(name.to_string()))
            }
        };
        let known_tool = |name: &str| -> Result<()> {
            if tool_names.contains(name) {
                Ok(())
            } else {
                Err(Error::Validation(format!("unknown tool '{}'", name)))
            }
        };

        for gen in &self.generatables {
            known_tool(&gen.tool)?;
            known_item(&gen.item)?;
            if let Some((resource, quantity)) = gen.resource_cost() {
                known_item(resource)?;
                if quantity == 0 {
                    return Err(Error::Validation(format!(
                        "generator '{}' -> '{}' consumes zero '{}'",
                        gen.tool, gen.item, resource
                    )));
                }
            }
            if gen.output_quantity == 0 {
                return Err(Error::Validation(format!(
                    "generator '{}' -> '{}' produces nothing",
                    gen.tool, gen.item
                )));
            }
        }

        for recipe in &self.crafting_recipes {
            known_item(&recipe.input_item)?;
            known_item(&recipe.output_item)?;
            known_tool(&recipe.tool)?;
            if recipe.input_quantity == 0 || recipe.output_quantity == 0 {
                return Err(Error::Validation(format!(
                    "recipe for '{}' has a zero quantity",
                    recipe.output_item
                )));
            }
            if !(recipe.generation_duration > 0.0) || !recipe.generation_duration.is_finite() {
                return Err(Error::Validation(format!(
                    "recipe for '{}' has non-positive duration",
                    recipe.output_item
                )));
            }
            let key = ToolKey::new(recipe.tool.clone(), recipe.tool_tier);
            if !tool_keys.contains(&key) {
                return Err(Error::ToolNotFound(key));
            }
        }

        let mut recipe_heads: BTreeMap<&str, &CraftingRecipe> = BTreeMap::new();
        for recipe in &self.crafting_recipes {
            let head = *recipe_heads
                .entry(recipe.output_item.as_str())
                .or_insert(recipe);
            if head.tool != recipe.tool
                || head.tool_tier != recipe.tool_tier
                || head.generation_duration != recipe.generation_duration
                || head.output_quantity != recipe.output_quantity
            {
                return Err(Error::Validation(format!(
                    "rows of the '{}' recipe must share tool, tier, duration and output quantity",
                    recipe.output_item
                )));
            }
        }

        for recipe in &self.tool_recipes {
            known_item(&recipe.input_item)?;
            if !tool_keys.contains(&recipe.output_key()) {
                return Err(Error::ToolNotFound(recipe.output_key()));
            }
            if recipe.input_quantity == 0 {
                return Err(Error::Validation(format!(
                    "tool recipe for '{}' has a zero quantity",
                    recipe.output_key()
                )));
            }
        }

        let mut tool_recipe_heads: BTreeMap<ToolKey, &ToolCraftingRecipe> = BTreeMap::new();
        for recipe in &self.tool_recipes {
            let head = *tool_recipe_heads
                .entry(recipe.output_key())
                .or_insert(recipe);
            if head.category != recipe.category
                || head.minimum_category_level != recipe.minimum_category_level
            {
                return Err(Error::Validation(format!(
                    "rows of the '{}' tool recipe must share category and minimum level",
                    recipe.output_key()
                )));
            }
        }

        let mut levels = BTreeMap::new();
        for level in &self.category_levels {
            if levels
                .insert((level.category.as_str(), level.level), level.starting_xp)
                .is_some()
            {
                return Err(Error::Conflict(format!(
                    "duplicate level {} in category '{}'",
                    level.level, level.category
                )));
            }
        }
        // keys iterate by category, then by level
        for (((category, level), xp), ((next_category, next_level), next_xp)) in
            levels.iter().zip(levels.iter().skip(1))
        {
            if category == next_category && next_xp <= xp {
                return Err(Error::Validation(format!(
                    "category '{}' level {} starts at {} XP, not above level {} at {}",
                    category, next_level, next_xp, level, xp
                )));
            }
        }

        Ok(())
    }
}

/// Ordered lookup maps over a [`Catalog`]
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    items: BTreeMap<String, Item>,
    tools: BTreeMap<ToolKey, Tool>,
    generatables: BTreeMap<String, Vec<ToolGeneratable>>,
    recipes_by_output: BTreeMap<String, Vec<CraftingRecipe>>,
    tool_recipes: BTreeMap<ToolKey, Vec<ToolCraftingRecipe>>,
    levels: BTreeMap<String, Vec<CategoryLevel>>,
}

impl CatalogIndex {
    /// Build the index; level thresholds are sorted by ascending level
    pub fn new(catalog: Catalog) -> Self {
        let mut index = Self::default();

        for item in catalog.items {
            index.items.insert(item.unique_name.clone(), item);
        }
        for tool in catalog.tools {
            index.tools.insert(tool.key(), tool);
        }
        for gen in catalog.generatables {
            index
                .generatables
                .entry(gen.tool.clone())
                .or_default()
                .push(gen);
        }
        for recipe in catalog.crafting_recipes {
            index
                .recipes_by_output
                .entry(recipe.output_item.clone())
                .or_default()
                .push(recipe);
        }
        for recipe in catalog.tool_recipes {
            index
                .tool_recipes
                .entry(recipe.output_key())
                .or_default()
                .push(recipe);
        }
        for level in catalog.category_levels {
            index
                .levels
                .entry(level.category.clone())
                .or_default()
                .push(level);
        }
        for thresholds in index.levels.values_mut() {
            thresholds.sort_by_key(|l| l.level);
        }

        index
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    /// Look up an item, failing with `ItemNotFound`
    pub fn require_item(&self, name: &str) -> Result<&Item> {
        self.item(name)
            .ok_or_else(|| Error::ItemNotFound(name.to_string()))
    }

    pub fn tool(&self, key: &ToolKey) -> Option<&Tool> {
        self.tools.get(key)
    }

    /// Look up a tool, failing with `ToolNotFound`
    pub fn require_tool(&self, key: &ToolKey) -> Result<&Tool> {
        self.tool(key).ok_or_else(|| Error::ToolNotFound(key.clone()))
    }

    /// Generator entries of a tool (any tier)
    pub fn generatables(&self, tool: &str) -> &[ToolGeneratable] {
        self.generatables
            .get(tool)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All recipe rows producing `item`
    pub fn recipes_for(&self, item: &str) -> &[CraftingRecipe] {
        self.recipes_by_output
            .get(item)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All recipe rows for the given tool and tier
    pub fn tool_recipes_for(&self, key: &ToolKey) -> &[ToolCraftingRecipe] {
        self.tool_recipes
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Level thresholds of a category in ascending level order
    pub fn levels(&self, category: &str) -> &[CategoryLevel] {
        self.levels
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Recipe rows grouped by output item, in key order
    pub fn recipe_groups(&self) -> impl Iterator<Item = (&String, &Vec<CraftingRecipe>)> {
        self.recipes_by_output.iter()
    }

    /// Tool recipe rows grouped by output tool, in key order
    pub fn tool_recipe_groups(&self) -> impl Iterator<Item = (&ToolKey, &Vec<ToolCraftingRecipe>)> {
        self.tool_recipes.iter()
    }
}
