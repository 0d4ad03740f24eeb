//! Read-only views grouped into ordered maps

use crate::account::UserTool;
use crate::catalog::CatalogIndex;
use crate::error::Result;
use crate::identity::{Owner, ToolKey};
use crate::ledger::Ledger;
use crate::users;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// item category -> item -> quantity held
pub type InventoryReport = BTreeMap<String, BTreeMap<String, u64>>;

/// Costs and gate of one tool at one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecipeEntry {
    pub category: String,
    pub minimum_category_level: u32,
    pub inputs: BTreeMap<String, u64>,
}

/// How one item is crafted on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftingRecipeEntry {
    pub tool: ToolKey,
    pub generation_duration: f64,
    pub output_quantity: u64,
    pub inputs: BTreeMap<String, u64>,
}

/// Non-empty holdings of an owner grouped by item category
pub fn inventory_by_category(ledger: &dyn Ledger, owner: &Owner) -> Result<InventoryReport> {
    let user = users::resolve(ledger, owner)?;
    let index = CatalogIndex::new(ledger.catalog()?);
    let mut report = InventoryReport::new();
    for row in ledger.user_items(user.id)? {
        if row.quantity == 0 {
            continue;
        }
        let item = index.require_item(&row.item)?;
        report
            .entry(item.category.clone())
            .or_default()
            .insert(row.item, row.quantity);
    }
    Ok(report)
}

/// Tool instances of an owner grouped by tool category, each group by id
pub fn tools_by_category(
    ledger: &dyn Ledger,
    owner: &Owner,
) -> Result<BTreeMap<String, Vec<UserTool>>> {
    let user = users::resolve(ledger, owner)?;
    let index = CatalogIndex::new(ledger.catalog()?);
    let mut report: BTreeMap<String, Vec<UserTool>> = BTreeMap::new();
    for tool in ledger.user_tools(user.id)? {
        let category = index.require_tool(&tool.key())?.category.clone();
        report.entry(category).or_default().push(tool);
    }
    for tools in report.values_mut() {
        tools.sort_by_key(|t| t.id);
    }
    Ok(report)
}

/// Every craftable tool tier with its summed inputs
pub fn tool_recipe_book(index: &CatalogIndex) -> BTreeMap<ToolKey, ToolRecipeEntry> {
    index
        .tool_recipe_groups()
        .filter_map(|(key, rows)| {
            let first = rows.first()?;
            let mut inputs = BTreeMap::new();
            for row in rows {
                let total = inputs.entry(row.input_item.clone()).or_insert(0u64);
                *total = total.saturating_add(row.input_quantity);
            }
            Some((
                key.clone(),
                ToolRecipeEntry {
                    category: first.category.clone(),
                    minimum_category_level: first.minimum_category_level,
                    inputs,
                },
            ))
        })
        .collect()
}

/// Every craftable item with its tool and summed inputs per batch
pub fn crafting_recipe_book(index: &CatalogIndex) -> BTreeMap<String, CraftingRecipeEntry> {
    index
        .recipe_groups()
        .filter_map(|(item, rows)| {
            let first = rows.first()?;
            let mut inputs = BTreeMap::new();
            for row in rows {
                let total = inputs.entry(row.input_item.clone()).or_insert(0u64);
                *total = total.saturating_add(row.input_quantity);
            }
            Some((
                item.clone(),
                CraftingRecipeEntry {
                    tool: ToolKey::new(first.tool.clone(), first.tool_tier),
                    generation_duration: first.generation_duration,
                    output_quantity: first.output_quantity,
                    inputs,
                },
            ))
        })
        .collect()
}
