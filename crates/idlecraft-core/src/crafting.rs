//! On-demand item crafting
//!
//! A run occupies one tool instance. Progress is derived from the persisted
//! `last_used` timestamp, so it survives restarts and tick jitter: each
//! reconcile credits every whole batch finished since `last_used` and banks
//! the unused remainder by advancing `last_used` by whole batch durations.

use crate::account::{CraftingRun, UserTool};
use crate::catalog::{CatalogIndex, CraftingRecipe};
use crate::error::{Error, Result};
use crate::identity::{Owner, ToolInstanceId, UserId};
use crate::inventory::{self, Requirements};
use crate::ledger::Ledger;
use crate::leveling::{self, LevelChange};
use crate::time::secs_to_millis;
use crate::users;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Progress of one run during a reconcile sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftProgress {
    pub tool: ToolInstanceId,
    pub owner: UserId,
    pub item: String,
    /// Batches finished in this sweep
    pub completed: u64,
    /// Units credited (`completed × output quantity`)
    pub produced: u64,
    /// Batches still outstanding; 0 means the tool is idle again
    pub remaining: u64,
}

/// Outcome of one reconcile sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Occupied tools examined
    pub scanned: usize,
    pub progressed: Vec<CraftProgress>,
    pub level_ups: Vec<(UserId, LevelChange)>,
}

impl ReconcileReport {
    /// Tools released back to idle in this sweep
    pub fn finished(&self) -> impl Iterator<Item = ToolInstanceId> + '_ {
        self.progressed
            .iter()
            .filter(|p| p.remaining == 0)
            .map(|p| p.tool)
    }
}

/// Whole batches finished after `elapsed_ms`, capped at `remaining`
///
/// Negative elapsed time counts as zero.
pub fn batches_completed(elapsed_ms: i64, duration_ms: i64, remaining: u64) -> u64 {
    if elapsed_ms <= 0 || duration_ms <= 0 {
        return 0;
    }
    ((elapsed_ms / duration_ms) as u64).min(remaining)
}

/// Every recipe row producing `item`
///
/// A validated catalog guarantees the rows agree on tool, tier, duration and
/// output quantity, so the first row speaks for the group.
fn recipe_rows<'a>(index: &'a CatalogIndex, item: &str) -> Result<&'a [CraftingRecipe]> {
    let rows = index.recipes_for(item);
    if rows.is_empty() {
        return Err(Error::RecipeNotFound(item.to_string()));
    }
    Ok(rows)
}

/// Start crafting `quantity` batches of `item`
///
/// Deducts `input_quantity × quantity` of every input and occupies the
/// owner's lowest-numbered idle instance of the recipe's tool at the
/// recipe's tier or above.
pub fn start(
    ledger: &mut dyn Ledger,
    owner: &Owner,
    item: &str,
    quantity: u64,
    now: DateTime<Utc>,
) -> Result<UserTool> {
    if quantity == 0 {
        return Err(Error::Validation("crafting quantity must be at least 1".into()));
    }
    let user = users::resolve(ledger, owner)?;
    let index = CatalogIndex::new(ledger.catalog()?);
    let rows = recipe_rows(&index, item)?;
    let recipe = &rows[0];

    let mut tool = ledger
        .user_tools(user.id)?
        .into_iter()
        .filter(|t| t.tool == recipe.tool && t.tier >= recipe.tool_tier && !t.is_occupied())
        .min_by_key(|t| t.id)
        .ok_or_else(|| Error::ToolNotAvailable(recipe.tool.clone()))?;

    let mut inputs = Requirements::new();
    for row in rows {
        let total = row.input_quantity.checked_mul(quantity).ok_or_else(|| {
            Error::Validation(format!("crafting quantity {} is too large", quantity))
        })?;
        inventory::require(&mut inputs, &row.input_item, total)?;
    }
    inventory::deduct_all(ledger, user.id, &inputs)?;

    tool.crafting = Some(CraftingRun {
        item: item.to_string(),
        remaining: quantity,
        last_used: now,
    });
    ledger.put_user_tool(&tool)?;
    Ok(tool)
}

/// Advance every occupied tool to `now`
///
/// A missing recipe or output item aborts the whole sweep.
pub fn reconcile(
    ledger: &mut dyn Ledger,
    now: DateTime<Utc>,
    xp_multiplier: u64,
) -> Result<ReconcileReport> {
    let index = CatalogIndex::new(ledger.catalog()?);
    let mut report = ReconcileReport::default();

    for mut tool in ledger.all_user_tools()? {
        let Some(mut run) = tool.crafting.take() else {
            continue;
        };
        report.scanned += 1;

        let recipe = &recipe_rows(&index, &run.item)?[0];
        let output = index.require_item(&recipe.output_item)?;

        let duration_ms = secs_to_millis(recipe.generation_duration).max(1);
        let elapsed_ms = (now - run.last_used).num_milliseconds();
        let completed = batches_completed(elapsed_ms, duration_ms, run.remaining);
        if completed == 0 {
            continue;
        }

        let produced = completed.saturating_mul(recipe.output_quantity);
        inventory::credit(ledger, tool.owner, &output.unique_name, produced)?;

        run.remaining -= completed;
        run.last_used += Duration::milliseconds(duration_ms.saturating_mul(completed as i64));

        let xp = output
            .xp_yield
            .saturating_mul(produced)
            .saturating_mul(xp_multiplier);
        let change = leveling::award_xp(
            ledger,
            tool.owner,
            &output.category,
            xp,
            index.levels(&output.category),
        )?;
        if change.leveled_up() {
            report.level_ups.push((tool.owner, change));
        }

        debug!(
            tool = %tool.id,
            item = %run.item,
            completed,
            remaining = run.remaining,
            "crafting progressed"
        );
        report.progressed.push(CraftProgress {
            tool: tool.id,
            owner: tool.owner,
            item: run.item.clone(),
            completed,
            produced,
            remaining: run.remaining,
        });

        if run.remaining > 0 {
            tool.crafting = Some(run);
        }
        ledger.put_user_tool(&tool)?;
    }

    Ok(report)
}
