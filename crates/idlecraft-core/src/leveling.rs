//! Category XP accrual and level recomputation

use crate::account::CategoryXp;
use crate::catalog::CategoryLevel;
use crate::error::{Error, Result};
use crate::identity::UserId;
use crate::ledger::Ledger;
use serde::{Deserialize, Serialize};

/// Outcome of one XP award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub category: String,
    pub xp: u64,
    pub previous_level: u32,
    pub level: u32,
    /// Set when the award leveled up and the account total was recomputed
    pub total_level: Option<u32>,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Highest level whose threshold is `<= xp`
///
/// `thresholds` must be in ascending level order; returns 0 when no
/// threshold is reached.
pub fn level_for_xp(thresholds: &[CategoryLevel], xp: u64) -> u32 {
    thresholds
        .iter()
        .take_while(|t| t.starting_xp <= xp)
        .map(|t| t.level)
        .last()
        .unwrap_or(0)
}

/// Add `delta` XP to `owner` in `category` and recompute the level
///
/// Levels never decrease. When the level rises, the account's total level
/// is recomputed from every category row.
pub fn award_xp(
    ledger: &mut dyn Ledger,
    owner: UserId,
    category: &str,
    delta: u64,
    thresholds: &[CategoryLevel],
) -> Result<LevelChange> {
    let mut row = ledger
        .category_xp(owner, category)?
        .unwrap_or_else(|| CategoryXp::new(owner, category));

    let previous_level = row.level;
    row.current_xp = row.current_xp.saturating_add(delta);
    row.level = previous_level.max(level_for_xp(thresholds, row.current_xp));
    ledger.put_category_xp(&row)?;

    let total_level = if row.level > previous_level {
        Some(recompute_total_level(ledger, owner)?)
    } else {
        None
    };

    Ok(LevelChange {
        category: category.to_string(),
        xp: row.current_xp,
        previous_level,
        level: row.level,
        total_level,
    })
}

/// Set `User.total_level` to `1 + Σ category levels` and return it
pub fn recompute_total_level(ledger: &mut dyn Ledger, owner: UserId) -> Result<u32> {
    let mut user = ledger
        .user(owner)?
        .ok_or_else(|| Error::UserNotFound(owner.to_string()))?;
    let sum: u32 = ledger.category_xps(owner)?.iter().map(|x| x.level).sum();
    user.total_level = sum + 1;
    ledger.put_user(&user)?;
    Ok(user.total_level)
}

/// Current level of `owner` in `category`, 0 when there is no row
pub fn current_level(ledger: &dyn Ledger, owner: UserId, category: &str) -> Result<u32> {
    Ok(ledger
        .category_xp(owner, category)?
        .map(|x| x.level)
        .unwrap_or(0))
}
