//! Inventory arithmetic shared by crafting, tool crafting and the market

use crate::error::{Error, Result, Shortfall};
use crate::identity::UserId;
use crate::ledger::Ledger;
use std::collections::BTreeMap;

/// Per-item input requirements, summed and ordered by item name
pub type Requirements = BTreeMap<String, u64>;

/// Add `quantity` of `item` to a requirement set
pub fn require(requirements: &mut Requirements, item: &str, quantity: u64) -> Result<()> {
    let entry = requirements.entry(item.to_string()).or_insert(0);
    *entry = entry
        .checked_add(quantity)
        .ok_or_else(|| Error::Validation(format!("required quantity of '{}' overflows", item)))?;
    Ok(())
}

/// Collect every shortfall of `owner` against `requirements`
pub fn shortfalls(
    ledger: &dyn Ledger,
    owner: UserId,
    requirements: &Requirements,
) -> Result<Vec<Shortfall>> {
    let mut missing = Vec::new();
    for (item, &required) in requirements {
        let available = ledger.item_quantity(owner, item)?;
        if available < required {
            missing.push(Shortfall {
                item: item.clone(),
                required,
                available,
            });
        }
    }
    Ok(missing)
}

/// Deduct every requirement, or fail with `InsufficientItems` listing all
/// shortfalls before anything is written
pub fn deduct_all(ledger: &mut dyn Ledger, owner: UserId, requirements: &Requirements) -> Result<()> {
    let missing = shortfalls(ledger, owner, requirements)?;
    if !missing.is_empty() {
        return Err(Error::InsufficientItems(missing));
    }
    for (item, &required) in requirements {
        let held = ledger.item_quantity(owner, item)?;
        ledger.set_item_quantity(owner, item, held - required)?;
    }
    Ok(())
}

/// Deduct a single item
pub fn deduct(ledger: &mut dyn Ledger, owner: UserId, item: &str, quantity: u64) -> Result<()> {
    let mut requirements = Requirements::new();
    require(&mut requirements, item, quantity)?;
    deduct_all(ledger, owner, &requirements)
}

/// Credit `quantity` of `item`, returning the new holding
pub fn credit(ledger: &mut dyn Ledger, owner: UserId, item: &str, quantity: u64) -> Result<u64> {
    let held = ledger.item_quantity(owner, item)?;
    let total = held
        .checked_add(quantity)
        .ok_or_else(|| Error::Validation(format!("quantity overflow for '{}'", item)))?;
    ledger.set_item_quantity(owner, item, total)?;
    Ok(total)
}
