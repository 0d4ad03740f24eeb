//! Tool crafting and in-place upgrades
//!
//! A tool recipe is gated by a minimum level in one category. Inputs are
//! deducted before the ownership branch; an ownership failure aborts the
//! enclosing transaction, so the deduction never persists on its own.

use crate::account::UserTool;
use crate::catalog::CatalogIndex;
use crate::error::{Error, Result};
use crate::identity::{Owner, Sequence, ToolInstanceId, ToolKey, UserId};
use crate::inventory::{self, Requirements};
use crate::leveling;
use crate::ledger::Ledger;
use crate::users;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a successful tool craft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolCraftOutcome {
    /// A new instance was created
    Crafted(UserTool),
    /// The owner's single instance moved to a higher tier
    Upgraded { tool: UserTool, from_tier: u32 },
}

impl ToolCraftOutcome {
    pub fn tool(&self) -> &UserTool {
        match self {
            ToolCraftOutcome::Crafted(tool) => tool,
            ToolCraftOutcome::Upgraded { tool, .. } => tool,
        }
    }
}

/// Insert a fresh, enabled, idle instance of `key` for `owner`
pub(crate) fn new_instance(
    ledger: &mut dyn Ledger,
    owner: UserId,
    key: &ToolKey,
    instance_no: u32,
    now: DateTime<Utc>,
) -> Result<UserTool> {
    let tool = UserTool {
        id: ToolInstanceId::new(ledger.next_id(Sequence::ToolInstance)?),
        owner,
        tool: key.name.clone(),
        tier: key.tier,
        instance_no,
        is_enabled: true,
        acquired_at: now,
        crafting: None,
    };
    ledger.put_user_tool(&tool)?;
    Ok(tool)
}

/// Craft `name` at `tier` for `owner`, or upgrade the owner's instance
pub fn craft_tool(
    ledger: &mut dyn Ledger,
    owner: &Owner,
    name: &str,
    tier: u32,
    now: DateTime<Utc>,
) -> Result<ToolCraftOutcome> {
    let user = users::resolve(ledger, owner)?;
    let index = CatalogIndex::new(ledger.catalog()?);
    let key = ToolKey::new(name, tier);
    let tool = index.require_tool(&key)?.clone();

    let recipes = index.tool_recipes_for(&key);
    let first = recipes
        .first()
        .ok_or_else(|| Error::RecipeNotFound(key.to_string()))?;

    let required = recipes
        .iter()
        .map(|r| r.minimum_category_level)
        .max()
        .unwrap_or(0);
    let current = leveling::current_level(ledger, user.id, &first.category)?;
    if current < required {
        return Err(Error::LevelTooLow {
            category: first.category.clone(),
            required,
            current,
        });
    }

    let mut inputs = Requirements::new();
    for recipe in recipes {
        inventory::require(&mut inputs, &recipe.input_item, recipe.input_quantity)?;
    }
    inventory::deduct_all(ledger, user.id, &inputs)?;

    let owned: Vec<UserTool> = ledger
        .user_tools(user.id)?
        .into_iter()
        .filter(|t| t.tool == tool.unique_name)
        .collect();

    if tool.is_multiple_craftable {
        if let Some(max) = tool.max_crafting_number {
            if owned.len() >= max as usize {
                return Err(Error::MaxInstancesReached {
                    name: tool.unique_name,
                    max,
                });
            }
        }
        let instance_no = owned.iter().map(|t| t.instance_no).max().unwrap_or(0) + 1;
        let created = new_instance(ledger, user.id, &key, instance_no, now)?;
        return Ok(ToolCraftOutcome::Crafted(created));
    }

    match owned.into_iter().next() {
        None => {
            let created = new_instance(ledger, user.id, &key, 1, now)?;
            Ok(ToolCraftOutcome::Crafted(created))
        }
        Some(mut existing) if tier > existing.tier => {
            let from_tier = existing.tier;
            existing.tier = tier;
            ledger.put_user_tool(&existing)?;
            Ok(ToolCraftOutcome::Upgraded {
                tool: existing,
                from_tier,
            })
        }
        Some(existing) => Err(Error::AlreadyOwned {
            name: existing.tool,
            owned_tier: existing.tier,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{CategoryXp, User};
    use crate::catalog::fixtures;
    use crate::error::ErrorKind;
    use crate::ledger::LedgerStore;
    use crate::memory::MemoryStore;
    use rust_decimal::Decimal;

    const ANN: UserId = UserId(1);

    fn setup(items: &[(&str, u64)]) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .transact(|tx| {
                tx.install_catalog(&fixtures::catalog())?;
                tx.put_user(&User {
                    id: ANN,
                    username: "ann".into(),
                    email: "ann@example.com".into(),
                    gold: Decimal::ZERO,
                    energy: 0.0,
                    total_level: 1,
                    created_at: Utc::now(),
                })?;
                for (item, qty) in items {
                    tx.set_item_quantity(ANN, item, *qty)?;
                }
                Ok(())
            })
            .unwrap();
        store
    }

    fn craft(store: &MemoryStore, name: &str, tier: u32) -> Result<ToolCraftOutcome> {
        store.transact(|tx| craft_tool(tx, &Owner::Id(ANN), name, tier, Utc::now()))
    }

    fn qty(store: &MemoryStore, item: &str) -> u64 {
        store.transact(|tx| tx.item_quantity(ANN, item)).unwrap()
    }

    #[test]
    fn test_craft_new_tool() {
        let store = setup(&[("stone", 7)]);
        let outcome = craft(&store, "forge", 1).unwrap();

        match outcome {
            ToolCraftOutcome::Crafted(tool) => {
                assert_eq!(tool.key(), ToolKey::new("forge", 1));
                assert_eq!(tool.instance_no, 1);
                assert!(!tool.is_occupied());
            }
            other => panic!("expected a new tool, got {:?}", other),
        }
        assert_eq!(qty(&store, "stone"), 2);
    }

    #[test]
    fn test_upgrade_in_place() {
        let store = setup(&[("stone", 6)]);
        craft(&store, "forge", 1).unwrap();

        let outcome = craft(&store, "forge", 3).unwrap();
        assert_eq!(
            outcome,
            ToolCraftOutcome::Upgraded {
                tool: UserTool {
                    tier: 3,
                    ..outcome.tool().clone()
                },
                from_tier: 1,
            }
        );
        let tools = store.transact(|tx| tx.user_tools(ANN)).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].tier, 3);
        assert_eq!(qty(&store, "stone"), 0);
    }

    #[test]
    fn test_already_owned_rolls_back_inputs() {
        let store = setup(&[("stone", 11)]);
        craft(&store, "forge", 1).unwrap();
        assert_eq!(qty(&store, "stone"), 6);

        let err = craft(&store, "forge", 1).unwrap_err();
        assert_eq!(
            err,
            Error::AlreadyOwned {
                name: "forge".into(),
                owned_tier: 1
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(qty(&store, "stone"), 6);
    }

    #[test]
    fn test_downgrade_is_rejected() {
        let store = setup(&[("stone", 6)]);
        craft(&store, "forge", 3).unwrap();
        assert!(matches!(
            craft(&store, "forge", 1),
            Err(Error::AlreadyOwned { owned_tier: 3, .. })
        ));
        assert_eq!(qty(&store, "stone"), 5);
    }

    #[test]
    fn test_level_gate() {
        let store = setup(&[("ingot", 3)]);
        let err = craft(&store, "forge", 2).unwrap_err();
        assert_eq!(
            err,
            Error::LevelTooLow {
                category: "smithing".into(),
                required: 1,
                current: 0
            }
        );

        store
            .transact(|tx| {
                tx.put_category_xp(&CategoryXp {
                    owner: ANN,
                    category: "smithing".into(),
                    current_xp: 5,
                    level: 1,
                })
            })
            .unwrap();
        craft(&store, "forge", 2).unwrap();
        assert_eq!(qty(&store, "ingot"), 0);
    }

    #[test]
    fn test_multiple_instances_up_to_max() {
        let store = setup(&[("plank", 10)]);
        let first = craft(&store, "bench", 1).unwrap();
        let second = craft(&store, "bench", 1).unwrap();
        assert_eq!(first.tool().instance_no, 1);
        assert_eq!(second.tool().instance_no, 2);
        assert_ne!(first.tool().id, second.tool().id);

        let err = craft(&store, "bench", 1).unwrap_err();
        assert_eq!(
            err,
            Error::MaxInstancesReached {
                name: "bench".into(),
                max: 2
            }
        );
        assert_eq!(qty(&store, "plank"), 6);
    }

    #[test]
    fn test_missing_inputs_and_recipes() {
        let store = setup(&[("stone", 1)]);
        assert!(matches!(
            craft(&store, "forge", 1),
            Err(Error::InsufficientItems(_))
        ));
        assert_eq!(
            craft(&store, "drill", 1).unwrap_err(),
            Error::RecipeNotFound("drill#1".into())
        );
        assert_eq!(
            craft(&store, "forge", 7).unwrap_err(),
            Error::ToolNotFound(ToolKey::new("forge", 7))
        );
    }
}
