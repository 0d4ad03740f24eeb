//! Account registration, owner resolution and tool toggling

use crate::account::{NewUser, User, UserTool};
use crate::catalog::CatalogIndex;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::identity::{Owner, Sequence, ToolInstanceId, ToolKey, UserId};
use crate::inventory;
use crate::ledger::Ledger;
use crate::toolcraft;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Look up the account behind an owner identity
pub fn resolve(ledger: &dyn Ledger, owner: &Owner) -> Result<User> {
    let user = match owner {
        Owner::Id(id) => ledger.user(*id)?,
        Owner::Username(name) => ledger.user_by_username(name)?,
    };
    user.ok_or_else(|| Error::UserNotFound(owner.to_string()))
}

/// Register an account and hand out the starter kit
///
/// Usernames and emails are unique. Starter tools and items must exist in
/// the installed catalog. A tool listed more than once is only allowed when
/// it is multiple-craftable; its instances are numbered from 1 in list order.
pub fn create_user(
    ledger: &mut dyn Ledger,
    new_user: &NewUser,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<User> {
    let username = new_user.username.trim();
    let email = new_user.email.trim();
    if username.is_empty() {
        return Err(Error::Validation("username must not be empty".into()));
    }
    if email.is_empty() {
        return Err(Error::Validation("email must not be empty".into()));
    }
    if ledger.user_by_username(username)?.is_some() {
        return Err(Error::Conflict(format!("username '{}' is taken", username)));
    }
    if ledger.user_by_email(email)?.is_some() {
        return Err(Error::Conflict(format!("email '{}' is taken", email)));
    }

    let user = User {
        id: UserId::new(ledger.next_id(Sequence::User)?),
        username: username.to_string(),
        email: email.to_string(),
        gold: config.starting_gold,
        energy: config.starting_energy,
        total_level: 1,
        created_at: now,
    };
    ledger.put_user(&user)?;

    let index = CatalogIndex::new(ledger.catalog()?);
    let mut granted: BTreeMap<&str, u32> = BTreeMap::new();
    for (name, tier) in &config.starter_tools {
        let key = ToolKey::new(name.clone(), *tier);
        let tool = index.require_tool(&key)?;
        let count = granted.entry(name.as_str()).or_insert(0);
        if *count > 0 && !tool.is_multiple_craftable {
            return Err(Error::Conflict(format!(
                "starter tool '{}' is listed more than once",
                name
            )));
        }
        if let Some(max) = tool.max_crafting_number.filter(|_| tool.is_multiple_craftable) {
            if *count >= max {
                return Err(Error::MaxInstancesReached {
                    name: name.clone(),
                    max,
                });
            }
        }
        *count += 1;
        toolcraft::new_instance(ledger, user.id, &key, *count, now)?;
    }
    for (item, &quantity) in &config.starter_items {
        index.require_item(item)?;
        inventory::credit(ledger, user.id, item, quantity)?;
    }

    Ok(user)
}

/// Flip `is_enabled` on one of the owner's tool instances
pub fn toggle_tool(ledger: &mut dyn Ledger, owner: &Owner, tool: ToolInstanceId) -> Result<UserTool> {
    let user = resolve(ledger, owner)?;
    let mut instance = ledger
        .user_tool(tool)?
        .filter(|t| t.owner == user.id)
        .ok_or(Error::ToolInstanceNotFound(tool))?;
    instance.is_enabled = !instance.is_enabled;
    ledger.put_user_tool(&instance)?;
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;
    use crate::error::ErrorKind;
    use crate::ledger::LedgerStore;
    use crate::memory::MemoryStore;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;

    fn config() -> EngineConfig {
        let mut items = BTreeMap::new();
        items.insert("stone".to_string(), 10);
        EngineConfig {
            starter_tools: vec![("drill".to_string(), 1)],
            starter_items: items,
            ..EngineConfig::default()
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .transact(|tx| tx.install_catalog(&fixtures::catalog()))
            .unwrap();
        store
    }

    #[test]
    fn test_create_user_grants_starter_kit() {
        let store = store();
        let now = Utc::now();
        let user = store
            .transact(|tx| create_user(tx, &NewUser::new("ann", "ann@example.com"), &config(), now))
            .unwrap();

        assert_eq!(user.id, UserId(1));
        assert_eq!(user.gold, Decimal::from(10));
        assert_eq!(user.total_level, 1);

        store
            .transact(|tx| {
                assert_eq!(tx.item_quantity(user.id, "stone")?, 10);
                let tools = tx.user_tools(user.id)?;
                assert_eq!(tools.len(), 1);
                assert_eq!(tools[0].key(), ToolKey::new("drill", 1));
                assert!(tools[0].is_enabled);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_duplicate_username_and_email() {
        let store = store();
        let now = Utc::now();
        store
            .transact(|tx| create_user(tx, &NewUser::new("ann", "ann@example.com"), &config(), now))
            .unwrap();

        let err = store
            .transact(|tx| create_user(tx, &NewUser::new("ann", "other@example.com"), &config(), now))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = store
            .transact(|tx| create_user(tx, &NewUser::new("bob", "ann@example.com"), &config(), now))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err = store
            .transact(|tx| create_user(tx, &NewUser::new("  ", "x@example.com"), &config(), now))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_unknown_starter_tool_aborts_registration() {
        let store = store();
        let err = store
            .transact(|tx| {
                create_user(
                    tx,
                    &NewUser::new("ann", "ann@example.com"),
                    &EngineConfig::default(),
                    Utc::now(),
                )
            })
            .unwrap_err();
        assert_eq!(err, Error::ToolNotFound(ToolKey::new("player_ultimate", 1)));

        let found = store.transact(|tx| tx.user_by_username("ann")).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_repeated_starter_tools_are_numbered() {
        let store = store();
        let starter = EngineConfig {
            starter_tools: vec![
                ("bench".to_string(), 1),
                ("drill".to_string(), 1),
                ("bench".to_string(), 1),
            ],
            ..config()
        };
        let user = store
            .transact(|tx| create_user(tx, &NewUser::new("ann", "ann@example.com"), &starter, Utc::now()))
            .unwrap();

        let tools = store.transact(|tx| tx.user_tools(user.id)).unwrap();
        let numbers: Vec<(String, u32)> = tools
            .iter()
            .map(|t| (t.tool.clone(), t.instance_no))
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("bench".to_string(), 1),
                ("drill".to_string(), 1),
                ("bench".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_repeated_single_starter_tool_rejected() {
        let store = store();
        let doubled = EngineConfig {
            starter_tools: vec![("drill".to_string(), 1), ("drill".to_string(), 1)],
            ..config()
        };
        let err = store
            .transact(|tx| create_user(tx, &NewUser::new("ann", "ann@example.com"), &doubled, Utc::now()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let tripled = EngineConfig {
            starter_tools: vec![("bench".to_string(), 1); 3],
            ..config()
        };
        let err = store
            .transact(|tx| create_user(tx, &NewUser::new("ann", "ann@example.com"), &tripled, Utc::now()))
            .unwrap_err();
        assert_eq!(
            err,
            Error::MaxInstancesReached {
                name: "bench".to_string(),
                max: 2
            }
        );
        assert!(store.transact(|tx| tx.user_by_username("ann")).unwrap().is_none());
    }

    #[test]
    fn test_resolve_and_toggle() {
        let store = store();
        let now = Utc::now();
        store
            .transact(|tx| {
                create_user(tx, &NewUser::new("ann", "ann@example.com"), &config(), now)?;
                create_user(tx, &NewUser::new("bob", "bob@example.com"), &config(), now)
            })
            .unwrap();

        let ann = store.transact(|tx| resolve(tx, &Owner::from("ann"))).unwrap();
        assert_eq!(ann.id, UserId(1));
        assert!(store
            .transact(|tx| resolve(tx, &Owner::from("carol")))
            .is_err());

        let tool = store
            .transact(|tx| toggle_tool(tx, &Owner::Id(ann.id), ToolInstanceId(1)))
            .unwrap();
        assert!(!tool.is_enabled);

        // bob cannot toggle ann's drill
        let err = store
            .transact(|tx| toggle_tool(tx, &Owner::from("bob"), ToolInstanceId(1)))
            .unwrap_err();
        assert_eq!(err, Error::ToolInstanceNotFound(ToolInstanceId(1)));
    }
}
