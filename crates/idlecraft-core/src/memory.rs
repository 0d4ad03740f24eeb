//! In-memory ledger store
//!
//! Keeps every table in ordered maps behind one mutex. A transaction works
//! on a copy of the state and swaps it in only when the closure succeeds,
//! which gives the same all-or-nothing behavior as the durable store.

use crate::account::{CategoryXp, User, UserItem, UserTool};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::identity::{ListingId, Sequence, ToolInstanceId, UserId};
use crate::ledger::{Ledger, LedgerStore};
use crate::market::{Listing, MarketRecord};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    sequences: HashMap<&'static str, u64>,
    catalog: Catalog,
    users: BTreeMap<UserId, User>,
    items: BTreeMap<(UserId, String), u64>,
    tools: BTreeMap<ToolInstanceId, UserTool>,
    xp: BTreeMap<(UserId, String), CategoryXp>,
    listings: BTreeMap<ListingId, Listing>,
    records: BTreeMap<u64, MarketRecord>,
}

/// Ledger store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Ledger) -> Result<T>,
    {
        let mut guard = self.state.lock();
        let mut working = guard.clone();
        let out = f(&mut MemoryTx {
            state: &mut working,
        })?;
        *guard = working;
        Ok(out)
    }
}

struct MemoryTx<'a> {
    state: &'a mut MemoryState,
}

impl Ledger for MemoryTx<'_> {
    fn next_id(&mut self, seq: Sequence) -> Result<u64> {
        let counter = self.state.sequences.entry(seq.as_str()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn catalog(&self) -> Result<Catalog> {
        Ok(self.state.catalog.clone())
    }

    fn install_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        self.state.catalog = catalog.clone();
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.users.get(&id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.state.users.values().find(|u| u.email == email).cloned())
    }

    fn put_user(&mut self, user: &User) -> Result<()> {
        self.state.users.insert(user.id, user.clone());
        Ok(())
    }

    fn item_quantity(&self, owner: UserId, item: &str) -> Result<u64> {
        Ok(self
            .state
            .items
            .get(&(owner, item.to_string()))
            .copied()
            .unwrap_or(0))
    }

    fn set_item_quantity(&mut self, owner: UserId, item: &str, quantity: u64) -> Result<()> {
        self.state.items.insert((owner, item.to_string()), quantity);
        Ok(())
    }

    fn user_items(&self, owner: UserId) -> Result<Vec<UserItem>> {
        Ok(self
            .state
            .items
            .iter()
            .filter(|((o, _), _)| *o == owner)
            .map(|((o, item), quantity)| UserItem {
                owner: *o,
                item: item.clone(),
                quantity: *quantity,
            })
            .collect())
    }

    fn user_tool(&self, id: ToolInstanceId) -> Result<Option<UserTool>> {
        Ok(self.state.tools.get(&id).cloned())
    }

    fn user_tools(&self, owner: UserId) -> Result<Vec<UserTool>> {
        Ok(self
            .state
            .tools
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }

    fn all_user_tools(&self) -> Result<Vec<UserTool>> {
        Ok(self.state.tools.values().cloned().collect())
    }

    fn put_user_tool(&mut self, tool: &UserTool) -> Result<()> {
        self.state.tools.insert(tool.id, tool.clone());
        Ok(())
    }

    fn category_xp(&self, owner: UserId, category: &str) -> Result<Option<CategoryXp>> {
        Ok(self.state.xp.get(&(owner, category.to_string())).cloned())
    }

    fn category_xps(&self, owner: UserId) -> Result<Vec<CategoryXp>> {
        Ok(self
            .state
            .xp
            .values()
            .filter(|x| x.owner == owner)
            .cloned()
            .collect())
    }

    fn put_category_xp(&mut self, xp: &CategoryXp) -> Result<()> {
        self.state
            .xp
            .insert((xp.owner, xp.category.clone()), xp.clone());
        Ok(())
    }

    fn listing(&self, id: ListingId) -> Result<Option<Listing>> {
        Ok(self.state.listings.get(&id).cloned())
    }

    fn listings(&self) -> Result<Vec<Listing>> {
        Ok(self.state.listings.values().cloned().collect())
    }

    fn put_listing(&mut self, listing: &Listing) -> Result<()> {
        self.state.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    fn remove_listing(&mut self, id: ListingId) -> Result<()> {
        self.state.listings.remove(&id);
        Ok(())
    }

    fn append_market_record(&mut self, record: &MarketRecord) -> Result<()> {
        self.state.records.insert(record.id, record.clone());
        Ok(())
    }

    fn market_records_for_item(&self, item: &str) -> Result<Vec<MarketRecord>> {
        Ok(self
            .state
            .records
            .values()
            .filter(|r| r.item == item)
            .cloned()
            .collect())
    }

    fn market_records(&self) -> Result<Vec<MarketRecord>> {
        Ok(self.state.records.values().cloned().collect())
    }
}
