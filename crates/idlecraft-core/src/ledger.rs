//! The transactional store interface
//!
//! A [`Ledger`] is the view of the store inside one read-write
//! transaction: reads observe the transaction's own writes, and nothing is
//! visible to other transactions until [`LedgerStore::transact`] commits.
//! Every core operation is a function of `&mut dyn Ledger` plus explicit
//! inputs, so it runs unchanged against any backend.

use crate::account::{CategoryXp, User, UserItem, UserTool};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::identity::{ListingId, Sequence, ToolInstanceId, UserId};
use crate::market::{Listing, MarketRecord};

/// Read/write access to all records within one transaction
pub trait Ledger {
    /// Allocate the next identifier of a sequence (starts at 1)
    fn next_id(&mut self, seq: Sequence) -> Result<u64>;

    // --- catalog ---

    /// Load the full static content
    fn catalog(&self) -> Result<Catalog>;

    /// Replace the static content
    fn install_catalog(&mut self, catalog: &Catalog) -> Result<()>;

    // --- accounts ---

    fn user(&self, id: UserId) -> Result<Option<User>>;
    fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn put_user(&mut self, user: &User) -> Result<()>;

    // --- inventory ---

    /// Quantity held, 0 when no row exists
    fn item_quantity(&self, owner: UserId, item: &str) -> Result<u64>;
    /// Create or update the inventory row; rows at zero are kept
    fn set_item_quantity(&mut self, owner: UserId, item: &str, quantity: u64) -> Result<()>;
    fn user_items(&self, owner: UserId) -> Result<Vec<UserItem>>;

    // --- tool instances ---

    fn user_tool(&self, id: ToolInstanceId) -> Result<Option<UserTool>>;
    fn user_tools(&self, owner: UserId) -> Result<Vec<UserTool>>;
    /// Every tool instance in the store, ordered by id
    fn all_user_tools(&self) -> Result<Vec<UserTool>>;
    fn put_user_tool(&mut self, tool: &UserTool) -> Result<()>;

    // --- category XP ---

    fn category_xp(&self, owner: UserId, category: &str) -> Result<Option<CategoryXp>>;
    fn category_xps(&self, owner: UserId) -> Result<Vec<CategoryXp>>;
    fn put_category_xp(&mut self, xp: &CategoryXp) -> Result<()>;

    // --- market ---

    fn listing(&self, id: ListingId) -> Result<Option<Listing>>;
    /// Every listing, ordered by id
    fn listings(&self) -> Result<Vec<Listing>>;
    fn put_listing(&mut self, listing: &Listing) -> Result<()>;
    fn remove_listing(&mut self, id: ListingId) -> Result<()>;
    fn append_market_record(&mut self, record: &MarketRecord) -> Result<()>;
    /// Market records of one item, unordered
    fn market_records_for_item(&self, item: &str) -> Result<Vec<MarketRecord>>;
    /// Every market record, unordered
    fn market_records(&self) -> Result<Vec<MarketRecord>>;
}

/// A store that runs closures as atomic read-write transactions
///
/// Read-write transactions are serialized: at most one runs at a time.
/// If the closure returns `Err`, none of its writes become visible.
pub trait LedgerStore: Send + Sync {
    fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Ledger) -> Result<T>;
}
