//! `Ledger` over one native_db read-write transaction.
//!
//! Every read goes through the same transaction as the writes, so an
//! operation observes its own changes. Nothing is visible to other
//! transactions until the store commits.

use crate::error::Error;
use crate::models::*;
use idlecraft_core::{
    Catalog, CategoryXp, Ledger, Listing, ListingId, MarketRecord, Result, Sequence,
    ToolInstanceId, User, UserId, UserItem, UserTool,
};
use native_db::transaction::RwTransaction;

/// Maps native_db failures into the core `Storage` error.
trait OrStorage<T> {
    fn or_storage(self) -> Result<T>;
}

impl<T> OrStorage<T> for std::result::Result<T, native_db::db_type::Error> {
    fn or_storage(self) -> Result<T> {
        self.map_err(|e| Error::from(e).into())
    }
}

pub(crate) struct LedgerTx<'db> {
    pub(crate) rw: RwTransaction<'db>,
}

impl LedgerTx<'_> {
    fn clear_catalog(&mut self) -> Result<()> {
        let items: std::result::Result<Vec<StoredItem>, _> =
            self.rw.scan().primary::<StoredItem>().or_storage()?.all().or_storage()?.collect();
        for row in items.or_storage()? {
            self.rw.remove(row).or_storage()?;
        }

        let tools: std::result::Result<Vec<StoredTool>, _> =
            self.rw.scan().primary::<StoredTool>().or_storage()?.all().or_storage()?.collect();
        for row in tools.or_storage()? {
            self.rw.remove(row).or_storage()?;
        }

        let gens: std::result::Result<Vec<StoredGeneratable>, _> =
            self.rw.scan().primary::<StoredGeneratable>().or_storage()?.all().or_storage()?.collect();
        for row in gens.or_storage()? {
            self.rw.remove(row).or_storage()?;
        }

        let recipes: std::result::Result<Vec<StoredCraftingRecipe>, _> =
            self.rw.scan().primary::<StoredCraftingRecipe>().or_storage()?.all().or_storage()?.collect();
        for row in recipes.or_storage()? {
            self.rw.remove(row).or_storage()?;
        }

        let tool_recipes: std::result::Result<Vec<StoredToolRecipe>, _> =
            self.rw.scan().primary::<StoredToolRecipe>().or_storage()?.all().or_storage()?.collect();
        for row in tool_recipes.or_storage()? {
            self.rw.remove(row).or_storage()?;
        }

        let levels: std::result::Result<Vec<StoredCategoryLevel>, _> =
            self.rw.scan().primary::<StoredCategoryLevel>().or_storage()?.all().or_storage()?.collect();
        for row in levels.or_storage()? {
            self.rw.remove(row).or_storage()?;
        }

        Ok(())
    }
}

impl Ledger for LedgerTx<'_> {
    fn next_id(&mut self, seq: Sequence) -> Result<u64> {
        let name = seq.as_str().to_string();
        let current: Option<StoredSequence> =
            self.rw.get().primary(name.clone()).or_storage()?;
        let value = current
            .map(|s| s.value)
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| Error::Corrupt(format!("sequence '{}' exhausted", name)))?;
        self.rw
            .upsert(StoredSequence { name, value })
            .or_storage()?;
        Ok(value)
    }

    // items and tools come back in key order, every other table in load order
    fn catalog(&self) -> Result<Catalog> {
        let items: std::result::Result<Vec<StoredItem>, _> =
            self.rw.scan().primary::<StoredItem>().or_storage()?.all().or_storage()?.collect();
        let tools: std::result::Result<Vec<StoredTool>, _> =
            self.rw.scan().primary::<StoredTool>().or_storage()?.all().or_storage()?.collect();
        let gens: std::result::Result<Vec<StoredGeneratable>, _> =
            self.rw.scan().primary::<StoredGeneratable>().or_storage()?.all().or_storage()?.collect();
        let recipes: std::result::Result<Vec<StoredCraftingRecipe>, _> =
            self.rw.scan().primary::<StoredCraftingRecipe>().or_storage()?.all().or_storage()?.collect();
        let tool_recipes: std::result::Result<Vec<StoredToolRecipe>, _> =
            self.rw.scan().primary::<StoredToolRecipe>().or_storage()?.all().or_storage()?.collect();
        let levels: std::result::Result<Vec<StoredCategoryLevel>, _> =
            self.rw.scan().primary::<StoredCategoryLevel>().or_storage()?.all().or_storage()?.collect();

        Ok(Catalog {
            items: items.or_storage()?.iter().map(StoredItem::to_item).collect(),
            tools: tools.or_storage()?.into_iter().map(|s| s.tool).collect(),
            generatables: gens.or_storage()?.into_iter().map(|s| s.row).collect(),
            crafting_recipes: recipes.or_storage()?.into_iter().map(|s| s.row).collect(),
            tool_recipes: tool_recipes
                .or_storage()?
                .into_iter()
                .map(|s| s.row)
                .collect(),
            category_levels: levels.or_storage()?.into_iter().map(|s| s.row).collect(),
        })
    }

    fn install_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        self.clear_catalog()?;

        for item in &catalog.items {
            self.rw.insert(StoredItem::from_item(item)).or_storage()?;
        }
        for tool in &catalog.tools {
            self.rw.insert(StoredTool::from_tool(tool)).or_storage()?;
        }
        for (position, row) in catalog.generatables.iter().enumerate() {
            self.rw
                .insert(StoredGeneratable {
                    position: position as u64,
                    row: row.clone(),
                })
                .or_storage()?;
        }
        for (position, row) in catalog.crafting_recipes.iter().enumerate() {
            self.rw
                .insert(StoredCraftingRecipe {
                    position: position as u64,
                    row: row.clone(),
                })
                .or_storage()?;
        }
        for (position, row) in catalog.tool_recipes.iter().enumerate() {
            self.rw
                .insert(StoredToolRecipe {
                    position: position as u64,
                    row: row.clone(),
                })
                .or_storage()?;
        }
        for (position, row) in catalog.category_levels.iter().enumerate() {
            self.rw
                .insert(StoredCategoryLevel {
                    position: position as u64,
                    row: row.clone(),
                })
                .or_storage()?;
        }
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<User>> {
        let stored: Option<StoredUser> = self.rw.get().primary(id.raw()).or_storage()?;
        stored.map(|s| s.to_user()).transpose()
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let stored: Option<StoredUser> = self
            .rw
            .get()
            .secondary(StoredUserKey::username, username.to_string())
            .or_storage()?;
        stored.map(|s| s.to_user()).transpose()
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let stored: Option<StoredUser> = self
            .rw
            .get()
            .secondary(StoredUserKey::email, email.to_string())
            .or_storage()?;
        stored.map(|s| s.to_user()).transpose()
    }

    fn put_user(&mut self, user: &User) -> Result<()> {
        self.rw.upsert(StoredUser::from_user(user)).or_storage()?;
        Ok(())
    }

    fn item_quantity(&self, owner: UserId, item: &str) -> Result<u64> {
        let stored: Option<StoredUserItem> = self
            .rw
            .get()
            .primary(owner_key(owner.raw(), item))
            .or_storage()?;
        Ok(stored.map(|s| s.quantity).unwrap_or(0))
    }

    fn set_item_quantity(&mut self, owner: UserId, item: &str, quantity: u64) -> Result<()> {
        self.rw
            .upsert(StoredUserItem::new(owner, item, quantity))
            .or_storage()?;
        Ok(())
    }

    fn user_items(&self, owner: UserId) -> Result<Vec<UserItem>> {
        let scan = self
            .rw
            .scan()
            .secondary::<StoredUserItem>(StoredUserItemKey::owner)
            .or_storage()?;
        let rows: std::result::Result<Vec<StoredUserItem>, _> =
            scan.start_with(owner.raw()).or_storage()?.collect();
        let mut items: Vec<UserItem> = rows
            .or_storage()?
            .iter()
            .map(StoredUserItem::to_user_item)
            .collect();
        items.sort_by(|a, b| a.item.cmp(&b.item));
        Ok(items)
    }

    fn user_tool(&self, id: ToolInstanceId) -> Result<Option<UserTool>> {
        let stored: Option<StoredUserTool> = self.rw.get().primary(id.raw()).or_storage()?;
        stored.map(|s| s.to_tool()).transpose()
    }

    fn user_tools(&self, owner: UserId) -> Result<Vec<UserTool>> {
        let scan = self
            .rw
            .scan()
            .secondary::<StoredUserTool>(StoredUserToolKey::owner)
            .or_storage()?;
        let rows: std::result::Result<Vec<StoredUserTool>, _> =
            scan.start_with(owner.raw()).or_storage()?.collect();
        let mut tools = rows
            .or_storage()?
            .iter()
            .map(StoredUserTool::to_tool)
            .collect::<Result<Vec<UserTool>>>()?;
        tools.sort_by_key(|t| t.id);
        Ok(tools)
    }

    fn all_user_tools(&self) -> Result<Vec<UserTool>> {
        let scan = self.rw.scan().primary::<StoredUserTool>().or_storage()?;
        let rows: std::result::Result<Vec<StoredUserTool>, _> = scan.all().or_storage()?.collect();
        rows.or_storage()?.iter().map(StoredUserTool::to_tool).collect()
    }

    fn put_user_tool(&mut self, tool: &UserTool) -> Result<()> {
        self.rw
            .upsert(StoredUserTool::from_tool(tool))
            .or_storage()?;
        Ok(())
    }

    fn category_xp(&self, owner: UserId, category: &str) -> Result<Option<CategoryXp>> {
        let stored: Option<StoredCategoryXp> = self
            .rw
            .get()
            .primary(owner_key(owner.raw(), category))
            .or_storage()?;
        Ok(stored.map(|s| s.to_xp()))
    }

    fn category_xps(&self, owner: UserId) -> Result<Vec<CategoryXp>> {
        let scan = self
            .rw
            .scan()
            .secondary::<StoredCategoryXp>(StoredCategoryXpKey::owner)
            .or_storage()?;
        let rows: std::result::Result<Vec<StoredCategoryXp>, _> =
            scan.start_with(owner.raw()).or_storage()?.collect();
        Ok(rows.or_storage()?.iter().map(StoredCategoryXp::to_xp).collect())
    }

    fn put_category_xp(&mut self, xp: &CategoryXp) -> Result<()> {
        self.rw.upsert(StoredCategoryXp::from_xp(xp)).or_storage()?;
        Ok(())
    }

    fn listing(&self, id: ListingId) -> Result<Option<Listing>> {
        let stored: Option<StoredListing> = self.rw.get().primary(id.raw()).or_storage()?;
        stored.map(|s| s.to_listing()).transpose()
    }

    fn listings(&self) -> Result<Vec<Listing>> {
        let scan = self.rw.scan().primary::<StoredListing>().or_storage()?;
        let rows: std::result::Result<Vec<StoredListing>, _> = scan.all().or_storage()?.collect();
        rows.or_storage()?.iter().map(StoredListing::to_listing).collect()
    }

    fn put_listing(&mut self, listing: &Listing) -> Result<()> {
        self.rw
            .upsert(StoredListing::from_listing(listing))
            .or_storage()?;
        Ok(())
    }

    fn remove_listing(&mut self, id: ListingId) -> Result<()> {
        let stored: Option<StoredListing> = self.rw.get().primary(id.raw()).or_storage()?;
        if let Some(s) = stored {
            self.rw.remove(s).or_storage()?;
        }
        Ok(())
    }

    fn append_market_record(&mut self, record: &MarketRecord) -> Result<()> {
        self.rw
            .insert(StoredMarketRecord::from_record(record))
            .or_storage()?;
        Ok(())
    }

    fn market_records_for_item(&self, item: &str) -> Result<Vec<MarketRecord>> {
        let scan = self
            .rw
            .scan()
            .secondary::<StoredMarketRecord>(StoredMarketRecordKey::item)
            .or_storage()?;
        let rows: std::result::Result<Vec<StoredMarketRecord>, _> =
            scan.start_with(item).or_storage()?.collect();
        rows.or_storage()?
            .iter()
            .filter(|r| r.item == item)
            .map(StoredMarketRecord::to_record)
            .collect()
    }

    fn market_records(&self) -> Result<Vec<MarketRecord>> {
        let scan = self.rw.scan().primary::<StoredMarketRecord>().or_storage()?;
        let rows: std::result::Result<Vec<StoredMarketRecord>, _> =
            scan.all().or_storage()?.collect();
        rows.or_storage()?
            .iter()
            .map(StoredMarketRecord::to_record)
            .collect()
    }
}
