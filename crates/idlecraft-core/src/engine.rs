//! Engine façade: one transaction per operation
//!
//! The engine owns a [`LedgerStore`], the gameplay config, a clock and the
//! generation RNG. Each method reads `now` once, runs the matching
//! operation inside a single read-write transaction and logs the outcome.

use crate::account::{NewUser, User, UserTool};
use crate::catalog::{Catalog, CatalogIndex};
use crate::config::EngineConfig;
use crate::crafting::{self, ReconcileReport};
use crate::error::Result;
use crate::generation::{self, GenerationReport};
use crate::identity::{ListingId, Owner, ToolInstanceId, ToolKey};
use crate::ledger::LedgerStore;
use crate::market::{self, Listing, MarketRecord, NewListing, QuickSale};
use crate::reports::{self, CraftingRecipeEntry, InventoryReport, ToolRecipeEntry};
use crate::rng::GameRng;
use crate::time::{Clock, SystemClock};
use crate::toolcraft::{self, ToolCraftOutcome};
use crate::users;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Gameplay entry point over a ledger store
pub struct Engine<S: LedgerStore> {
    store: S,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<GameRng>,
}

impl<S: LedgerStore> Engine<S> {
    /// Create an engine on the system clock
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create an engine on a custom clock
    ///
    /// Without a configured seed the RNG is seeded from the clock.
    pub fn with_clock(store: S, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let seed = config
            .rng_seed
            .unwrap_or_else(|| clock.now().timestamp_millis() as u64);
        Self {
            store,
            config,
            clock,
            rng: Mutex::new(GameRng::new(seed)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Validate and install static content, replacing what was there
    pub fn install_catalog(&self, catalog: &Catalog) -> Result<()> {
        catalog.validate()?;
        self.store.transact(|tx| tx.install_catalog(catalog))?;
        info!(
            items = catalog.items.len(),
            tools = catalog.tools.len(),
            recipes = catalog.crafting_recipes.len(),
            tool_recipes = catalog.tool_recipes.len(),
            "catalog installed"
        );
        Ok(())
    }

    pub fn catalog(&self) -> Result<CatalogIndex> {
        let catalog = self.store.transact(|tx| tx.catalog())?;
        Ok(CatalogIndex::new(catalog))
    }

    // --- accounts ---

    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let now = self.now();
        let user = self
            .store
            .transact(|tx| users::create_user(tx, new_user, &self.config, now))?;
        info!(user = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub fn user(&self, owner: &Owner) -> Result<User> {
        self.store.transact(|tx| users::resolve(tx, owner))
    }

    pub fn toggle_tool(&self, owner: &Owner, tool: ToolInstanceId) -> Result<UserTool> {
        let tool = self
            .store
            .transact(|tx| users::toggle_tool(tx, owner, tool))?;
        debug!(tool = %tool.id, enabled = tool.is_enabled, "tool toggled");
        Ok(tool)
    }

    // --- sweeps ---

    /// Run one generation sweep as a single batch
    ///
    /// The RNG only advances when the batch commits, so a retried sweep
    /// replays the same rolls.
    pub fn run_generation_tick(&self) -> Result<GenerationReport> {
        let mut rng = self.rng.lock();
        let mut draft = rng.clone();
        let multiplier = self.config.xp_multiplier;
        match self
            .store
            .transact(|tx| generation::run_sweep(tx, &mut draft, multiplier))
        {
            Ok(report) => {
                *rng = draft;
                debug!(
                    tools = report.tools_processed,
                    grants = report.grants.len(),
                    skipped = report.skipped.len(),
                    capped = report.capped.len(),
                    "generation tick"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "generation tick aborted");
                Err(e)
            }
        }
    }

    /// Advance every occupied tool to the current time
    pub fn run_crafting_reconcile(&self) -> Result<ReconcileReport> {
        let now = self.now();
        let multiplier = self.config.xp_multiplier;
        match self
            .store
            .transact(|tx| crafting::reconcile(tx, now, multiplier))
        {
            Ok(report) => {
                debug!(
                    scanned = report.scanned,
                    progressed = report.progressed.len(),
                    finished = report.finished().count(),
                    "crafting reconcile"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "crafting reconcile aborted");
                Err(e)
            }
        }
    }

    // --- crafting ---

    pub fn start_crafting(&self, owner: &Owner, item: &str, quantity: u64) -> Result<UserTool> {
        let now = self.now();
        let tool = self
            .store
            .transact(|tx| crafting::start(tx, owner, item, quantity, now))?;
        info!(owner = %owner, item, quantity, tool = %tool.id, "crafting started");
        Ok(tool)
    }

    pub fn craft_tool(&self, owner: &Owner, name: &str, tier: u32) -> Result<ToolCraftOutcome> {
        let now = self.now();
        let outcome = self
            .store
            .transact(|tx| toolcraft::craft_tool(tx, owner, name, tier, now))?;
        match &outcome {
            ToolCraftOutcome::Crafted(tool) => {
                info!(owner = %owner, tool = %tool.key(), instance = tool.instance_no, "tool crafted")
            }
            ToolCraftOutcome::Upgraded { tool, from_tier } => {
                info!(owner = %owner, tool = %tool.key(), from_tier, "tool upgraded")
            }
        }
        Ok(outcome)
    }

    // --- market ---

    pub fn list_item(&self, owner: &Owner, listing: &NewListing) -> Result<Listing> {
        let now = self.now();
        let lifetime = self.config.listing_lifetime();
        let listing = self
            .store
            .transact(|tx| market::list_item(tx, owner, listing, now, lifetime))?;
        info!(
            listing = %listing.id,
            item = %listing.item,
            quantity = listing.quantity,
            price = %listing.price,
            "listing created"
        );
        Ok(listing)
    }

    /// Live listings, expiring stale ones first
    pub fn listings(&self, item: Option<&str>) -> Result<Vec<Listing>> {
        let now = self.now();
        self.store
            .transact(|tx| market::fetch_listings(tx, item, now))
    }

    pub fn expire_listings(&self) -> Result<Vec<Listing>> {
        let now = self.now();
        let expired = self
            .store
            .transact(|tx| market::expire_listings(tx, now))?;
        if !expired.is_empty() {
            info!(count = expired.len(), "listings expired");
        }
        Ok(expired)
    }

    pub fn buy(&self, buyer: &Owner, listing: ListingId, quantity: u64) -> Result<MarketRecord> {
        let now = self.now();
        let record = self
            .store
            .transact(|tx| market::buy(tx, buyer, listing, quantity, now))?;
        info!(
            %listing,
            buyer = %record.buyer,
            seller = %record.seller,
            quantity,
            total = %record.total_price,
            "listing purchased"
        );
        Ok(record)
    }

    pub fn cancel_listing(&self, owner: &Owner, listing: ListingId) -> Result<Listing> {
        let listing = self
            .store
            .transact(|tx| market::cancel(tx, owner, listing))?;
        info!(listing = %listing.id, "listing cancelled");
        Ok(listing)
    }

    pub fn price_history(
        &self,
        item: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarketRecord>> {
        self.store
            .transact(|tx| market::price_history(tx, item, start, end))
    }

    pub fn trade_history(&self, owner: &Owner) -> Result<Vec<MarketRecord>> {
        self.store.transact(|tx| market::trade_history(tx, owner))
    }

    pub fn quick_sell(&self, owner: &Owner, item: &str, quantity: u64) -> Result<QuickSale> {
        let sale = self
            .store
            .transact(|tx| market::quick_sell(tx, owner, item, quantity))?;
        info!(owner = %owner, item, quantity, gold = %sale.gold, "items sold");
        Ok(sale)
    }

    // --- reports ---

    pub fn inventory(&self, owner: &Owner) -> Result<InventoryReport> {
        self.store
            .transact(|tx| reports::inventory_by_category(tx, owner))
    }

    pub fn tools(&self, owner: &Owner) -> Result<BTreeMap<String, Vec<UserTool>>> {
        self.store
            .transact(|tx| reports::tools_by_category(tx, owner))
    }

    pub fn tool_recipe_book(&self) -> Result<BTreeMap<ToolKey, ToolRecipeEntry>> {
        Ok(reports::tool_recipe_book(&self.catalog()?))
    }

    pub fn crafting_recipe_book(&self) -> Result<BTreeMap<String, CraftingRecipeEntry>> {
        Ok(reports::crafting_recipe_book(&self.catalog()?))
    }
}
