//! Player market: escrowed listings, purchases and trade history
//!
//! Listing an item moves it out of the seller's inventory. It comes back
//! only through cancellation or expiry. Expiry is lazy: every read of the
//! listing table first refunds and deletes listings whose expiry has
//! passed.

use crate::catalog::CatalogIndex;
use crate::error::{Error, Result};
use crate::identity::{ListingId, Owner, Sequence, UserId};
use crate::inventory;
use crate::ledger::Ledger;
use crate::users;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An open sell order; its quantity is held in escrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller: UserId,
    pub item: String,
    pub quantity: u64,
    /// Gold per unit
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Immutable record of a completed purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: u64,
    pub buyer: UserId,
    pub seller: UserId,
    pub item: String,
    pub quantity: u64,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub at: DateTime<Utc>,
}

/// Input of [`list_item`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListing {
    pub item: String,
    pub quantity: u64,
    pub price: Decimal,
    /// Explicit expiry; must lie in the future
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewListing {
    pub fn new(item: impl Into<String>, quantity: u64, price: Decimal) -> Self {
        Self {
            item: item.into(),
            quantity,
            price,
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Result of selling items back to the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSale {
    pub item: String,
    pub quantity: u64,
    pub gold: Decimal,
    /// Seller's gold after the sale
    pub balance: Decimal,
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "price must be a positive number, got {}",
            price
        )));
    }
    Ok(())
}

/// `price × quantity`, or a validation error when it does not fit
fn gold_total(price: Decimal, quantity: u64) -> Result<Decimal> {
    price.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
        Error::Validation(format!("{} × {} overflows the gold range", price, quantity))
    })
}

fn add_gold(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .ok_or_else(|| Error::Validation(format!("gold balance {} cannot take {} more", balance, amount)))
}

/// Put `quantity` of an item up for sale, moving it into escrow
pub fn list_item(
    ledger: &mut dyn Ledger,
    seller: &Owner,
    new: &NewListing,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<Listing> {
    if new.quantity == 0 {
        return Err(Error::Validation("listing quantity must be at least 1".into()));
    }
    validate_price(new.price)?;
    let expires_at = match new.expires_at {
        Some(at) if at <= now => {
            return Err(Error::Validation(format!(
                "expiry {} is not in the future",
                at
            )))
        }
        Some(at) => at,
        None => now + lifetime,
    };

    let user = users::resolve(ledger, seller)?;
    let index = CatalogIndex::new(ledger.catalog()?);
    index.require_item(&new.item)?;

    inventory::deduct(ledger, user.id, &new.item, new.quantity)?;

    let listing = Listing {
        id: ListingId::new(ledger.next_id(Sequence::Listing)?),
        seller: user.id,
        item: new.item.clone(),
        quantity: new.quantity,
        price: new.price,
        created_at: now,
        expires_at,
    };
    ledger.put_listing(&listing)?;
    Ok(listing)
}

/// Refund and delete every listing past its expiry
pub fn expire_listings(ledger: &mut dyn Ledger, now: DateTime<Utc>) -> Result<Vec<Listing>> {
    let mut expired = Vec::new();
    for listing in ledger.listings()? {
        if !listing.is_expired(now) {
            continue;
        }
        inventory::credit(ledger, listing.seller, &listing.item, listing.quantity)?;
        ledger.remove_listing(listing.id)?;
        debug!(listing = %listing.id, seller = %listing.seller, "listing expired");
        expired.push(listing);
    }
    Ok(expired)
}

/// Live listings ordered by id, optionally only those of one item
pub fn fetch_listings(
    ledger: &mut dyn Ledger,
    item: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<Listing>> {
    expire_listings(ledger, now)?;
    let mut listings: Vec<Listing> = ledger
        .listings()?
        .into_iter()
        .filter(|l| item.map_or(true, |i| l.item == i))
        .collect();
    listings.sort_by_key(|l| l.id);
    Ok(listings)
}

/// Buy `quantity` units from a listing
pub fn buy(
    ledger: &mut dyn Ledger,
    buyer: &Owner,
    listing_id: ListingId,
    quantity: u64,
    now: DateTime<Utc>,
) -> Result<MarketRecord> {
    if quantity == 0 {
        return Err(Error::Validation("purchase quantity must be at least 1".into()));
    }
    let mut buyer = users::resolve(ledger, buyer)?;
    let mut listing = ledger
        .listing(listing_id)?
        .filter(|l| !l.is_expired(now))
        .ok_or(Error::ListingNotFound(listing_id))?;

    if listing.seller == buyer.id {
        return Err(Error::SelfTradeForbidden);
    }
    if quantity > listing.quantity {
        return Err(Error::ListingQuantityExceeded {
            listing: listing_id,
            requested: quantity,
            available: listing.quantity,
        });
    }
    let total = gold_total(listing.price, quantity)?;
    if buyer.gold < total {
        return Err(Error::InsufficientGold {
            required: total,
            available: buyer.gold,
        });
    }

    let mut seller = ledger
        .user(listing.seller)?
        .ok_or_else(|| Error::UserNotFound(listing.seller.to_string()))?;
    buyer.gold -= total;
    seller.gold = add_gold(seller.gold, total)?;
    ledger.put_user(&buyer)?;
    ledger.put_user(&seller)?;

    inventory::credit(ledger, buyer.id, &listing.item, quantity)?;

    listing.quantity -= quantity;
    if listing.quantity == 0 {
        ledger.remove_listing(listing.id)?;
    } else {
        ledger.put_listing(&listing)?;
    }

    let record = MarketRecord {
        id: ledger.next_id(Sequence::MarketRecord)?,
        buyer: buyer.id,
        seller: seller.id,
        item: listing.item.clone(),
        quantity,
        unit_price: listing.price,
        total_price: total,
        at: now,
    };
    ledger.append_market_record(&record)?;
    Ok(record)
}

/// Withdraw a listing and refund its remaining quantity to the seller
pub fn cancel(ledger: &mut dyn Ledger, owner: &Owner, listing_id: ListingId) -> Result<Listing> {
    let user = users::resolve(ledger, owner)?;
    let listing = ledger
        .listing(listing_id)?
        .ok_or(Error::ListingNotFound(listing_id))?;
    if listing.seller != user.id {
        return Err(Error::Unauthorized(format!(
            "{} is not the seller of {}",
            user.username, listing_id
        )));
    }

    inventory::credit(ledger, user.id, &listing.item, listing.quantity)?;
    ledger.remove_listing(listing_id)?;
    Ok(listing)
}

/// Completed trades of `item` between two UTC calendar dates, both inclusive
pub fn price_history(
    ledger: &dyn Ledger,
    item: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MarketRecord>> {
    if start > end {
        return Err(Error::Validation(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = end
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let mut records: Vec<MarketRecord> = ledger
        .market_records_for_item(item)?
        .into_iter()
        .filter(|r| r.at >= from && r.at < until)
        .collect();
    records.sort_by(|a, b| a.at.cmp(&b.at).then(a.id.cmp(&b.id)));
    Ok(records)
}

/// Every trade the owner took part in, as buyer or seller, oldest first
pub fn trade_history(ledger: &dyn Ledger, owner: &Owner) -> Result<Vec<MarketRecord>> {
    let user = users::resolve(ledger, owner)?;
    let mut records: Vec<MarketRecord> = ledger
        .market_records()?
        .into_iter()
        .filter(|r| r.buyer == user.id || r.seller == user.id)
        .collect();
    records.sort_by(|a, b| a.at.cmp(&b.at).then(a.id.cmp(&b.id)));
    Ok(records)
}

/// Sell items straight to the game at their catalog gold value
pub fn quick_sell(
    ledger: &mut dyn Ledger,
    owner: &Owner,
    item: &str,
    quantity: u64,
) -> Result<QuickSale> {
    if quantity == 0 {
        return Err(Error::Validation("sell quantity must be at least 1".into()));
    }
    let mut user = users::resolve(ledger, owner)?;
    let index = CatalogIndex::new(ledger.catalog()?);
    let gold_value = index.require_item(item)?.gold_value;

    inventory::deduct(ledger, user.id, item, quantity)?;
    let gold = gold_total(gold_value, quantity)?;
    user.gold = add_gold(user.gold, gold)?;
    ledger.put_user(&user)?;

    Ok(QuickSale {
        item: item.to_string(),
        quantity,
        gold,
        balance: user.gold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::User;
    use crate::catalog::fixtures;
    use crate::error::ErrorKind;
    use crate::ledger::LedgerStore;
    use crate::memory::MemoryStore;
    use chrono::TimeZone;

    const ANN: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn lifetime() -> Duration {
        Duration::days(7)
    }

    fn d(amount: &str) -> Decimal {
        amount.parse().unwrap()
    }

    fn user(id: UserId, name: &str, gold: Decimal) -> User {
        User {
            id,
            username: name.into(),
            email: format!("{}@example.com", name),
            gold,
            energy: 0.0,
            total_level: 1,
            created_at: t0(),
        }
    }

    fn setup() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .transact(|tx| {
                tx.install_catalog(&fixtures::catalog())?;
                tx.put_user(&user(ANN, "ann", Decimal::ZERO))?;
                tx.put_user(&user(BOB, "bob", d("100")))?;
                tx.set_item_quantity(ANN, "ore", 10)
            })
            .unwrap();
        store
    }

    fn list(store: &MemoryStore, quantity: u64, price: &str) -> Result<Listing> {
        store.transact(|tx| {
            list_item(
                tx,
                &Owner::Id(ANN),
                &NewListing::new("ore", quantity, d(price)),
                t0(),
                lifetime(),
            )
        })
    }

    fn qty(store: &MemoryStore, owner: UserId, item: &str) -> u64 {
        store.transact(|tx| tx.item_quantity(owner, item)).unwrap()
    }

    fn gold(store: &MemoryStore, owner: UserId) -> Decimal {
        store.transact(|tx| tx.user(owner)).unwrap().unwrap().gold
    }

    #[test]
    fn test_list_escrows_items() {
        let store = setup();
        let listing = list(&store, 4, "2.5").unwrap();

        assert_eq!(listing.id, ListingId(1));
        assert_eq!(listing.expires_at, t0() + lifetime());
        assert_eq!(qty(&store, ANN, "ore"), 6);
    }

    #[test]
    fn test_list_validation() {
        let store = setup();
        assert_eq!(list(&store, 0, "1").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(list(&store, 1, "0").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(list(&store, 1, "-0.5").unwrap_err().kind(), ErrorKind::Validation);
        assert!(matches!(
            list(&store, 11, "1"),
            Err(Error::InsufficientItems(_))
        ));

        let past = NewListing::new("ore", 1, Decimal::ONE).expiring_at(t0());
        let err = store
            .transact(|tx| list_item(tx, &Owner::Id(ANN), &past, t0(), lifetime()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let unknown = NewListing::new("gem", 1, Decimal::ONE);
        let err = store
            .transact(|tx| list_item(tx, &Owner::Id(ANN), &unknown, t0(), lifetime()))
            .unwrap_err();
        assert_eq!(err, Error::ItemNotFound("gem".into()));
        assert_eq!(qty(&store, ANN, "ore"), 10);
    }

    #[test]
    fn test_partial_then_full_buy() {
        let store = setup();
        let listing = list(&store, 4, "2.5").unwrap();

        let record = store
            .transact(|tx| buy(tx, &Owner::from("bob"), listing.id, 3, t0()))
            .unwrap();
        assert_eq!(record.total_price, d("7.5"));
        assert_eq!(record.unit_price, d("2.5"));
        assert_eq!(gold(&store, BOB), d("92.5"));
        assert_eq!(gold(&store, ANN), d("7.5"));
        assert_eq!(qty(&store, BOB, "ore"), 3);

        let remaining = store
            .transact(|tx| tx.listing(listing.id))
            .unwrap()
            .unwrap();
        assert_eq!(remaining.quantity, 1);

        store
            .transact(|tx| buy(tx, &Owner::from("bob"), listing.id, 1, t0()))
            .unwrap();
        assert!(store.transact(|tx| tx.listing(listing.id)).unwrap().is_none());
        assert_eq!(store.transact(|tx| tx.market_records()).unwrap().len(), 2);
    }

    #[test]
    fn test_exact_balance_covers_fractional_total() {
        let store = setup();
        store
            .transact(|tx| tx.put_user(&user(BOB, "bob", d("0.3"))))
            .unwrap();
        let listing = list(&store, 3, "0.1").unwrap();

        let record = store
            .transact(|tx| buy(tx, &Owner::from("bob"), listing.id, 3, t0()))
            .unwrap();
        assert_eq!(record.total_price, d("0.3"));
        assert_eq!(gold(&store, BOB), Decimal::ZERO);
        assert_eq!(gold(&store, ANN), d("0.3"));
    }

    #[test]
    fn test_repeated_small_trades_keep_balances_exact() {
        let store = setup();
        let listing = list(&store, 10, "0.1").unwrap();
        for _ in 0..10 {
            store
                .transact(|tx| buy(tx, &Owner::from("bob"), listing.id, 1, t0()))
                .unwrap();
        }
        assert_eq!(gold(&store, ANN), Decimal::ONE);
        assert_eq!(gold(&store, BOB), d("99"));
    }

    #[test]
    fn test_gold_overflow_is_rejected() {
        let store = setup();
        let listing = list(&store, 2, &Decimal::MAX.to_string()).unwrap();
        let err = store
            .transact(|tx| buy(tx, &Owner::from("bob"), listing.id, 2, t0()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(gold(&store, BOB), d("100"));
    }

    #[test]
    fn test_buy_failures_leave_state_untouched() {
        let store = setup();
        let listing = list(&store, 4, "30").unwrap();

        let attempt = |owner: &str, quantity: u64, now: DateTime<Utc>| {
            store
                .transact(|tx| buy(tx, &Owner::from(owner), listing.id, quantity, now))
                .unwrap_err()
        };

        assert_eq!(attempt("ann", 1, t0()), Error::SelfTradeForbidden);
        assert_eq!(
            attempt("bob", 5, t0()),
            Error::ListingQuantityExceeded {
                listing: listing.id,
                requested: 5,
                available: 4
            }
        );
        assert_eq!(
            attempt("bob", 4, t0()),
            Error::InsufficientGold {
                required: d("120"),
                available: d("100")
            }
        );
        let late = t0() + lifetime() + Duration::seconds(1);
        assert_eq!(attempt("bob", 1, late), Error::ListingNotFound(listing.id));

        assert_eq!(gold(&store, BOB), d("100"));
        assert_eq!(qty(&store, BOB, "ore"), 0);
        assert!(store.transact(|tx| tx.market_records()).unwrap().is_empty());
    }

    #[test]
    fn test_cancel() {
        let store = setup();
        let listing = list(&store, 4, "1").unwrap();

        let err = store
            .transact(|tx| cancel(tx, &Owner::from("bob"), listing.id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(qty(&store, ANN, "ore"), 6);

        store
            .transact(|tx| cancel(tx, &Owner::from("ann"), listing.id))
            .unwrap();
        assert_eq!(qty(&store, ANN, "ore"), 10);
        assert_eq!(
            store
                .transact(|tx| cancel(tx, &Owner::from("ann"), listing.id))
                .unwrap_err(),
            Error::ListingNotFound(listing.id)
        );
    }

    #[test]
    fn test_fetch_expires_lazily() {
        let store = setup();
        let old = list(&store, 4, "1").unwrap();
        let fresh = store
            .transact(|tx| {
                tx.set_item_quantity(ANN, "coal", 2)?;
                list_item(
                    tx,
                    &Owner::Id(ANN),
                    &NewListing::new("coal", 2, Decimal::ONE),
                    t0() + Duration::days(3),
                    lifetime(),
                )
            })
            .unwrap();

        // exactly at expiry the listing is still live
        let at_expiry = store
            .transact(|tx| fetch_listings(tx, None, old.expires_at))
            .unwrap();
        assert_eq!(at_expiry.len(), 2);

        let later = t0() + lifetime() + Duration::seconds(1);
        let live = store
            .transact(|tx| fetch_listings(tx, None, later))
            .unwrap();
        assert_eq!(live, vec![fresh.clone()]);
        assert_eq!(qty(&store, ANN, "ore"), 10);
        assert!(store.transact(|tx| tx.listing(old.id)).unwrap().is_none());

        let ore_only = store
            .transact(|tx| fetch_listings(tx, Some("ore"), later))
            .unwrap();
        assert!(ore_only.is_empty());
    }

    #[test]
    fn test_price_history_range() {
        let store = setup();
        store
            .transact(|tx| {
                for (id, day, hour) in [(1, 1, 9), (2, 2, 23), (3, 3, 0), (4, 2, 1)] {
                    tx.append_market_record(&MarketRecord {
                        id,
                        buyer: BOB,
                        seller: ANN,
                        item: "ore".into(),
                        quantity: 1,
                        unit_price: Decimal::ONE,
                        total_price: Decimal::ONE,
                        at: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
                    })?;
                }
                Ok(())
            })
            .unwrap();

        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let ids: Vec<u64> = store
            .transact(|tx| price_history(tx, "ore", day(1), day(2)))
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 4, 2]);

        let err = store
            .transact(|tx| price_history(tx, "ore", day(3), day(1)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let others = store
            .transact(|tx| price_history(tx, "coal", day(1), day(3)))
            .unwrap();
        assert!(others.is_empty());
    }

    #[test]
    fn test_trade_history_and_quick_sell() {
        let store = setup();
        let listing = list(&store, 2, "5").unwrap();
        store
            .transact(|tx| buy(tx, &Owner::from("bob"), listing.id, 2, t0()))
            .unwrap();

        let history = store
            .transact(|tx| trade_history(tx, &Owner::from("ann")))
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].seller, ANN);

        let sale = store
            .transact(|tx| quick_sell(tx, &Owner::from("ann"), "ore", 3))
            .unwrap();
        assert_eq!(sale.gold, d("3"));
        assert_eq!(sale.balance, d("13"));
        assert_eq!(qty(&store, ANN, "ore"), 5);

        assert!(matches!(
            store.transact(|tx| quick_sell(tx, &Owner::from("ann"), "ore", 6)),
            Err(Error::InsufficientItems(_))
        ));
        assert_eq!(
            store
                .transact(|tx| quick_sell(tx, &Owner::from("ann"), "ore", 0))
                .unwrap_err()
                .kind(),
            ErrorKind::Validation
        );
    }
}
