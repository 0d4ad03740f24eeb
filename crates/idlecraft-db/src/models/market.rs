//! Market models: open listings and the purchase history.

use idlecraft_core::time::from_millis;
use idlecraft_core::{Listing, ListingId, MarketRecord, Result, UserId};
use native_db::*;
use native_model::{native_model, Model};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stored market listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 20, version = 1)]
#[native_db]
pub struct StoredListing {
    /// Primary key - listing ID.
    #[primary_key]
    pub id: u64,
    #[secondary_key]
    pub seller: u64,
    pub item: String,
    pub quantity: u64,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
}

impl StoredListing {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            id: listing.id.raw(),
            seller: listing.seller.raw(),
            item: listing.item.clone(),
            quantity: listing.quantity,
            price: listing.price,
            created_at_ms: listing.created_at.timestamp_millis(),
            expires_at_ms: listing.expires_at.timestamp_millis(),
        }
    }

    pub fn to_listing(&self) -> Result<Listing> {
        Ok(Listing {
            id: ListingId::new(self.id),
            seller: UserId::new(self.seller),
            item: self.item.clone(),
            quantity: self.quantity,
            price: self.price,
            created_at: from_millis(self.created_at_ms)?,
            expires_at: from_millis(self.expires_at_ms)?,
        })
    }
}

/// Stored purchase record. Never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 21, version = 1)]
#[native_db]
pub struct StoredMarketRecord {
    /// Primary key - record ID.
    #[primary_key]
    pub id: u64,
    /// Item traded; scanned by prefix, so callers re-check equality.
    #[secondary_key]
    pub item: String,
    pub buyer: u64,
    pub seller: u64,
    pub quantity: u64,
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
    pub at_ms: i64,
}

impl StoredMarketRecord {
    pub fn from_record(record: &MarketRecord) -> Self {
        Self {
            id: record.id,
            item: record.item.clone(),
            buyer: record.buyer.raw(),
            seller: record.seller.raw(),
            quantity: record.quantity,
            unit_price: record.unit_price,
            total_price: record.total_price,
            at_ms: record.at.timestamp_millis(),
        }
    }

    pub fn to_record(&self) -> Result<MarketRecord> {
        Ok(MarketRecord {
            id: self.id,
            buyer: UserId::new(self.buyer),
            seller: UserId::new(self.seller),
            item: self.item.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: self.total_price,
            at: from_millis(self.at_ms)?,
        })
    }
}
