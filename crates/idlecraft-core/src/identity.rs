//! Identity types for owners, tool instances, listings and catalog keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl UserId {
    /// Create a new user ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Store-wide identifier of an owned tool instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolInstanceId(pub u64);

impl ToolInstanceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ToolInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool:{}", self.0)
    }
}

/// Identifier of a market listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListingId(pub u64);

impl ListingId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listing:{}", self.0)
    }
}

/// Composite natural key of a catalog tool: unique name plus tier
///
/// Ordering is by name first, then tier, so ordered maps keyed by
/// `ToolKey` list every tier of a tool together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolKey {
    pub name: String,
    pub tier: u32,
}

impl ToolKey {
    /// Create a new tool key
    pub fn new(name: impl Into<String>, tier: u32) -> Self {
        Self {
            name: name.into(),
            tier,
        }
    }
}

impl fmt::Display for ToolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.tier)
    }
}

/// Sequences used to allocate store-wide identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    User,
    ToolInstance,
    Listing,
    MarketRecord,
}

impl Sequence {
    /// Stable name used as the persisted counter key
    pub fn as_str(&self) -> &'static str {
        match self {
            Sequence::User => "user",
            Sequence::ToolInstance => "tool_instance",
            Sequence::Listing => "listing",
            Sequence::MarketRecord => "market_record",
        }
    }
}

/// Already-authenticated owner identity handed in by the session layer
///
/// Handlers accept either the numeric id or the unique username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Id(UserId),
    Username(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Id(id) => write!(f, "{}", id),
            Owner::Username(name) => write!(f, "{}", name),
        }
    }
}

impl From<UserId> for Owner {
    fn from(id: UserId) -> Self {
        Owner::Id(id)
    }
}

impl From<&str> for Owner {
    fn from(name: &str) -> Self {
        Owner::Username(name.to_string())
    }
}

impl From<String> for Owner {
    fn from(name: String) -> Self {
        Owner::Username(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_user_id() {
        let id = UserId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "user:42");
    }

    #[test]
    fn test_tool_key_ordering_groups_tiers() {
        let mut map = BTreeMap::new();
        map.insert(ToolKey::new("pickaxe", 2), ());
        map.insert(ToolKey::new("axe", 3), ());
        map.insert(ToolKey::new("pickaxe", 1), ());

        let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["axe#3", "pickaxe#1", "pickaxe#2"]);
    }

    #[test]
    fn test_owner_from() {
        assert_eq!(Owner::from("alice"), Owner::Username("alice".to_string()));
        assert_eq!(Owner::from(UserId::new(7)), Owner::Id(UserId(7)));
    }
}
