use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

/// Wallet address, the identity used throughout the ledgers. Stored
/// lowercase so comparisons never depend on the casing a wallet or a
/// client happened to report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("address must be a non-empty string")]
pub struct AddressParseError;

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AddressParseError);
        }
        Ok(Address(trimmed.to_lowercase()))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipResult {
    Heads,
    Tails,
}

impl FlipResult {
    /// Heads wins, tails loses.
    pub fn is_win(&self) -> bool {
        matches!(self, FlipResult::Heads)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("flip result must be \"heads\" or \"tails\"")]
pub struct FlipResultParseError;

impl FromStr for FlipResult {
    type Err = FlipResultParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "heads" => Ok(FlipResult::Heads),
            "tails" => Ok(FlipResult::Tails),
            _ => Err(FlipResultParseError),
        }
    }
}

impl fmt::Display for FlipResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlipResult::Heads => f.write_str("heads"),
            FlipResult::Tails => f.write_str("tails"),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    /// Decimal amount as a string, e.g. "0.5".
    pub price: String,
    /// Data URI or plain URL; produced client-side, never rewritten here.
    pub image: String,
    // Read by the purchased view, never written by any current path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchased: Option<String>,
}

impl NftMetadata {
    pub fn new(name: &str, description: &str, price: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            price: price.to_string(),
            image: image.to_string(),
            purchased: None,
        }
    }

    pub fn is_purchased(&self) -> bool {
        self.purchased.as_deref() == Some("true")
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftEntry {
    pub id: u64,
    pub token_id: String,
    pub owner: Address,
    pub metadata: NftMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEntry {
    pub id: u64,
    pub player: Address,
    pub result: FlipResult,
    // Carried for table-layout compatibility; no write path populates it.
    pub reward: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of a mint request. Fields are optional so that absent values reach
/// the ledger's validation instead of failing in deserialization.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MintRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl MintRequest {
    pub fn new(
        name: &str,
        description: &str,
        price: &str,
        image: &str,
        owner: &Address,
    ) -> Self {
        Self {
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            price: Some(price.to_string()),
            image: Some(image.to_string()),
            owner: Some(owner.to_string()),
        }
    }
}
