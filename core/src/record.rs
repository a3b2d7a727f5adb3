use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CoinId = String;

/// A single coin row as kept by the coin store. The search core never mutates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    pub id: CoinId,
    pub name: String,
    pub symbol: String,
    /// Price in USD.
    #[serde(default, alias = "current_price")]
    pub price_usd: Option<f64>,
    /// 24h change, in percent.
    #[serde(default, alias = "price_change_percentage_24h")]
    pub change_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    /// ISO-8601 timestamp of the last collector update.
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl CoinRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            symbol: symbol.into(),
            price_usd: None,
            change_24h: None,
            market_cap: None,
            last_updated: None,
        }
    }

    pub fn with_price(mut self, price_usd: f64) -> Self {
        self.price_usd = Some(price_usd);
        self
    }

    /// Value of one of the searchable text fields.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Name => &self.name,
            Field::Symbol => &self.symbol,
        }
    }
}

/// Text fields that can be scanned directly in the coin store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Id,
    Name,
    Symbol,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Id, Field::Name, Field::Symbol];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Symbol => "symbol",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field '{}', expected one of id, name, symbol", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Field::Id),
            "name" => Ok(Field::Name),
            "symbol" => Ok(Field::Symbol),
            other => Err(UnknownField(other.to_string())),
        }
    }
}
