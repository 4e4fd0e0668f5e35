//! Carrier book configuration
//!
//! A carrier book is a YAML file declaring every carrier's raw rate rows,
//! zone-mapping rows and reading conventions. It is loaded once at startup
//! and turned into a [`ShippingDesk`].
//!
//! ```yaml
//! version: 1
//! currency: USD
//! carriers:
//!   - name: DHL
//!     zone_column: "area{zone}"
//!     destination_keys: code_qualified
//!     tier_markers:
//!       - contains: "extra 1kg30.1-99,999"
//!         applies_above: 30
//!         unit_size: 1
//!     rates:
//!       - label: 0.5
//!         prices: { area1: 20.1, area2: 24.3 }
//!     zones:
//!       - destination: "Germany (DE)"
//!         zone: 1
//! ```

use crate::desk::ShippingDesk;
use crate::error::{Error, Result};
use crate::label::MarkerPattern;
use crate::table::{RateTable, RawRow, TableFormat};
use crate::zone::{ZoneCode, ZoneKeyStyle, ZoneMapping};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Supported carrier book schema version
pub const BOOK_VERSION: u32 = 1;

/// Root of a carrier book file
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(
    title = "shiprate carrier book",
    description = "Carrier tariffs and destination zone mappings"
)]
pub struct CarrierBook {
    /// Schema version for migrations
    pub version: u32,

    /// Currency the prices are expressed in (display only)
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Carriers in declaration order; ties between equal quotes go to the
    /// carrier declared first
    #[serde(default)]
    pub carriers: Vec<CarrierConfig>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// One carrier's tariff and zone sheet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CarrierConfig {
    /// Carrier name, unique within the book
    pub name: String,

    /// Date the tariff takes effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<NaiveDate>,

    /// Price column header template containing `{zone}`, e.g. `"Zone {zone}"`.
    /// Headers are zone codes verbatim when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_column: Option<String>,

    /// Whether zone sheet destinations carry a `"(XX)"` country code
    #[serde(default)]
    pub destination_keys: ZoneKeyStyle,

    /// Tier markers not recognized by the generic `extra N kg above M kg` form
    #[serde(default)]
    pub tier_markers: Vec<MarkerPattern>,

    /// Raw rate rows in sheet order
    #[serde(default)]
    pub rates: Vec<RateRowConfig>,

    /// Destination to zone rows
    #[serde(default)]
    pub zones: Vec<ZoneRowConfig>,
}

/// A raw tariff row
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RateRowConfig {
    /// Weight label: a number, `"low-high"`, `"low+"`, a tier marker or blank
    #[serde(default)]
    pub label: LabelValue,

    /// Prices keyed by column header
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
}

/// Row labels may be written as YAML numbers or strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum LabelValue {
    Number(f64),
    Text(String),
}

impl Default for LabelValue {
    fn default() -> Self {
        LabelValue::Text(String::new())
    }
}

impl std::fmt::Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelValue::Number(n) => write!(f, "{}", n),
            LabelValue::Text(s) => f.write_str(s),
        }
    }
}

/// A zone sheet row
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ZoneRowConfig {
    pub destination: String,
    pub zone: ZoneValue,
}

/// Zone codes may be numeric or textual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ZoneValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&ZoneValue> for ZoneCode {
    fn from(value: &ZoneValue) -> Self {
        match value {
            ZoneValue::Int(n) => ZoneCode::from(*n),
            ZoneValue::Float(n) => ZoneCode::new(n.to_string()),
            ZoneValue::Text(s) => ZoneCode::new(s),
        }
    }
}

impl CarrierBook {
    /// Parse and version-check a carrier book
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let book: CarrierBook = serde_norway::from_str(yaml)?;
        if book.version != BOOK_VERSION {
            return Err(Error::Config(format!(
                "Unsupported carrier book version: {}",
                book.version
            )));
        }
        Ok(book)
    }

    /// Load a carrier book file
    pub fn load(path: &Path) -> Result<(Self, String)> {
        let content = std::fs::read_to_string(path)?;
        let book = Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok((book, fingerprint(&content)))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_norway::to_string(self)?)
    }

    pub fn carrier(&self, name: &str) -> Option<&CarrierConfig> {
        self.carriers.iter().find(|c| c.name == name)
    }

    /// Build every carrier's table and zone mapping
    ///
    /// Fails on the first malformed tariff; nothing is quoted from a book
    /// that does not fully validate.
    pub fn build(&self) -> Result<ShippingDesk> {
        let carriers = self
            .carriers
            .iter()
            .map(|c| Ok((c.rate_table()?, c.zone_mapping())))
            .collect::<Result<Vec<_>>>()?;
        let desk = ShippingDesk::new(carriers)?.with_currency(&self.currency);
        info!(
            carriers = desk.carriers().count(),
            currency = %self.currency,
            "carrier book loaded"
        );
        Ok(desk)
    }
}

impl CarrierConfig {
    pub fn table_format(&self) -> TableFormat {
        TableFormat {
            zone_column: self.zone_column.clone(),
            markers: self.tier_markers.clone(),
        }
    }

    pub fn raw_rows(&self) -> Vec<RawRow> {
        self.rates
            .iter()
            .map(|r| RawRow {
                label: r.label.to_string(),
                zone_prices: r.prices.clone(),
            })
            .collect()
    }

    pub fn rate_table(&self) -> Result<RateTable> {
        if let Some(template) = &self.zone_column {
            if !template.contains("{zone}") {
                return Err(Error::Config(format!(
                    "{}: zone_column '{}' must contain {{zone}}",
                    self.name, template
                )));
            }
        }
        RateTable::from_rows(&self.name, &self.raw_rows(), &self.table_format())
    }

    pub fn zone_mapping(&self) -> ZoneMapping {
        ZoneMapping::from_pairs(
            self.name.clone(),
            self.destination_keys,
            self.zones
                .iter()
                .map(|row| (row.destination.as_str(), ZoneCode::from(&row.zone))),
        )
    }
}

/// SHA-256 of a carrier book's source text, hex encoded
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// JSON schema for carrier book files
pub fn book_schema() -> Result<String> {
    let schema = schemars::schema_for!(CarrierBook);
    Ok(serde_json::to_string_pretty(&schema)?)
}
