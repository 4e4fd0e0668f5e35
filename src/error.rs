//! Error types for shiprate

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// shiprate errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed tariff for {carrier}: {reason}")]
    MalformedTariff { carrier: String, reason: String },

    #[error("Zone '{zone}' is not a column of the {carrier} rate table")]
    UnknownZoneColumn { carrier: String, zone: String },

    #[error("{carrier} has no zone for destination '{destination}'")]
    UnmappedCountry { carrier: String, destination: String },

    #[error("No {carrier} rate covers a weight of {weight} kg")]
    NoApplicableBand { carrier: String, weight: Decimal },

    #[error("{carrier} price for {weight} kg exceeds the representable range")]
    PriceOverflow { carrier: String, weight: Decimal },

    #[error("Invalid weight {0}: must be greater than zero")]
    InvalidWeight(Decimal),

    #[error("Unknown carrier: {0}")]
    UnknownCarrier(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn malformed(carrier: &str, reason: impl Into<String>) -> Self {
        Error::MalformedTariff {
            carrier: carrier.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error only makes one carrier's quote unavailable
    /// instead of failing the whole comparison.
    pub fn is_quote_degradable(&self) -> bool {
        matches!(
            self,
            Error::UnmappedCountry { .. }
                | Error::UnknownZoneColumn { .. }
                | Error::NoApplicableBand { .. }
                | Error::PriceOverflow { .. }
        )
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
