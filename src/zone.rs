//! Destination to zone resolution
//!
//! Each carrier prices by its own zone codes and keys its zone sheet in its
//! own way: some list `"Germany (DE)"`, others just `"Germany"`. The key
//! style is declared per carrier; queries are normalized accordingly and
//! an unmatched destination is an error, never a guessed zone.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use tracing::warn;

/// A carrier-specific zone code
///
/// Numeric codes are normalized so that `3`, `3.0` and `"3"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneCode(String);

impl ZoneCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        let trimmed = code.as_ref().trim();
        match Decimal::from_str(trimmed) {
            Ok(n) => ZoneCode(n.normalize().to_string()),
            Err(_) => ZoneCode(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ZoneCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneCode {
    fn from(s: &str) -> Self {
        ZoneCode::new(s)
    }
}

impl From<i64> for ZoneCode {
    fn from(n: i64) -> Self {
        ZoneCode(n.to_string())
    }
}

/// How a carrier keys its destination names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKeyStyle {
    /// Keys carry the country code: `"Germany (DE)"`
    #[default]
    CodeQualified,
    /// Keys omit the code; queries have a trailing `"(XX)"` stripped
    Bare,
}

/// Collapse whitespace and fold case
pub fn normalize_destination(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip a trailing parenthetical code: `"Germany (DE)"` -> `"Germany"`
///
/// Names that are nothing but a parenthetical are returned unchanged.
pub fn strip_code_suffix(name: &str) -> &str {
    let trimmed = name.trim();
    if !trimmed.ends_with(')') {
        return trimmed;
    }
    match trimmed.rfind('(') {
        Some(open) => {
            let head = trimmed[..open].trim_end();
            if head.is_empty() {
                trimmed
            } else {
                head
            }
        }
        None => trimmed,
    }
}

/// One carrier's destination -> zone table
#[derive(Debug, Clone)]
pub struct ZoneMapping {
    carrier: String,
    style: ZoneKeyStyle,
    entries: HashMap<String, ZoneCode>,
    destinations: Vec<String>,
}

impl ZoneMapping {
    pub fn new(carrier: impl Into<String>, style: ZoneKeyStyle) -> Self {
        Self {
            carrier: carrier.into(),
            style,
            entries: HashMap::new(),
            destinations: Vec::new(),
        }
    }

    pub fn from_pairs<I, S>(carrier: impl Into<String>, style: ZoneKeyStyle, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, ZoneCode)>,
        S: AsRef<str>,
    {
        let mut mapping = Self::new(carrier, style);
        for (destination, zone) in pairs {
            mapping.insert(destination.as_ref(), zone);
        }
        mapping
    }

    /// Add a row. The first row for a destination wins; returns false when
    /// the row was ignored as a duplicate.
    pub fn insert(&mut self, destination: &str, zone: ZoneCode) -> bool {
        let key = normalize_destination(destination);
        if key.is_empty() {
            return false;
        }
        if let Some(existing) = self.entries.get(&key) {
            if *existing != zone {
                warn!(
                    carrier = %self.carrier,
                    destination,
                    kept = %existing,
                    ignored = %zone,
                    "conflicting duplicate zone row"
                );
            }
            return false;
        }
        self.entries.insert(key, zone);
        self.destinations.push(destination.trim().to_string());
        true
    }

    /// Resolve a destination name to this carrier's zone code
    pub fn resolve(&self, destination: &str) -> Result<&ZoneCode> {
        // exact key first; bare keys may themselves end in a parenthetical
        let exact = self.entries.get(&normalize_destination(destination));
        let found = match self.style {
            ZoneKeyStyle::CodeQualified => exact,
            ZoneKeyStyle::Bare => exact.or_else(|| {
                self.entries
                    .get(&normalize_destination(strip_code_suffix(destination)))
            }),
        };
        found.ok_or_else(|| Error::UnmappedCountry {
            carrier: self.carrier.clone(),
            destination: destination.trim().to_string(),
        })
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn style(&self) -> ZoneKeyStyle {
        self.style
    }

    /// Destination names in declaration order
    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Distinct zone codes referenced by the mapping
    pub fn zone_codes(&self) -> BTreeSet<&ZoneCode> {
        self.entries.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Zone mappings for every carrier, looked up by carrier name
#[derive(Debug, Clone, Default)]
pub struct ZoneResolver {
    mappings: HashMap<String, ZoneMapping>,
}

impl ZoneResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mapping: ZoneMapping) {
        self.mappings.insert(mapping.carrier.clone(), mapping);
    }

    pub fn mapping(&self, carrier: &str) -> Option<&ZoneMapping> {
        self.mappings.get(carrier)
    }

    pub fn resolve(&self, carrier: &str, destination: &str) -> Result<&ZoneCode> {
        self.mappings
            .get(carrier)
            .ok_or_else(|| Error::UnknownCarrier(carrier.to_string()))?
            .resolve(destination)
    }
}

impl FromIterator<ZoneMapping> for ZoneResolver {
    fn from_iter<T: IntoIterator<Item = ZoneMapping>>(iter: T) -> Self {
        let mut resolver = ZoneResolver::new();
        for mapping in iter {
            resolver.add(mapping);
        }
        resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dhl() -> ZoneMapping {
        ZoneMapping::from_pairs(
            "DHL",
            ZoneKeyStyle::CodeQualified,
            vec![
                ("Germany (DE)", ZoneCode::from(3)),
                ("United States (US)", ZoneCode::from(5)),
            ],
        )
    }

    fn fedex() -> ZoneMapping {
        ZoneMapping::from_pairs(
            "FedEx",
            ZoneKeyStyle::Bare,
            vec![
                ("Germany", ZoneCode::new("K")),
                ("United States", ZoneCode::new("E")),
            ],
        )
    }

    #[test]
    fn test_zone_code_normalization() {
        assert_eq!(ZoneCode::new("3.0"), ZoneCode::from(3));
        assert_eq!(ZoneCode::new(" 3 "), ZoneCode::new("3"));
        assert_eq!(ZoneCode::new("A").as_str(), "A");
    }

    #[test]
    fn test_strip_code_suffix() {
        assert_eq!(strip_code_suffix("Germany (DE)"), "Germany");
        assert_eq!(strip_code_suffix("Germany"), "Germany");
        assert_eq!(strip_code_suffix("Korea, South (KR) "), "Korea, South");
        assert_eq!(strip_code_suffix("(DE)"), "(DE)");
    }

    #[test]
    fn test_code_qualified_resolution() {
        let mapping = dhl();
        assert_eq!(mapping.resolve("Germany (DE)").unwrap(), &ZoneCode::from(3));
        assert_eq!(
            mapping.resolve("  germany   (de)").unwrap(),
            &ZoneCode::from(3)
        );
        assert!(matches!(
            mapping.resolve("Germany"),
            Err(Error::UnmappedCountry { .. })
        ));
    }

    #[test]
    fn test_bare_resolution_strips_code() {
        let mapping = fedex();
        assert_eq!(mapping.resolve("Germany (DE)").unwrap(), &ZoneCode::new("K"));
        assert_eq!(mapping.resolve("Germany").unwrap(), &ZoneCode::new("K"));
    }

    #[test]
    fn test_bare_key_with_parenthetical() {
        let mapping = ZoneMapping::from_pairs(
            "FedEx",
            ZoneKeyStyle::Bare,
            vec![
                ("Korea (South)", ZoneCode::new("C")),
                ("Germany", ZoneCode::new("K")),
            ],
        );
        assert_eq!(mapping.resolve("Korea (South)").unwrap(), &ZoneCode::new("C"));
        assert_eq!(mapping.resolve("korea  (south)").unwrap(), &ZoneCode::new("C"));
        assert_eq!(mapping.resolve("Germany (DE)").unwrap(), &ZoneCode::new("K"));
        assert!(matches!(
            mapping.resolve("Korea (KR)"),
            Err(Error::UnmappedCountry { .. })
        ));
    }

    #[test]
    fn test_unmapped_never_guesses() {
        let err = fedex().resolve("Atlantis (AT)").unwrap_err();
        match err {
            Error::UnmappedCountry {
                carrier,
                destination,
            } => {
                assert_eq!(carrier, "FedEx");
                assert_eq!(destination, "Atlantis (AT)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_duplicate_wins() {
        let mut mapping = ZoneMapping::new("DHL", ZoneKeyStyle::CodeQualified);
        assert!(mapping.insert("France (FR)", ZoneCode::from(2)));
        assert!(!mapping.insert("FRANCE (FR)", ZoneCode::from(7)));
        assert_eq!(mapping.resolve("France (FR)").unwrap(), &ZoneCode::from(2));
        assert_eq!(mapping.destinations(), ["France (FR)".to_string()]);
    }

    #[test]
    fn test_resolver_by_carrier() {
        let resolver: ZoneResolver = vec![dhl(), fedex()].into_iter().collect();
        assert_eq!(
            resolver.resolve("FedEx", "United States (US)").unwrap(),
            &ZoneCode::new("E")
        );
        assert!(matches!(
            resolver.resolve("UPS", "Germany"),
            Err(Error::UnknownCarrier(_))
        ));
    }
}
