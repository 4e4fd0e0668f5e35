//! Shipping desk - quote one destination across every carrier
//!
//! The desk owns each carrier's [`RateTable`] and a [`ZoneResolver`] over
//! their zone mappings. Both are immutable once the desk is built, so a
//! single desk can serve concurrent requests without locking.
//!
//! Per-carrier failures that only mean "this carrier cannot serve the
//! request" become unavailable quotes; the comparison still runs for the
//! other carriers.

use crate::compare::{compare, ComparisonResult};
use crate::engine::{quote, Quote};
use crate::error::{Error, Result};
use crate::table::RateTable;
use crate::zone::{normalize_destination, strip_code_suffix, ZoneCode, ZoneMapping, ZoneResolver};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ShippingDesk {
    tables: Vec<RateTable>,
    resolver: ZoneResolver,
    destinations: Vec<String>,
    currency: String,
}

impl ShippingDesk {
    /// Assemble a desk from `(table, mapping)` pairs in declaration order
    pub fn new(carriers: Vec<(RateTable, ZoneMapping)>) -> Result<Self> {
        let mut tables: Vec<RateTable> = Vec::with_capacity(carriers.len());
        let mut mappings = Vec::with_capacity(carriers.len());

        for (table, mapping) in carriers {
            if table.carrier() != mapping.carrier() {
                return Err(Error::Config(format!(
                    "rate table for {} paired with zone mapping for {}",
                    table.carrier(),
                    mapping.carrier()
                )));
            }
            if tables.iter().any(|t| t.carrier() == table.carrier()) {
                return Err(Error::Config(format!(
                    "carrier {} declared twice",
                    table.carrier()
                )));
            }
            tables.push(table);
            mappings.push(mapping);
        }

        let destinations = merge_destinations(&mappings);
        Ok(Self {
            tables,
            resolver: mappings.into_iter().collect(),
            destinations,
            currency: "USD".to_string(),
        })
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Carrier names in declaration order
    pub fn carriers(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.carrier())
    }

    pub fn table(&self, carrier: &str) -> Option<&RateTable> {
        self.tables.iter().find(|t| t.carrier() == carrier)
    }

    pub fn resolver(&self) -> &ZoneResolver {
        &self.resolver
    }

    /// Destinations any carrier serves, sorted
    ///
    /// A bare name and its code-qualified form (`"Germany"`,
    /// `"Germany (DE)"`) are listed once, code-qualified, since that form
    /// resolves for both key styles.
    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Quote one carrier; degradable failures become an unavailable quote
    pub fn quote_one(&self, carrier: &str, destination: &str, weight: Decimal) -> Result<Quote> {
        check_weight(weight)?;
        let table = self
            .table(carrier)
            .ok_or_else(|| Error::UnknownCarrier(carrier.to_string()))?;

        let zone = match self.resolver.resolve(carrier, destination) {
            Ok(zone) => zone,
            Err(e) => return degrade(carrier, None, weight, e),
        };
        match quote(table, zone, weight) {
            Ok(q) => Ok(q),
            Err(e) => degrade(carrier, Some(zone.clone()), weight, e),
        }
    }

    /// Quote every carrier and compare the results
    pub fn quote_all(&self, destination: &str, weight: Decimal) -> Result<ComparisonResult> {
        check_weight(weight)?;
        let quotes = self
            .carriers()
            .map(|carrier| self.quote_one(carrier, destination, weight))
            .collect::<Result<Vec<_>>>()?;
        Ok(compare(quotes))
    }
}

fn check_weight(weight: Decimal) -> Result<()> {
    if weight <= Decimal::ZERO {
        return Err(Error::InvalidWeight(weight));
    }
    Ok(())
}

fn degrade(
    carrier: &str,
    zone: Option<ZoneCode>,
    weight: Decimal,
    err: Error,
) -> Result<Quote> {
    if !err.is_quote_degradable() {
        return Err(err);
    }
    warn!(carrier, weight = %weight, error = %err, "carrier unavailable");
    Ok(Quote::unavailable(carrier, zone, weight, err.to_string()))
}

fn merge_destinations(mappings: &[ZoneMapping]) -> Vec<String> {
    let mut by_name: BTreeMap<String, String> = BTreeMap::new();
    for name in mappings.iter().flat_map(|m| m.destinations()) {
        let bare = strip_code_suffix(name);
        let qualified = bare.len() < name.trim().len();
        by_name
            .entry(normalize_destination(bare))
            .and_modify(|shown| {
                if qualified && strip_code_suffix(shown).len() == shown.len() {
                    *shown = name.clone();
                }
            })
            .or_insert_with(|| name.clone());
    }
    let mut names: Vec<String> = by_name.into_values().collect();
    names.sort_by_key(|n| n.to_lowercase());
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Outcome;
    use crate::table::{RawRow, TableFormat};
    use crate::zone::ZoneKeyStyle;
    use rust_decimal_macros::dec;

    fn carrier(name: &str, style: ZoneKeyStyle, price: Decimal, dests: &[&str]) -> (RateTable, ZoneMapping) {
        let rows = vec![
            RawRow::new("5", [("1", price)]),
            RawRow::new("10", [("1", price + dec!(8))]),
        ];
        let table = RateTable::from_rows(name, &rows, &TableFormat::default()).unwrap();
        let mapping = ZoneMapping::from_pairs(
            name,
            style,
            dests.iter().map(|d| (*d, ZoneCode::from(1))),
        );
        (table, mapping)
    }

    fn desk() -> ShippingDesk {
        ShippingDesk::new(vec![
            carrier("DHL", ZoneKeyStyle::CodeQualified, dec!(50), &["Germany (DE)", "Japan (JP)"]),
            carrier("FedEx", ZoneKeyStyle::Bare, dec!(40), &["Germany", "Brazil"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_desk_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShippingDesk>();
    }

    #[test]
    fn test_quote_all_ranked() {
        let result = desk().quote_all("Germany (DE)", dec!(5)).unwrap();
        assert_eq!(result.savings_pct(), Some(dec!(20)));
        assert_eq!(result.cheapest().unwrap().carrier, "FedEx");
    }

    #[test]
    fn test_unmapped_degrades_one_carrier() {
        let result = desk().quote_all("Japan (JP)", dec!(5)).unwrap();
        assert_eq!(
            result.outcome,
            Outcome::SoleOption {
                carrier: "DHL".into(),
                price: dec!(50),
            }
        );
        let fedex = &result.quotes[1];
        assert!(!fedex.available);
        assert_eq!(
            fedex.reason.as_deref(),
            Some("FedEx has no zone for destination 'Japan (JP)'")
        );
    }

    #[test]
    fn test_weight_beyond_coverage_degrades() {
        let result = desk().quote_all("Germany (DE)", dec!(12)).unwrap();
        assert!(result.is_no_service());
        assert!(result.quotes.iter().all(|q| q.zone_code.is_some()));
    }

    #[test]
    fn test_unpriced_zone_degrades_one_carrier() {
        let (table, _) = carrier("DHL", ZoneKeyStyle::CodeQualified, dec!(50), &[]);
        let stale = ZoneMapping::from_pairs(
            "DHL",
            ZoneKeyStyle::CodeQualified,
            [("Germany (DE)", ZoneCode::from(9))],
        );
        let desk = ShippingDesk::new(vec![
            (table, stale),
            carrier("FedEx", ZoneKeyStyle::Bare, dec!(40), &["Germany"]),
            carrier("UPS", ZoneKeyStyle::Bare, dec!(45), &["Germany"]),
        ])
        .unwrap();

        let result = desk.quote_all("Germany (DE)", dec!(5)).unwrap();
        let dhl = &result.quotes[0];
        assert!(!dhl.available);
        assert_eq!(dhl.zone_code, Some(ZoneCode::from(9)));
        assert_eq!(
            dhl.reason.as_deref(),
            Some("Zone '9' is not a column of the DHL rate table")
        );
        match result.outcome {
            Outcome::Ranked {
                cheapest,
                most_expensive,
                ..
            } => {
                assert_eq!(cheapest, "FedEx");
                assert_eq!(most_expensive, "UPS");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_weight_fails_whole_request() {
        assert!(matches!(
            desk().quote_all("Germany (DE)", dec!(0)),
            Err(Error::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_unknown_carrier() {
        assert!(matches!(
            desk().quote_one("UPS", "Germany", dec!(1)),
            Err(Error::UnknownCarrier(_))
        ));
    }

    #[test]
    fn test_duplicate_carrier_rejected() {
        let err = ShippingDesk::new(vec![
            carrier("DHL", ZoneKeyStyle::CodeQualified, dec!(50), &["Germany (DE)"]),
            carrier("DHL", ZoneKeyStyle::CodeQualified, dec!(40), &["Germany (DE)"]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_destinations_prefer_code_qualified() {
        assert_eq!(
            desk().destinations(),
            ["Brazil", "Germany (DE)", "Japan (JP)"]
        );
    }
}
