//! Rate tables - validated carrier tariffs
//!
//! A [`RateTable`] is built once from raw rows and is read-only afterwards.
//! Construction is two passes:
//!
//! 1. [`parse_rows`] classifies every row label and maps column headers to
//!    zone codes, producing one [`ParsedRow`] per raw row.
//! 2. [`RateTable::from_parsed`] checks the structural invariants and
//!    assembles flat breakpoints, tier rules and band rules.
//!
//! Any structural defect fails with [`Error::MalformedTariff`]; no query
//! ever runs against a table that did not validate.

use crate::error::{Error, Result};
use crate::label::{BandRange, LabelClassifier, MarkerPattern, RowLabel, TierMarker};
use crate::zone::ZoneCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Prices keyed by zone code
pub type ZonePrices = BTreeMap<ZoneCode, Decimal>;

/// A row as produced by the loader: label text plus prices keyed by
/// column header
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub label: String,
    pub zone_prices: BTreeMap<String, Decimal>,
}

impl RawRow {
    pub fn new<I, S>(label: impl Into<String>, prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            zone_prices: prices.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Carrier-specific conventions needed to read raw rows
#[derive(Debug, Clone, Default)]
pub struct TableFormat {
    /// Column header template containing `{zone}`, e.g. `"Zone {zone}"`.
    /// Headers are used verbatim as zone codes when unset.
    pub zone_column: Option<String>,

    /// Tier markers the generic label pattern does not recognize
    pub markers: Vec<MarkerPattern>,
}

impl TableFormat {
    pub fn with_zone_column(mut self, template: impl Into<String>) -> Self {
        self.zone_column = Some(template.into());
        self
    }

    pub fn with_marker(mut self, marker: MarkerPattern) -> Self {
        self.markers.push(marker);
        self
    }

    /// Map a column header to a zone code, ignoring ASCII case around the
    /// `{zone}` placeholder
    fn zone_for_header(&self, header: &str) -> Option<ZoneCode> {
        let header = header.trim();
        let Some(template) = &self.zone_column else {
            return (!header.is_empty()).then(|| ZoneCode::new(header));
        };
        let (prefix, suffix) = template.split_once("{zone}")?;
        let end = header.len().checked_sub(suffix.len())?;
        if end < prefix.len()
            || !header.get(..prefix.len())?.eq_ignore_ascii_case(prefix)
            || !header.get(end..)?.eq_ignore_ascii_case(suffix)
        {
            return None;
        }
        let code = header.get(prefix.len()..end)?.trim();
        (!code.is_empty()).then(|| ZoneCode::new(code))
    }
}

/// Weight key of a priced row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightBound {
    Exact(Decimal),
    Band(BandRange),
}

/// One classified row
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub label: String,
    pub class: RowLabel,
    pub prices: ZonePrices,
}

impl ParsedRow {
    /// The row as a priced rate row, if it is one
    pub fn as_rate_row(&self) -> Option<RateRow> {
        let weight_bound = match self.class {
            RowLabel::Flat(w) => WeightBound::Exact(w),
            RowLabel::Band(range) => WeightBound::Band(range),
            _ => return None,
        };
        Some(RateRow {
            weight_bound,
            prices: self.prices.clone(),
        })
    }
}

/// A priced row keyed by a breakpoint or a band
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub weight_bound: WeightBound,
    pub prices: ZonePrices,
}

/// Flat price published at one breakpoint
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRate {
    pub breakpoint: Decimal,
    pub prices: ZonePrices,
}

/// Per-unit surcharge accruing above a threshold
#[derive(Debug, Clone, PartialEq)]
pub struct TierRule {
    pub applies_above: Decimal,
    pub unit_size: Decimal,
    pub per_unit_price: ZonePrices,
}

/// Per-kilogram price applied to the whole weight within a range
#[derive(Debug, Clone, PartialEq)]
pub struct BandRule {
    pub range: BandRange,
    pub per_unit_price: ZonePrices,
}

/// Classify raw rows and map their headers to zone codes
pub fn parse_rows(carrier: &str, rows: &[RawRow], format: &TableFormat) -> Result<Vec<ParsedRow>> {
    let classifier = LabelClassifier::new(format.markers.clone());
    rows.iter()
        .map(|row| {
            let mut prices = ZonePrices::new();
            for (header, price) in &row.zone_prices {
                let zone = format.zone_for_header(header).ok_or_else(|| {
                    Error::malformed(
                        carrier,
                        format!("column '{}' does not name a zone", header),
                    )
                })?;
                if *price < Decimal::ZERO {
                    return Err(Error::malformed(
                        carrier,
                        format!("row '{}' has a negative price for zone {}", row.label, zone),
                    ));
                }
                if prices.insert(zone.clone(), *price).is_some() {
                    return Err(Error::malformed(
                        carrier,
                        format!("row '{}' prices zone {} twice", row.label, zone),
                    ));
                }
            }
            Ok(ParsedRow {
                label: row.label.trim().to_string(),
                class: classifier.classify(&row.label),
                prices,
            })
        })
        .collect()
}

/// A validated, immutable carrier tariff
#[derive(Debug, Clone)]
pub struct RateTable {
    carrier: String,
    zones: BTreeSet<ZoneCode>,
    flat: Vec<FlatRate>,
    tiers: Vec<TierRule>,
    bands: Vec<BandRule>,
}

impl RateTable {
    /// Parse and validate raw rows
    pub fn from_rows(carrier: &str, rows: &[RawRow], format: &TableFormat) -> Result<Self> {
        let parsed = parse_rows(carrier, rows, format)?;
        Self::from_parsed(carrier, &parsed)
    }

    /// Validate classified rows and assemble the table
    pub fn from_parsed(carrier: &str, rows: &[ParsedRow]) -> Result<Self> {
        let mut flat: Vec<FlatRate> = Vec::new();
        let mut tiers: Vec<TierRule> = Vec::new();
        let mut bands: Vec<BandRule> = Vec::new();
        // rows whose prices were taken as a tier's per-unit price
        let mut claimed: BTreeSet<usize> = BTreeSet::new();

        for (idx, row) in rows.iter().enumerate() {
            match row.class {
                RowLabel::Flat(breakpoint) => {
                    if let Some(prev) = flat.last() {
                        if breakpoint <= prev.breakpoint {
                            return Err(Error::malformed(
                                carrier,
                                format!(
                                    "breakpoint {} follows {}; breakpoints must be strictly increasing",
                                    breakpoint, prev.breakpoint
                                ),
                            ));
                        }
                    }
                    flat.push(FlatRate {
                        breakpoint,
                        prices: row.prices.clone(),
                    });
                }
                RowLabel::Band(range) => {
                    bands.push(BandRule {
                        range,
                        per_unit_price: row.prices.clone(),
                    });
                }
                RowLabel::TierMarker(marker) => {
                    let price_row = tier_price_row(rows, idx).ok_or_else(|| {
                        Error::malformed(
                            carrier,
                            format!("tier marker '{}' has no per-unit price row", row.label),
                        )
                    })?;
                    claimed.insert(price_row);
                    tiers.push(tier_rule(carrier, marker, rows[price_row].prices.clone())?);
                }
                RowLabel::Continuation if !row.prices.is_empty() && !claimed.contains(&idx) => {
                    return Err(Error::malformed(
                        carrier,
                        format!(
                            "row '{}' (row {}) has prices but is not a weight, band or tier row",
                            row.label,
                            idx + 1
                        ),
                    ));
                }
                RowLabel::Continuation => {}
            }
        }

        let Some(first) = flat.first() else {
            return Err(Error::malformed(carrier, "no flat weight rows"));
        };
        let zones: BTreeSet<ZoneCode> = first.prices.keys().cloned().collect();
        if zones.is_empty() {
            return Err(Error::malformed(carrier, "flat rows carry no zone prices"));
        }

        let table = RateTable {
            carrier: carrier.to_string(),
            zones,
            flat,
            tiers,
            bands,
        };
        table.check_zone_columns()?;
        table.check_tiers()?;
        table.check_bands()?;

        debug!(
            carrier,
            breakpoints = table.flat.len(),
            tiers = table.tiers.len(),
            bands = table.bands.len(),
            zones = table.zones.len(),
            "rate table built"
        );
        Ok(table)
    }

    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    pub fn zones(&self) -> &BTreeSet<ZoneCode> {
        &self.zones
    }

    pub fn has_zone(&self, zone: &ZoneCode) -> bool {
        self.zones.contains(zone)
    }

    pub fn flat_rows(&self) -> &[FlatRate] {
        &self.flat
    }

    /// Flat breakpoints in ascending order
    pub fn breakpoints(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.flat.iter().map(|r| r.breakpoint)
    }

    pub fn max_flat_breakpoint(&self) -> Decimal {
        // at least one flat row is guaranteed by construction
        self.flat.last().map(|r| r.breakpoint).unwrap_or_default()
    }

    /// Price published at an exact breakpoint
    pub fn price_at(&self, breakpoint: Decimal, zone: &ZoneCode) -> Option<Decimal> {
        self.flat
            .binary_search_by(|r| r.breakpoint.cmp(&breakpoint))
            .ok()
            .and_then(|i| self.flat[i].prices.get(zone).copied())
    }

    /// Breakpoint closest to `weight`; an exact tie picks the lower one
    pub fn nearest_flat(&self, weight: Decimal) -> &FlatRate {
        let upper = self.flat.partition_point(|r| r.breakpoint < weight);
        if upper == 0 {
            return &self.flat[0];
        }
        if upper == self.flat.len() {
            return &self.flat[upper - 1];
        }
        let below = &self.flat[upper - 1];
        let above = &self.flat[upper];
        if above.breakpoint - weight < weight - below.breakpoint {
            above
        } else {
            below
        }
    }

    /// Tier rules in ascending threshold order
    pub fn tier_rules(&self) -> &[TierRule] {
        &self.tiers
    }

    pub fn band_rules(&self) -> &[BandRule] {
        &self.bands
    }

    /// The band covering `weight`
    ///
    /// Weights between the last flat breakpoint and a whole-number first
    /// band (e.g. 30.5 before `"31-70"`) belong to that first band, as do
    /// weights between two whole-number bands.
    pub fn band_rule_for(&self, weight: Decimal) -> Option<&BandRule> {
        let first = self.bands.first()?;
        if weight < first.range.low && weight <= self.max_flat_breakpoint() {
            return None;
        }
        self.bands.iter().find(|b| b.range.reaches(weight))
    }

    fn check_zone_columns(&self) -> Result<()> {
        let flat = self
            .flat
            .iter()
            .map(|r| (r.breakpoint.to_string(), &r.prices));
        let tiers = self
            .tiers
            .iter()
            .map(|t| (format!("extra above {}", t.applies_above), &t.per_unit_price));
        let bands = self
            .bands
            .iter()
            .map(|b| (b.range.to_string(), &b.per_unit_price));

        for (label, prices) in flat.chain(tiers).chain(bands) {
            if let Some(missing) = self.zones.iter().find(|z| !prices.contains_key(*z)) {
                return Err(Error::malformed(
                    &self.carrier,
                    format!("row '{}' has no price for zone {}", label, missing),
                ));
            }
            if let Some(extra) = prices.keys().find(|z| !self.zones.contains(*z)) {
                return Err(Error::malformed(
                    &self.carrier,
                    format!("row '{}' prices zone {} missing from the flat rows", label, extra),
                ));
            }
        }
        Ok(())
    }

    fn check_tiers(&self) -> Result<()> {
        let Some(first) = self.tiers.first() else {
            return Ok(());
        };
        let max_flat = self.max_flat_breakpoint();
        if first.applies_above != max_flat {
            return Err(Error::malformed(
                &self.carrier,
                format!(
                    "first tier starts above {} but the highest flat breakpoint is {}",
                    first.applies_above, max_flat
                ),
            ));
        }
        for pair in self.tiers.windows(2) {
            if pair[1].applies_above <= pair[0].applies_above {
                return Err(Error::malformed(
                    &self.carrier,
                    format!(
                        "tier above {} follows tier above {}; thresholds must be strictly increasing",
                        pair[1].applies_above, pair[0].applies_above
                    ),
                ));
            }
        }
        Ok(())
    }

    fn check_bands(&self) -> Result<()> {
        for band in &self.bands {
            if let Some(high) = band.range.high {
                if high < band.range.low {
                    return Err(Error::malformed(
                        &self.carrier,
                        format!("band {} is inverted", band.range),
                    ));
                }
            }
        }

        let Some(first) = self.bands.first() else {
            return Ok(());
        };
        let max_flat = self.max_flat_breakpoint();
        if !contiguous(max_flat, first.range.low) {
            return Err(Error::malformed(
                &self.carrier,
                format!(
                    "gap between the highest flat breakpoint {} and band {}",
                    max_flat, first.range
                ),
            ));
        }

        for pair in self.bands.windows(2) {
            let (prev, next) = (&pair[0].range, &pair[1].range);
            let Some(prev_high) = prev.high else {
                return Err(Error::malformed(
                    &self.carrier,
                    format!("band {} overlaps open band {}", next, prev),
                ));
            };
            if next.low <= prev_high {
                return Err(Error::malformed(
                    &self.carrier,
                    format!("band {} overlaps band {}", next, prev),
                ));
            }
            if !contiguous(prev_high, next.low) {
                return Err(Error::malformed(
                    &self.carrier,
                    format!("gap between band {} and band {}", prev, next),
                ));
            }
        }
        Ok(())
    }
}

/// Whether coverage ending at `upper` continues without a gap at `next_low`
///
/// Labels are inclusive, so `"31-70"` then `"71-299"` is contiguous: the next
/// low may sit one step of the finer label precision above the upper bound.
fn contiguous(upper: Decimal, next_low: Decimal) -> bool {
    if next_low <= upper {
        return true;
    }
    let scale = upper.normalize().scale().max(next_low.normalize().scale());
    next_low - upper == Decimal::new(1, scale)
}

/// Index of the row holding per-unit prices for the marker at `idx`: the
/// marker row itself when it is priced, else the first priced continuation
/// row before the next classified row
fn tier_price_row(rows: &[ParsedRow], idx: usize) -> Option<usize> {
    if !rows[idx].prices.is_empty() {
        return Some(idx);
    }
    for (offset, row) in rows[idx + 1..].iter().enumerate() {
        match row.class {
            RowLabel::Continuation if !row.prices.is_empty() => return Some(idx + 1 + offset),
            RowLabel::Continuation => continue,
            _ => return None,
        }
    }
    None
}

fn tier_rule(carrier: &str, marker: TierMarker, per_unit_price: ZonePrices) -> Result<TierRule> {
    if marker.unit_size <= Decimal::ZERO {
        return Err(Error::malformed(
            carrier,
            format!(
                "tier above {} has non-positive unit size {}",
                marker.applies_above, marker.unit_size
            ),
        ));
    }
    Ok(TierRule {
        applies_above: marker.applies_above,
        unit_size: marker.unit_size,
        per_unit_price,
    })
}
