//! Tariff engine - price a weight against one carrier's rate table
//!
//! Pricing path, first match wins:
//!
//! ```text
//! weight <= last breakpoint ──► nearest flat breakpoint (ties pick the lower)
//! tier rules declared       ──► base at last breakpoint + Σ units × per-unit price
//! band rules declared       ──► band per-kg price × whole weight
//! otherwise                 ──► NoApplicableBand
//! ```
//!
//! Arithmetic is checked; a price beyond the `Decimal` range is
//! [`Error::PriceOverflow`], never a panic.
//!
//! The engine is pure: the same `(table, zone, weight)` always yields the
//! same [`Quote`]. Nothing is rounded here; rounding for display belongs to
//! the caller.

use crate::error::{Error, Result};
use crate::table::{RateTable, ZonePrices};
use crate::zone::ZoneCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A priced (or unavailable) offer from one carrier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub carrier: String,
    pub zone_code: Option<ZoneCode>,
    /// Requested weight (kg)
    pub weight: Decimal,
    /// Zero when unavailable
    pub price: Decimal,
    pub available: bool,
    /// How the price was built, in application order
    pub breakdown: Vec<LineItem>,
    /// Why the quote is unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Quote {
    pub fn unavailable(
        carrier: impl Into<String>,
        zone_code: Option<ZoneCode>,
        weight: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            carrier: carrier.into(),
            zone_code,
            weight,
            price: Decimal::ZERO,
            available: false,
            breakdown: Vec::new(),
            reason: Some(reason.into()),
        }
    }
}

/// Kind of breakdown line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Flat price read straight from a breakpoint
    DirectRate,
    /// Per-unit surcharge accrued within one tier
    TierSurcharge,
    /// Band per-kg price applied to the whole weight
    BandRate,
}

/// One step of a price computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineKind,
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

impl LineItem {
    fn direct(description: String, amount: Decimal) -> Self {
        Self {
            kind: LineKind::DirectRate,
            description,
            amount,
            units: None,
            unit_price: None,
        }
    }
}

/// Price `weight` kilograms to `zone` using `table`
pub fn quote(table: &RateTable, zone: &ZoneCode, weight: Decimal) -> Result<Quote> {
    if weight <= Decimal::ZERO {
        return Err(Error::InvalidWeight(weight));
    }
    if !table.has_zone(zone) {
        return Err(Error::UnknownZoneColumn {
            carrier: table.carrier().to_string(),
            zone: zone.to_string(),
        });
    }

    let breakdown = if weight <= table.max_flat_breakpoint() {
        flat_lines(table, zone, weight)?
    } else if !table.tier_rules().is_empty() {
        tier_lines(table, zone, weight)?
    } else if !table.band_rules().is_empty() {
        band_lines(table, zone, weight)?
    } else {
        return Err(no_band(table, weight));
    };

    let price = breakdown
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.amount))
        .ok_or_else(|| overflow(table, weight))?;
    debug!(
        carrier = table.carrier(),
        zone = %zone,
        weight = %weight,
        price = %price,
        lines = breakdown.len(),
        "quoted"
    );

    Ok(Quote {
        carrier: table.carrier().to_string(),
        zone_code: Some(zone.clone()),
        weight,
        price,
        available: true,
        breakdown,
        reason: None,
    })
}

fn flat_lines(table: &RateTable, zone: &ZoneCode, weight: Decimal) -> Result<Vec<LineItem>> {
    let nearest = table.nearest_flat(weight);
    let price = zone_price(table, &nearest.prices, zone)?;
    Ok(vec![LineItem::direct(
        format!("direct rate at nearest weight {} kg", nearest.breakpoint),
        price,
    )])
}

fn tier_lines(table: &RateTable, zone: &ZoneCode, weight: Decimal) -> Result<Vec<LineItem>> {
    let base_weight = table.max_flat_breakpoint();
    let base = table
        .price_at(base_weight, zone)
        .ok_or_else(|| unknown_zone(table, zone))?;
    let mut lines = vec![LineItem::direct(
        format!("base rate at {} kg", base_weight),
        base,
    )];

    let tiers = table.tier_rules();
    for (i, tier) in tiers.iter().enumerate() {
        if weight <= tier.applies_above {
            break;
        }
        let reach = match tiers.get(i + 1) {
            Some(next) => weight.min(next.applies_above),
            None => weight,
        };
        let units = (reach - tier.applies_above)
            .checked_div(tier.unit_size)
            .ok_or_else(|| overflow(table, weight))?;
        let unit_price = zone_price(table, &tier.per_unit_price, zone)?;
        let amount = units
            .checked_mul(unit_price)
            .ok_or_else(|| overflow(table, weight))?;
        lines.push(LineItem {
            kind: LineKind::TierSurcharge,
            description: format!(
                "{} x {} kg above {} kg",
                units.normalize(),
                tier.unit_size.normalize(),
                tier.applies_above
            ),
            amount,
            units: Some(units),
            unit_price: Some(unit_price),
        });
    }
    Ok(lines)
}

fn band_lines(table: &RateTable, zone: &ZoneCode, weight: Decimal) -> Result<Vec<LineItem>> {
    let band = table
        .band_rule_for(weight)
        .ok_or_else(|| no_band(table, weight))?;
    let unit_price = zone_price(table, &band.per_unit_price, zone)?;
    let amount = unit_price
        .checked_mul(weight)
        .ok_or_else(|| overflow(table, weight))?;
    Ok(vec![LineItem {
        kind: LineKind::BandRate,
        description: format!("{} kg at band {} per-kg rate", weight, band.range),
        amount,
        units: Some(weight),
        unit_price: Some(unit_price),
    }])
}

fn zone_price(table: &RateTable, prices: &ZonePrices, zone: &ZoneCode) -> Result<Decimal> {
    prices
        .get(zone)
        .copied()
        .ok_or_else(|| unknown_zone(table, zone))
}

fn unknown_zone(table: &RateTable, zone: &ZoneCode) -> Error {
    Error::UnknownZoneColumn {
        carrier: table.carrier().to_string(),
        zone: zone.to_string(),
    }
}

fn overflow(table: &RateTable, weight: Decimal) -> Error {
    Error::PriceOverflow {
        carrier: table.carrier().to_string(),
        weight,
    }
}

fn no_band(table: &RateTable, weight: Decimal) -> Error {
    Error::NoApplicableBand {
        carrier: table.carrier().to_string(),
        weight,
    }
}
