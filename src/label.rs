//! Row label classification
//!
//! Every raw tariff row carries a free-text weight label. Before a rate
//! table is assembled each label is classified exactly once:
//!
//! | Label                      | Classification |
//! |----------------------------|----------------|
//! | `"2.5"`                    | flat breakpoint |
//! | `"31-70"`, `"300+"`        | band |
//! | `"extra0.5 kg above 10kg"` | tier marker |
//! | anything else (or blank)   | continuation |
//!
//! Carriers whose tier markers do not follow the generic
//! `extra <unit> kg above <threshold> kg` wording declare them explicitly
//! with a [`MarkerPattern`].

use regex::Regex;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// Inclusive weight range of a band: `[low, high]` or `[low, +inf)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRange {
    pub low: Decimal,
    pub high: Option<Decimal>,
}

impl BandRange {
    pub fn bounded(low: Decimal, high: Decimal) -> Self {
        Self {
            low,
            high: Some(high),
        }
    }

    pub fn open(low: Decimal) -> Self {
        Self { low, high: None }
    }

    pub fn is_open(&self) -> bool {
        self.high.is_none()
    }

    /// True when `weight` is at or below the upper bound
    pub fn reaches(&self, weight: Decimal) -> bool {
        self.high.map_or(true, |high| weight <= high)
    }

    pub fn contains(&self, weight: Decimal) -> bool {
        weight >= self.low && self.reaches(weight)
    }
}

impl std::fmt::Display for BandRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.high {
            Some(high) => write!(f, "{}-{}", self.low, high),
            None => write!(f, "{}+", self.low),
        }
    }
}

/// Threshold and unit size announced by a tier marker row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierMarker {
    pub applies_above: Decimal,
    pub unit_size: Decimal,
}

/// A carrier-declared tier marker
///
/// Matches any label containing `contains`, ignoring ASCII case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarkerPattern {
    /// Text the marker label contains (case-insensitive)
    pub contains: String,

    /// Weight above which the surcharge accrues (kg)
    pub applies_above: Decimal,

    /// Size of one surcharge unit (kg)
    pub unit_size: Decimal,
}

/// Result of classifying one label
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowLabel {
    Flat(Decimal),
    Band(BandRange),
    TierMarker(TierMarker),
    Continuation,
}

struct LabelPatterns {
    band: Regex,
    open_band: Regex,
    generic_tier: Regex,
}

static PATTERNS: OnceLock<LabelPatterns> = OnceLock::new();

fn patterns() -> &'static LabelPatterns {
    PATTERNS.get_or_init(|| LabelPatterns {
        band: Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*-\s*(\d+(?:\.\d+)?)\s*$")
            .expect("band pattern is valid"),
        open_band: Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*\+\s*$").expect("open band pattern is valid"),
        generic_tier: Regex::new(
            r"(?i)extra\s*(?P<unit>\d+(?:\.\d+)?)\s*kg\s*above\s*(?P<above>\d+(?:\.\d+)?)\s*kg",
        )
        .expect("tier pattern is valid"),
    })
}

/// Classifies raw labels for one carrier
#[derive(Debug, Clone, Default)]
pub struct LabelClassifier {
    markers: Vec<MarkerPattern>,
}

impl LabelClassifier {
    pub fn new(markers: Vec<MarkerPattern>) -> Self {
        Self { markers }
    }

    pub fn classify(&self, label: &str) -> RowLabel {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return RowLabel::Continuation;
        }

        if let Some(weight) = parse_plain_decimal(trimmed) {
            return RowLabel::Flat(weight);
        }

        if let Some(range) = parse_band(trimmed) {
            return RowLabel::Band(range);
        }

        let lowered = trimmed.to_lowercase();
        if let Some(marker) = self
            .markers
            .iter()
            .find(|m| lowered.contains(&m.contains.trim().to_lowercase()))
        {
            return RowLabel::TierMarker(TierMarker {
                applies_above: marker.applies_above,
                unit_size: marker.unit_size,
            });
        }

        if let Some(caps) = patterns().generic_tier.captures(trimmed) {
            let unit = Decimal::from_str(&caps["unit"]).ok();
            let above = Decimal::from_str(&caps["above"]).ok();
            if let (Some(unit_size), Some(applies_above)) = (unit, above) {
                return RowLabel::TierMarker(TierMarker {
                    applies_above,
                    unit_size,
                });
            }
        }

        RowLabel::Continuation
    }
}

/// Parse a label that is nothing but a non-negative decimal number
pub fn parse_plain_decimal(label: &str) -> Option<Decimal> {
    let trimmed = label.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Parse a `"low-high"` or `"low+"` band label
pub fn parse_band(label: &str) -> Option<BandRange> {
    let pats = patterns();
    if let Some(caps) = pats.band.captures(label) {
        let low = Decimal::from_str(&caps[1]).ok()?;
        let high = Decimal::from_str(&caps[2]).ok()?;
        return Some(BandRange::bounded(low, high));
    }
    if let Some(caps) = pats.open_band.captures(label) {
        let low = Decimal::from_str(&caps[1]).ok()?;
        return Some(BandRange::open(low));
    }
    None
}
