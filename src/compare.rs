//! Quote comparison across carriers
//!
//! Unavailable quotes never take part in ranking but stay in the result so
//! a caller can show why a carrier dropped out.

use crate::engine::Quote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Compare quotes given in carrier declaration order
pub fn compare(quotes: Vec<Quote>) -> ComparisonResult {
    let outcome = rank(&quotes);
    ComparisonResult { quotes, outcome }
}

/// All quotes plus the ranking outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Every quote, available or not, in declaration order
    pub quotes: Vec<Quote>,
    pub outcome: Outcome,
}

/// What the comparison concluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// No carrier can serve the request
    NoService,
    /// Exactly one carrier is available; nothing to compare against
    SoleOption { carrier: String, price: Decimal },
    /// Two or more carriers are available
    Ranked {
        cheapest: String,
        cheapest_price: Decimal,
        most_expensive: String,
        max_price: Decimal,
        price_diff: Decimal,
        /// `price_diff / max_price * 100`, zero when `max_price` is zero
        savings_pct: Decimal,
    },
}

impl ComparisonResult {
    pub fn available(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.iter().filter(|q| q.available)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.iter().filter(|q| !q.available)
    }

    /// The winning quote, if any carrier is available
    pub fn cheapest(&self) -> Option<&Quote> {
        let carrier = match &self.outcome {
            Outcome::NoService => return None,
            Outcome::SoleOption { carrier, .. } => carrier,
            Outcome::Ranked { cheapest, .. } => cheapest,
        };
        self.available().find(|q| &q.carrier == carrier)
    }

    pub fn savings_pct(&self) -> Option<Decimal> {
        match self.outcome {
            Outcome::Ranked { savings_pct, .. } => Some(savings_pct),
            _ => None,
        }
    }

    pub fn is_no_service(&self) -> bool {
        self.outcome == Outcome::NoService
    }
}

fn rank(quotes: &[Quote]) -> Outcome {
    let mut available = quotes.iter().filter(|q| q.available);
    let Some(first) = available.next() else {
        return Outcome::NoService;
    };

    // strict comparisons keep the first declared carrier on ties
    let mut cheapest = first;
    let mut priciest = first;
    let mut count = 1;
    for q in available {
        count += 1;
        if q.price < cheapest.price {
            cheapest = q;
        }
        if q.price > priciest.price {
            priciest = q;
        }
    }

    if count == 1 {
        return Outcome::SoleOption {
            carrier: first.carrier.clone(),
            price: first.price,
        };
    }

    let price_diff = priciest.price - cheapest.price;
    let savings_pct = if priciest.price.is_zero() {
        Decimal::ZERO
    } else {
        price_diff / priciest.price * Decimal::ONE_HUNDRED
    };

    Outcome::Ranked {
        cheapest: cheapest.carrier.clone(),
        cheapest_price: cheapest.price,
        most_expensive: priciest.carrier.clone(),
        max_price: priciest.price,
        price_diff,
        savings_pct,
    }
}
