// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # shiprate - multi-carrier shipping tariffs
//!
//! Quotes the shipping cost of a destination/weight pair across carriers
//! whose tariffs are published as heterogeneous rate tables.
//!
//! ## Core Concept
//!
//! Carriers publish prices in one of a few shapes, all keyed by a
//! carrier-specific zone code:
//!
//! - **Flat breakpoints**: one price per declared weight
//! - **Tiers**: above a threshold, a per-unit surcharge is added to the
//!   price at the last breakpoint (cascading over several thresholds)
//! - **Bands**: above the breakpoints, a per-kg price times the whole weight
//!
//! Raw rows are validated once into an immutable [`RateTable`]; every
//! query afterwards is a pure in-memory computation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shiprate::{CarrierBook, Outcome};
//! use rust_decimal_macros::dec;
//!
//! let book = CarrierBook::from_yaml(&std::fs::read_to_string("carriers.yaml")?)?;
//! let desk = book.build()?;
//!
//! let result = desk.quote_all("Germany (DE)", dec!(12.5))?;
//! if let Outcome::Ranked { cheapest, price_diff, savings_pct, .. } = &result.outcome {
//!     println!("{cheapest} saves {price_diff} ({savings_pct}%)");
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │  raw rows ──► parse_rows ──► RateTable::from_parsed          │
//! │                                     │   (once, read-only)    │
//! │  destination ──► ZoneResolver ──► zone code                  │
//! │                                     │                        │
//! │  (table, zone, weight) ──► quote() ──► Quote                 │
//! │                                     │                        │
//! │  [Quote, ...] ──► compare() ──► ComparisonResult             │
//! │                                                              │
//! │  CarrierBook (YAML) ──► ShippingDesk runs all of the above   │
//! │                         per carrier, in declaration order    │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Model
//!
//! | Error | When | Effect |
//! |-------|------|--------|
//! | `MalformedTariff` | building a table | fatal, nothing is quoted |
//! | `UnmappedCountry` | resolving a destination | that carrier is unavailable |
//! | `UnknownZoneColumn` | quoting | that carrier is unavailable |
//! | `NoApplicableBand` | quoting | that carrier is unavailable |
//! | `PriceOverflow` | quoting | that carrier is unavailable |
//!
//! No currency conversion, taxes or duties are applied, and prices are
//! never rounded inside the library.

pub mod compare;
pub mod config;
pub mod desk;
pub mod engine;
pub mod error;
pub mod label;
pub mod table;
pub mod validate;
pub mod zone;

// Re-exports
pub use compare::{compare, ComparisonResult, Outcome};
pub use config::{book_schema, fingerprint, CarrierBook, CarrierConfig, BOOK_VERSION};
pub use desk::ShippingDesk;
pub use engine::{quote, LineItem, LineKind, Quote};
pub use error::{Error, Result};
pub use label::{BandRange, LabelClassifier, MarkerPattern, RowLabel, TierMarker};
pub use table::{
    parse_rows, BandRule, FlatRate, ParsedRow, RateRow, RateTable, RawRow, TableFormat, TierRule,
    WeightBound, ZonePrices,
};
pub use validate::{validate_book, validate_book_source, BookIssue, BookValidationResult, Severity};
pub use zone::{ZoneCode, ZoneKeyStyle, ZoneMapping, ZoneResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
