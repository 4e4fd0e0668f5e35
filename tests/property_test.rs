//! Property-based tests for rate tables and pricing
//!
//! Uses proptest to generate well-formed tables and verify ordering,
//! idempotence and monotonicity invariants

use proptest::prelude::*;
use rust_decimal::Decimal;
use shiprate::{quote, BandRange, RateTable, RawRow, TableFormat, ZoneCode};

/// Breakpoints in tenths of a kg plus a non-decreasing price per breakpoint
fn flat_rows() -> impl Strategy<Value = Vec<(Decimal, Decimal)>> {
    prop::collection::vec((1u32..50, 0u32..500), 1..12).prop_map(|steps| {
        let mut weight = 0u32;
        let mut price = 0u32;
        steps
            .into_iter()
            .map(|(dw, dp)| {
                weight += dw;
                price += dp;
                (Decimal::new(weight as i64, 1), Decimal::new(price as i64, 2))
            })
            .collect()
    })
}

/// Weight in hundredths of a kg
fn weight() -> impl Strategy<Value = Decimal> {
    (1u32..20_000).prop_map(|w| Decimal::new(w as i64, 2))
}

fn zone() -> ZoneCode {
    ZoneCode::new("1")
}

fn flat_table(rows: &[(Decimal, Decimal)]) -> RateTable {
    let rows: Vec<RawRow> = rows
        .iter()
        .map(|(w, p)| RawRow::new(w.to_string(), [("1", *p)]))
        .collect();
    RateTable::from_rows("Prop", &rows, &TableFormat::default()).unwrap()
}

/// Flat rows followed by a surcharge tier starting at the last breakpoint
fn tiered_table(rows: &[(Decimal, Decimal)], unit_tenths: u32, rate_cents: u32) -> RateTable {
    let (last, _) = rows[rows.len() - 1];
    let unit = Decimal::new(unit_tenths as i64, 1);
    let mut raw: Vec<RawRow> = rows
        .iter()
        .map(|(w, p)| RawRow::new(w.to_string(), [("1", *p)]))
        .collect();
    raw.push(RawRow::new(
        format!("extra {} kg above {} kg", unit, last),
        [("1", Decimal::new(rate_cents as i64, 2))],
    ));
    RateTable::from_rows("Prop", &raw, &TableFormat::default()).unwrap()
}

proptest! {
    #[test]
    fn test_breakpoints_round_trip(rows in flat_rows()) {
        let table = flat_table(&rows);
        let read_back: Vec<Decimal> = table.breakpoints().collect();
        let expected: Vec<Decimal> = rows.iter().map(|(w, _)| *w).collect();
        prop_assert_eq!(read_back, expected);
        for (w, p) in &rows {
            prop_assert_eq!(table.price_at(*w, &zone()), Some(*p));
        }
    }

    #[test]
    fn test_bands_round_trip(cuts in prop::collection::btree_set(32u32..5000, 0..5)) {
        let starts: Vec<u32> = std::iter::once(31).chain(cuts).collect();
        let expected: Vec<BandRange> = starts
            .iter()
            .enumerate()
            .map(|(i, low)| match starts.get(i + 1) {
                Some(next) => BandRange::bounded(Decimal::from(*low), Decimal::from(next - 1)),
                None => BandRange::open(Decimal::from(*low)),
            })
            .collect();

        let mut raw = vec![RawRow::new("30", [("1", Decimal::from(60))])];
        raw.extend(
            expected
                .iter()
                .map(|range| RawRow::new(range.to_string(), [("1", Decimal::TWO)])),
        );
        let table = RateTable::from_rows("Prop", &raw, &TableFormat::default()).unwrap();
        let read_back: Vec<BandRange> = table.band_rules().iter().map(|b| b.range).collect();
        prop_assert_eq!(read_back, expected);
    }

    #[test]
    fn test_tie_resolves_low(rows in flat_rows()) {
        prop_assume!(rows.len() >= 2);
        let table = flat_table(&rows);
        for pair in rows.windows(2) {
            let midpoint = (pair[0].0 + pair[1].0) / Decimal::TWO;
            prop_assert_eq!(table.nearest_flat(midpoint).breakpoint, pair[0].0);
        }
    }

    #[test]
    fn test_quote_is_idempotent(rows in flat_rows(), w in weight()) {
        let table = tiered_table(&rows, 5, 80);
        let first = quote(&table, &zone(), w).unwrap();
        let second = quote(&table, &zone(), w).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_flat_price_monotonic(rows in flat_rows(), a in 1u32..=1000, b in 1u32..=1000) {
        let table = flat_table(&rows);
        // weights as fractions of the flat range
        let scale = table.max_flat_breakpoint() / Decimal::from(1000);
        let (lo, hi) = (scale * Decimal::from(a.min(b)), scale * Decimal::from(a.max(b)));
        let p_lo = quote(&table, &zone(), lo).unwrap().price;
        let p_hi = quote(&table, &zone(), hi).unwrap().price;
        prop_assert!(p_lo <= p_hi, "{} kg -> {}, {} kg -> {}", lo, p_lo, hi, p_hi);
    }

    #[test]
    fn test_tier_price_monotonic(
        rows in flat_rows(),
        unit in 1u32..20,
        rate in 0u32..300,
        a in weight(),
        b in weight(),
    ) {
        let table = tiered_table(&rows, unit, rate);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let p_lo = quote(&table, &zone(), lo).unwrap().price;
        let p_hi = quote(&table, &zone(), hi).unwrap().price;
        prop_assert!(p_lo <= p_hi, "{} kg -> {}, {} kg -> {}", lo, p_lo, hi, p_hi);
    }

    #[test]
    fn test_band_price_monotonic_within_band(a in 3100u32..7000, b in 3100u32..7000) {
        let raw = vec![
            RawRow::new("30", [("1", Decimal::from(60))]),
            RawRow::new("31-70", [("1", Decimal::new(25, 1))]),
        ];
        let table = RateTable::from_rows("Prop", &raw, &TableFormat::default()).unwrap();
        let (lo, hi) = (a.min(b), a.max(b));
        let p_lo = quote(&table, &zone(), Decimal::new(lo as i64, 2)).unwrap().price;
        let p_hi = quote(&table, &zone(), Decimal::new(hi as i64, 2)).unwrap().price;
        prop_assert!(p_lo <= p_hi);
    }
}
