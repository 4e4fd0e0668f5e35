//! Carrier book validation
//!
//! Checks a carrier book file and reports every problem found, rather
//! than stopping at the first one like [`CarrierBook::build`].

use crate::config::{CarrierBook, CarrierConfig, BOOK_VERSION};
use crate::zone::ZoneCode;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A validation issue found in a carrier book
#[derive(Debug, Clone, Serialize)]
pub struct BookIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

impl BookIssue {
    pub fn error(code: &str, message: &str, carrier: Option<&str>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.to_string(),
            carrier: carrier.map(str::to_string),
        }
    }

    pub fn warning(code: &str, message: &str, carrier: Option<&str>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.to_string(),
            carrier: carrier.map(str::to_string),
        }
    }
}

/// Result of book validation
#[derive(Debug, Default, Serialize)]
pub struct BookValidationResult {
    pub issues: Vec<BookIssue>,
    pub carriers_checked: usize,
}

impl BookValidationResult {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.code.as_str()).collect()
    }
}

/// Validate a carrier book file
pub fn validate_book(path: &Path, today: NaiveDate) -> BookValidationResult {
    let mut result = BookValidationResult::default();

    if !path.exists() {
        result.issues.push(BookIssue::error(
            "E001",
            &format!("File does not exist: {}", path.display()),
            None,
        ));
        return result;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.issues.push(BookIssue::error(
                "E002",
                &format!("Cannot read file: {}", e),
                None,
            ));
            return result;
        }
    };

    validate_book_source(&content, today)
}

/// Validate carrier book YAML text
pub fn validate_book_source(content: &str, today: NaiveDate) -> BookValidationResult {
    let mut result = BookValidationResult::default();

    let book: CarrierBook = match serde_norway::from_str(content) {
        Ok(b) => b,
        Err(e) => {
            result.issues.push(BookIssue::error(
                "E003",
                &format!("Invalid YAML: {}", e),
                None,
            ));
            return result;
        }
    };

    if book.version != BOOK_VERSION {
        result.issues.push(BookIssue::error(
            "E004",
            &format!(
                "Unsupported version: {}. Only version {} is supported.",
                book.version, BOOK_VERSION
            ),
            None,
        ));
    }

    if book.carriers.is_empty() {
        result
            .issues
            .push(BookIssue::error("E005", "No carriers declared", None));
    }

    let mut seen = HashSet::new();
    for carrier in &book.carriers {
        if !seen.insert(carrier.name.as_str()) {
            result.issues.push(BookIssue::error(
                "E006",
                &format!("Carrier '{}' is declared more than once", carrier.name),
                Some(&carrier.name),
            ));
        }
        validate_carrier(carrier, today, &mut result);
        result.carriers_checked += 1;
    }

    result
}

fn validate_carrier(carrier: &CarrierConfig, today: NaiveDate, result: &mut BookValidationResult) {
    let name = Some(carrier.name.as_str());

    if let Some(from) = carrier.effective_from {
        if from > today {
            result.issues.push(BookIssue::warning(
                "W002",
                &format!("Tariff is not effective until {}", from),
                name,
            ));
        }
    }

    let mapping = carrier.zone_mapping();
    if mapping.is_empty() {
        result.issues.push(BookIssue::warning(
            "W001",
            "No zone mappings; every destination will be unavailable",
            name,
        ));
    }

    let table = match carrier.rate_table() {
        Ok(t) => t,
        Err(e) => {
            result
                .issues
                .push(BookIssue::error("E007", &e.to_string(), name));
            return;
        }
    };

    let mapped: BTreeSet<&ZoneCode> = mapping.zone_codes();
    for zone in mapped.iter().filter(|z| !table.has_zone(z)) {
        result.issues.push(BookIssue::error(
            "E008",
            &format!("Zone mapping references zone {} which the rate table does not price", zone),
            name,
        ));
    }

    if !mapping.is_empty() {
        for zone in table.zones().iter().filter(|z| !mapped.contains(z)) {
            result.issues.push(BookIssue::warning(
                "W003",
                &format!("Zone {} is priced but no destination maps to it", zone),
                name,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    const VALID: &str = r#"
version: 1
carriers:
  - name: DHL
    zone_column: "area{zone}"
    rates:
      - label: 5
        prices: { area1: 10, area2: 12 }
      - label: 10
        prices: { area1: 18, area2: 21 }
    zones:
      - destination: "Germany (DE)"
        zone: 1
      - destination: "Japan (JP)"
        zone: 2
"#;

    #[test]
    fn test_valid_book() {
        let result = validate_book_source(VALID, today());
        assert!(!result.has_errors(), "{:?}", result.issues);
        assert!(!result.has_warnings(), "{:?}", result.issues);
        assert_eq!(result.carriers_checked, 1);
    }

    #[test]
    fn test_invalid_yaml() {
        let result = validate_book_source("carriers: [", today());
        assert_eq!(result.codes(), vec!["E003"]);
    }

    #[test]
    fn test_version_and_empty() {
        let result = validate_book_source("version: 3\ncarriers: []\n", today());
        assert_eq!(result.codes(), vec!["E004", "E005"]);
    }

    #[test]
    fn test_mapping_against_table() {
        let book = VALID.replace("zone: 2", "zone: 9");
        let result = validate_book_source(&book, today());
        assert_eq!(result.codes(), vec!["E008", "W003"]);
    }

    #[test]
    fn test_malformed_tariff_reported() {
        let book = VALID.replace("label: 10", "label: 4");
        let result = validate_book_source(&book, today());
        assert_eq!(result.codes(), vec!["E007"]);
        assert!(result.issues[0].message.contains("strictly increasing"));
    }

    #[test]
    fn test_future_tariff_and_duplicates() {
        let book = VALID.replace(
            "  - name: DHL\n",
            "  - name: DHL\n    effective_from: 2030-01-01\n",
        );
        let doubled = format!(
            "{}{}",
            book,
            "  - name: DHL\n    rates:\n      - label: 1\n        prices: { X: 1 }\n"
        );
        let result = validate_book_source(&doubled, today());
        assert_eq!(result.codes(), vec!["W002", "E006", "W001"]);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_book(Path::new("/nonexistent/book.yaml"), today());
        assert_eq!(result.codes(), vec!["E001"]);
    }
}
