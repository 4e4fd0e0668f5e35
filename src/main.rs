//! shiprate CLI - Command-line interface
//!
//! Commands:
//!   quote         - Compare carrier prices for a destination and weight
//!   destinations  - List destinations the book can quote
//!   validate      - Check a carrier book for errors
//!   schema        - Print the carrier book JSON schema

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use shiprate::*;
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "quote" => cmd_quote(&args[2..]),
        "destinations" => cmd_destinations(&args[2..]),
        "validate" => cmd_validate(&args[2..]),
        "schema" => cmd_schema(),
        "version" | "--version" | "-v" => {
            println!("shiprate {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
shiprate - Multi-carrier shipping tariff comparison

USAGE:
    shiprate <COMMAND> [OPTIONS]

COMMANDS:
    quote <book.yaml> <destination> <weight>   Compare carrier prices
    destinations <book.yaml>                   List quotable destinations
    validate <book.yaml> [--strict]            Check a carrier book
    schema                                     Print carrier book JSON schema
    version                                    Print version

OPTIONS:
    --json      JSON output format (quote, validate)
    --strict    Treat warnings as errors (validate)

ENVIRONMENT:
    RUST_LOG    Log filter, e.g. shiprate=debug (default: warn)

EXAMPLES:
    shiprate quote carriers.yaml "Germany (DE)" 12.5
    shiprate quote carriers.yaml Japan 3 --json
    shiprate validate carriers.yaml --strict
"#
    );
}

/// JSON envelope for `quote --json`
#[derive(Serialize)]
struct QuoteReport<'a> {
    book: String,
    currency: &'a str,
    destination: &'a str,
    weight: Decimal,
    #[serde(flatten)]
    result: &'a ComparisonResult,
}

fn cmd_quote(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    if positional.len() < 3 {
        return Err("Usage: shiprate quote <book.yaml> <destination> <weight>".into());
    }

    let json_output = args.contains(&"--json".to_string());
    let (desk, book_hash) = load_desk(positional[0])?;
    let destination = positional[1];
    let weight = Decimal::from_str(positional[2].trim())
        .map_err(|_| Error::Other(format!("Invalid weight: {}", positional[2])))?;

    let result = desk.quote_all(destination, weight)?;

    if json_output {
        let report = QuoteReport {
            book: format!("sha256:{}", book_hash),
            currency: desk.currency(),
            destination,
            weight,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}",
            quote_report(&result, desk.currency(), destination, weight, &book_hash)
        );
    }

    if result.is_no_service() {
        Err("No carrier can ship to this destination at this weight".into())
    } else {
        Ok(())
    }
}

fn cmd_destinations(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    let Some(path) = positional.first() else {
        return Err("Usage: shiprate destinations <book.yaml>".into());
    };

    let (desk, _) = load_desk(path)?;
    for name in desk.destinations() {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_validate(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    let Some(path) = positional.first() else {
        return Err("Usage: shiprate validate <book.yaml> [--strict] [--json]".into());
    };
    let strict = args.contains(&"--strict".to_string());
    let json_output = args.contains(&"--json".to_string());

    let today = chrono::Local::now().date_naive();
    let result = validate_book(Path::new(path), today);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for issue in &result.issues {
            let marker = match issue.severity {
                Severity::Error => "✗",
                Severity::Warning => "⚠",
            };
            match &issue.carrier {
                Some(carrier) => {
                    println!("{} [{}] {}: {}", marker, issue.code, carrier, issue.message)
                }
                None => println!("{} [{}] {}", marker, issue.code, issue.message),
            }
        }
        println!(
            "\n{} carrier(s) checked: {} error(s), {} warning(s)",
            result.carriers_checked,
            result.error_count(),
            result.warning_count()
        );
    }

    if result.has_errors() {
        Err("Validation failed".into())
    } else if strict && result.has_warnings() {
        Err("Validation failed (strict mode: warnings treated as errors)".into())
    } else {
        Ok(())
    }
}

fn cmd_schema() -> Result<()> {
    println!("{}", book_schema()?);
    Ok(())
}

fn load_desk(path: &str) -> Result<(ShippingDesk, String)> {
    let (book, hash) = CarrierBook::load(Path::new(path))?;
    Ok((book.build()?, hash))
}

/// Arguments that are not `--flags`
fn positional_args(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect()
}

fn money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn quote_report(
    result: &ComparisonResult,
    currency: &str,
    destination: &str,
    weight: Decimal,
    book_hash: &str,
) -> String {
    let mut out = format!(
        "Quote: {}, {} kg   [book sha256:{}]\n\n",
        destination,
        weight.normalize(),
        &book_hash[..book_hash.len().min(16)]
    );

    for q in &result.quotes {
        if q.available {
            let zone = q.zone_code.as_ref().map(ZoneCode::as_str).unwrap_or("-");
            out.push_str(&format!(
                "  {:<10} zone {:<4} {} {:>10}\n",
                q.carrier,
                zone,
                currency,
                money(q.price)
            ));
            for line in &q.breakdown {
                out.push_str(&format!(
                    "      {:<44} {:>10}\n",
                    line.description,
                    money(line.amount)
                ));
            }
        } else {
            out.push_str(&format!(
                "  {:<10} unavailable: {}\n",
                q.carrier,
                q.reason.as_deref().unwrap_or("unknown reason")
            ));
        }
    }
    out.push('\n');

    match &result.outcome {
        Outcome::NoService => out.push_str("✗ No carrier can serve this request"),
        Outcome::SoleOption { carrier, price } => out.push_str(&format!(
            "✓ {} is the only option: {} {}",
            carrier,
            currency,
            money(*price)
        )),
        Outcome::Ranked {
            cheapest,
            price_diff,
            savings_pct,
            ..
        } => out.push_str(&format!(
            "✓ {} is cheaper by {} {} ({:.1}%)",
            cheapest,
            currency,
            money(*price_diff),
            savings_pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        )),
    }
    out
}
