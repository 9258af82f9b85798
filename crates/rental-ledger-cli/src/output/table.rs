use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, headers, result_of};

/// Human-readable rendering of an envelope: scalar fields first, then one
/// table per section (per-property, per-owner, ledgers by currency, ...).
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Array(rows) => print_rows(rows),
        Value::Object(result) => print_sections(result),
        other => println!("{}", cell(other)),
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(methodology)) = value.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
}

fn print_sections(result: &Map<String, Value>) {
    let scalars: Vec<(&String, &Value)> = result
        .iter()
        .filter(|(_, v)| !v.is_object() && !is_table(v))
        .collect();
    if !scalars.is_empty() {
        print_fields(scalars.into_iter());
    }

    for (key, val) in result {
        match val {
            Value::Object(section) => {
                println!("\n{}", title(key));
                print_fields(section.iter());
            }
            Value::Array(rows) if key == "ledger_by_currency" => print_ledgers(rows),
            Value::Array(rows) if is_table(val) => {
                println!("\n{}", title(key));
                print_rows(rows);
            }
            _ => {}
        }
    }
}

/// Each currency keeps its own table; canonical totals are shown alongside.
fn print_ledgers(ledgers: &[Value]) {
    for ledger in ledgers {
        let currency = ledger.get("currency").map(cell).unwrap_or_default();
        let original = ledger.get("total_original").map(cell).unwrap_or_default();
        let canonical = ledger.get("total_canonical").map(cell).unwrap_or_default();
        println!("\nLedger {currency} (total {original}, canonical {canonical})");
        match ledger.get("entries") {
            Some(Value::Array(entries)) => print_rows(entries),
            _ => println!("(empty)"),
        }
    }
}

fn print_fields<'a>(fields: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in fields {
        builder.push_record([key.clone(), cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }
    if !rows.iter().all(Value::is_object) {
        for row in rows {
            println!("{}", cell(row));
        }
        return;
    }

    let columns = headers(rows);
    let mut builder = Builder::default();
    builder.push_record(columns.clone());
    for row in rows {
        builder.push_record(
            columns
                .iter()
                .map(|c| row.get(c.as_str()).map(cell).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));
}

fn is_table(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if rows.first().is_some_and(Value::is_object))
}

fn title(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}
