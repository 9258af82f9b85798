use serde_json::Value;

use super::{cell, result_of};

/// Headline figure per command, first match wins: report net income, plan
/// canonical total, conversion result.
const HEADLINES: [&str; 3] = ["/reconciliation/total_net", "/total_canonical", "/rounded"];

/// Print just the key answer.
///
/// Allocations print one `YYYY-MM amount currency full|partial` line each;
/// date ranges print `start end`.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Array(rows) = result {
        for row in rows {
            println!("{}", allocation_line(row).unwrap_or_else(|| cell(row)));
        }
        return;
    }

    for pointer in HEADLINES {
        if let Some(val) = result.pointer(pointer).filter(|v| !v.is_null()) {
            println!("{}", cell(val));
            return;
        }
    }

    if let (Some(start), Some(end)) = (result.get("start"), result.get("end")) {
        println!("{} {}", cell(start), cell(end));
        return;
    }

    match result {
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{key}: {}", cell(val));
            }
        }
        other => println!("{}", cell(other)),
    }
}

fn allocation_line(row: &Value) -> Option<String> {
    let year = row.get("year")?.as_i64()?;
    let month = row.get("month")?.as_u64()?;
    let amount = cell(row.get("amount")?);
    let currency = cell(row.get("currency")?);
    let coverage = if row.get("is_full")?.as_bool()? {
        "full"
    } else {
        "partial"
    };
    Some(format!("{year}-{month:02} {amount} {currency} {coverage}"))
}
