use serde_json::Value;
use std::io;

use super::{cell, headers, result_of};

/// Sections exported as rows, in order of preference. Reports export their
/// line items across every currency; plans export the drafts.
const ROW_SECTIONS: [&str; 3] = ["ledger_by_currency", "drafts", "per_property"];

/// Write the primary rows of the output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = result_of(value);
    let rows: Option<Vec<Value>> = match result {
        Value::Array(rows) => Some(rows.clone()),
        Value::Object(map) => ROW_SECTIONS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array).map(|rows| (*key, rows)))
            .map(|(key, rows)| {
                if key == "ledger_by_currency" {
                    ledger_lines(rows)
                } else {
                    rows.clone()
                }
            }),
        _ => None,
    };

    let written = match rows {
        Some(rows) => write_rows(&mut wtr, &rows),
        None => write_fields(&mut wtr, result),
    };
    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV write error: {e}");
    }
}

fn ledger_lines(ledgers: &[Value]) -> Vec<Value> {
    ledgers
        .iter()
        .filter_map(|l| l.get("entries").and_then(Value::as_array))
        .flatten()
        .cloned()
        .collect()
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let columns = headers(rows);
    if columns.is_empty() {
        for row in rows {
            wtr.write_record([cell(row)])?;
        }
        return Ok(());
    }
    wtr.write_record(&columns)?;
    for row in rows {
        wtr.write_record(
            columns
                .iter()
                .map(|c| row.get(c.as_str()).map(cell).unwrap_or_default()),
        )?;
    }
    Ok(())
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Value) -> csv::Result<()> {
    match result {
        Value::Object(map) => {
            wtr.write_record(["field", "value"])?;
            for (key, val) in map {
                wtr.write_record([key.as_str(), &cell(val)])?;
            }
        }
        other => wtr.write_record([cell(other)])?,
    }
    Ok(())
}
