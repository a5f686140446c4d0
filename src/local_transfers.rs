// Offline transfer histories: explorer dumps saved to disk, either as one
// JSON document or as JSON lines.

use crate::{parser::RawTransfer, Error};
use log::{info, warn};
use serde_json::Value;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

/// Read transfer rows from `path`.
///
/// Accepts a JSON array of rows, an explorer response `{"result": [...]}`,
/// a single row object, or JSONL with one row per line.
pub fn read_transfer_file<P: AsRef<Path>>(path: P) -> Result<Vec<RawTransfer>, Error> {
    let path = path.as_ref();
    let mut text = String::new();
    File::open(path)?.read_to_string(&mut text)?;

    let rows = parse_document(&text)?;
    info!("Read {} transfer rows from {}", rows.len(), path.display());

    Ok(rows)
}

pub fn parse_document(text: &str) -> Result<Vec<RawTransfer>, Error> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    // a whole-document parse first; JSONL fails it from the second line on
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(rows)) => rows_from_values(rows),
        Ok(Value::Object(mut object)) => match object.remove("result") {
            Some(Value::Array(rows)) => rows_from_values(rows),
            Some(other) => Err(Error::TransferFile(format!("result is not a list: {other}"))),
            None => Ok(vec![serde_json::from_value(Value::Object(object))?]),
        },
        Ok(other) => Err(Error::TransferFile(format!("unexpected content: {other}"))),
        Err(_) => Ok(parse_lines(BufReader::new(text.as_bytes()))),
    }
}

fn rows_from_values(rows: Vec<Value>) -> Result<Vec<RawTransfer>, Error> {
    rows.into_iter().map(|row| serde_json::from_value(row).map_err(Error::from)).collect()
}

/// JSONL reader. Bad lines are logged and skipped.
pub fn parse_lines<R: BufRead>(reader: R) -> Vec<RawTransfer> {
    let mut rows = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Error reading line {}: {e}", line_num + 1);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<RawTransfer>(&line) {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Error parsing JSON at line {}: {e}", line_num + 1),
        }
    }

    rows
}
