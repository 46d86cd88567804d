//! Turns heterogeneous portal responses into one result shape.
//!
//! The portal answers with paginated envelopes, bare lists, TSV text or
//! arbitrary JSON depending on the endpoint and the requested format. The
//! functions here reduce all of these to either a [`PaginatedResult`] or a
//! plain list of records.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::aliases::AliasTable;
use crate::error::PortalError;
use crate::models::{Envelope, Pagination, Record};

/// A page of items, its pagination metadata when the wire format carries one,
/// and the payload the items were derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
    /// Serialized form of what the items were decoded from. For typed
    /// envelopes this is the model dump, not the server's bytes: pagination
    /// aliases come out under their canonical names (`page_number` as `page`,
    /// `num_pages` as `total_pages`, `total_results` as `total`) and numeric
    /// strings as numbers. Unknown keys are kept as sent.
    pub raw: Value,
}

/// A response body, tagged by how it reached us.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    /// Already decoded into a typed envelope.
    Typed(Envelope<T>),
    /// JSON of a shape not decoded yet.
    Json(Value),
    /// Tab-separated text with a header row.
    Text(String),
}

pub fn unify<T>(payload: Payload<T>) -> Result<PaginatedResult<T>, PortalError>
where
    T: DeserializeOwned + Serialize,
{
    match payload {
        Payload::Typed(envelope) => from_envelope(envelope),
        Payload::Json(value) => {
            let envelope: Envelope<T> = serde_json::from_value(value)
                .map_err(|err| PortalError::api(format!("failed to decode response: {err}")))?;
            from_envelope(envelope)
        }
        Payload::Text(text) => from_tsv(&text),
    }
}

/// Items default to empty when the envelope's `data` is null; `raw` is the whole envelope.
pub fn from_envelope<T: Serialize>(
    envelope: Envelope<T>,
) -> Result<PaginatedResult<T>, PortalError> {
    let raw = serde_json::to_value(&envelope)
        .map_err(|err| PortalError::api(format!("failed to serialize response: {err}")))?;
    Ok(PaginatedResult {
        items: envelope.data.unwrap_or_default(),
        pagination: envelope.pagination,
        raw,
    })
}

/// TSV carries no pagination envelope, so `pagination` is always `None` and
/// `raw` is rebuilt as `{"data": [...]}` from the materialized items.
pub fn from_tsv<T>(text: &str) -> Result<PaginatedResult<T>, PortalError>
where
    T: DeserializeOwned + Serialize,
{
    let items = parse_tsv(text)?
        .into_iter()
        .enumerate()
        .map(|(idx, row)| {
            serde_json::from_value::<T>(Value::Object(row)).map_err(|err| {
                PortalError::api(format!("failed to parse TSV row {}: {err}", idx + 1))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = serde_json::to_value(&items)
        .map_err(|err| PortalError::api(format!("failed to serialize TSV rows: {err}")))?;
    Ok(PaginatedResult {
        items,
        pagination: None,
        raw: json!({ "data": data }),
    })
}

/// Parses tab-separated text whose first record is the header.
///
/// Cells may be wrapped in double quotes; inside quotes `""` is a literal
/// quote and tabs or newlines belong to the cell. Blank lines are skipped and
/// short rows are padded with `null`. A row with more cells than the header
/// is malformed.
pub fn parse_tsv(text: &str) -> Result<Vec<Record>, PortalError> {
    let mut rows = tsv_rows(text).into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for row in rows {
        if row.cells.len() > header.cells.len() {
            return Err(PortalError::api(format!(
                "failed to parse TSV response: line {} has {} fields, header has {}",
                row.line,
                row.cells.len(),
                header.cells.len()
            )));
        }
        let mut cells = row.cells.into_iter();
        let mut record = Record::new();
        for name in &header.cells {
            let value = cells.next().map(Value::String).unwrap_or(Value::Null);
            record.insert(name.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

struct TsvRow {
    /// Line the row starts on, 1-based.
    line: usize,
    cells: Vec<String>,
}

fn tsv_rows(text: &str) -> Vec<TsvRow> {
    let mut rows = Vec::new();
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut saw_quote = false;
    let mut line = 1;
    let mut row_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push('\n');
                }
                other => cell.push(other),
            }
            continue;
        }
        match ch {
            '"' if cell.is_empty() => {
                in_quotes = true;
                saw_quote = true;
            }
            '\t' => cells.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                cells.push(std::mem::take(&mut cell));
                push_row(&mut rows, row_line, std::mem::take(&mut cells), saw_quote);
                saw_quote = false;
                line += 1;
                row_line = line;
            }
            other => cell.push(other),
        }
    }
    if saw_quote || !cell.is_empty() || !cells.is_empty() {
        cells.push(cell);
        push_row(&mut rows, row_line, cells, saw_quote);
    }
    rows
}

fn push_row(rows: &mut Vec<TsvRow>, line: usize, cells: Vec<String>, saw_quote: bool) {
    let blank = !saw_quote && cells.len() == 1 && cells[0].trim().is_empty();
    if !blank {
        rows.push(TsvRow { line, cells });
    }
}

/// Normalizes a listing that arrives either as a bare list or as `{"data": [...]}`.
///
/// Every entry goes through `table`, so all records share the same field set.
pub fn unify_listing(
    payload: &Value,
    table: &AliasTable,
    source: &str,
) -> Result<Vec<Record>, PortalError> {
    let entries: &[Value] = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => match object.get("data") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) => &[],
            _ => {
                return Err(PortalError::api(format!(
                    "unexpected response shape for {source}"
                )));
            }
        },
        _ => {
            return Err(PortalError::api(format!(
                "unexpected response shape for {source}"
            )));
        }
    };
    Ok(entries.iter().map(|entry| table.resolve(entry)).collect())
}

/// Keys tried, in order, for a row-set inside a JSON object.
pub const ROW_KEYS: [&str; 3] = ["data", "results", "items"];

/// Finds the displayable rows of an arbitrary JSON document.
///
/// `None` means "no rows": the caller should show the document itself.
pub fn extract_rows(payload: &Value) -> Option<&[Value]> {
    match payload {
        Value::Array(items) => Some(items.as_slice()),
        Value::Object(object) => ROW_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_short_rows_are_padded() {
        let rows = parse_tsv("a\tb\tc\n1\t2\n").unwrap();
        assert_eq!(rows[0]["c"], Value::Null);
        assert_eq!(rows[0]["b"], json!("2"));
    }

    #[test]
    fn tsv_long_rows_are_rejected() {
        assert!(parse_tsv("a\tb\n1\t2\t3\n").is_err());
    }

    #[test]
    fn tsv_handles_crlf_and_blank_lines() {
        let rows = parse_tsv("a\tb\r\n\r\n1\t2\r\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["b"], json!("2"));
    }

    #[test]
    fn tsv_quoted_cells_are_unwrapped() {
        let rows = parse_tsv("isolate_name\tspecies\nBU_1\t\"B. uniformis\"\n").unwrap();
        assert_eq!(rows[0]["species"], json!("B. uniformis"));
    }

    #[test]
    fn tsv_quoted_cells_keep_tabs_newlines_and_escaped_quotes() {
        let rows =
            parse_tsv("a\tb\tc\nx\t\"p\tq\"\t\"say \"\"hi\"\"\nthere\"\ny\t2\t3\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["b"], json!("p\tq"));
        assert_eq!(rows[0]["c"], json!("say \"hi\"\nthere"));
        assert_eq!(rows[1]["a"], json!("y"));
    }

    #[test]
    fn tsv_error_reports_starting_line() {
        let err = parse_tsv("a\tb\n\"multi\nline\"\t1\n1\t2\t3\n").unwrap_err();
        assert!(err.to_string().contains("line 4"), "{err}");
    }

    #[test]
    fn data_key_must_hold_a_list_to_win() {
        let payload = json!({"data": {"count": 1}, "results": [1, 2]});
        assert_eq!(extract_rows(&payload).map(<[Value]>::len), Some(2));
    }
}
