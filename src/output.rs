use std::io::{self, Write};

use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

use crate::negotiate::Rendering;
use crate::params::scalar_text;

/// Column used for rows that are not JSON objects.
pub const SCALAR_COLUMN: &str = "value";

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Union of the rows' keys in first-seen order.
pub fn columns(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        match row {
            Value::Object(object) => {
                for key in object.keys() {
                    if !columns.iter().any(|existing| existing == key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => {
                if !columns.iter().any(|existing| existing == SCALAR_COLUMN) {
                    columns.push(SCALAR_COLUMN.to_string());
                }
            }
        }
    }
    columns
}

/// Display text of one cell. Nested values are written as compact JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value @ (Value::Array(_) | Value::Object(_))) => value.to_string(),
        Some(value) => scalar_text(value),
    }
}

fn row_cells(row: &Value, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|column| match row {
            Value::Object(object) => cell_text(object.get(column)),
            scalar if column == SCALAR_COLUMN => cell_text(Some(scalar)),
            _ => String::new(),
        })
        .collect()
}

/// Header line then one line per row, every line newline-terminated.
pub fn render_tsv(rows: &[Value]) -> String {
    let columns = columns(rows);
    if columns.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&columns.join("\t"));
    out.push('\n');
    for row in rows {
        let cells = row_cells(row, &columns)
            .into_iter()
            .map(|cell| cell.replace(['\t', '\n', '\r'], " "))
            .collect::<Vec<_>>();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

pub fn render_table(rows: &[Value]) -> Table {
    let columns = columns(rows);
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(columns.clone());
    for row in rows {
        table.add_row(row_cells(row, &columns));
    }
    table
}

pub fn print_rendering(rendering: &Rendering) -> io::Result<()> {
    let mut stdout = io::stdout();
    match rendering {
        Rendering::Table { title, rows } => {
            if rows.is_empty() {
                writeln!(stdout, "{title}: no results")?;
            } else {
                writeln!(stdout, "{title} ({} rows)", rows.len())?;
                writeln!(stdout, "{}", render_table(rows))?;
            }
        }
        Rendering::Json(value) => JsonOutput::print_json(value)?,
        Rendering::Tsv(rows) => stdout.write_all(render_tsv(rows).as_bytes())?,
        Rendering::Text(text) => {
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
