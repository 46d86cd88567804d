//! Decides how a generic response is shown.

use serde_json::Value;

use crate::request::Format;
use crate::transport::RawResponse;
use crate::unify::extract_rows;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Table,
    Json,
    Tsv,
    Text,
}

/// Result of negotiation. Every response maps to exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendering {
    Table { title: String, rows: Vec<Value> },
    Json(Value),
    Tsv(Vec<Value>),
    /// Body shown verbatim.
    Text(String),
}

impl Rendering {
    pub fn kind(&self) -> RenderKind {
        match self {
            Rendering::Table { .. } => RenderKind::Table,
            Rendering::Json(_) => RenderKind::Json,
            Rendering::Tsv(_) => RenderKind::Tsv,
            Rendering::Text(_) => RenderKind::Text,
        }
    }
}

/// Chooses a rendering from the requested format and what the server sent.
///
/// * TSV requested: a body declared as TSV is passed through; otherwise JSON
///   rows (or a lone object as one row) become TSV, and anything else is text.
/// * JSON requested: decoded JSON is dumped; undecodable bodies are text.
/// * Nothing requested: JSON with a row-set becomes a table, other JSON is
///   dumped, undecodable bodies are text.
pub fn negotiate(desired: Option<Format>, response: &RawResponse, title: &str) -> Rendering {
    let decoded = serde_json::from_str::<Value>(&response.body).ok();
    match desired {
        Some(Format::Tsv) => {
            if response.declares_tsv() {
                return Rendering::Text(response.body.clone());
            }
            let Some(value) = decoded else {
                return Rendering::Text(response.body.clone());
            };
            if let Some(rows) = extract_rows(&value) {
                return Rendering::Tsv(rows.to_vec());
            }
            if value.is_object() {
                Rendering::Tsv(vec![value])
            } else {
                Rendering::Text(response.body.clone())
            }
        }
        Some(Format::Json) => match decoded {
            Some(value) => Rendering::Json(value),
            None => Rendering::Text(response.body.clone()),
        },
        None => {
            let Some(value) = decoded else {
                return Rendering::Text(response.body.clone());
            };
            if let Some(rows) = extract_rows(&value) {
                return Rendering::Table {
                    title: title.to_string(),
                    rows: rows.to_vec(),
                };
            }
            Rendering::Json(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_tsv_passes_through_verbatim() {
        let response =
            RawResponse::new(200, Some("text/tab-separated-values"), "a\tb\n1\t2\n");
        assert_eq!(
            negotiate(Some(Format::Tsv), &response, "x"),
            Rendering::Text("a\tb\n1\t2\n".to_string())
        );
    }

    #[test]
    fn scalar_json_requested_as_tsv_is_text() {
        let response = RawResponse::new(200, Some("application/json"), "42");
        assert_eq!(
            negotiate(Some(Format::Tsv), &response, "x").kind(),
            RenderKind::Text
        );
    }
}
