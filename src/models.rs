//! Typed records returned by the portal.
//!
//! Every model keeps fields it does not know about in `extra`, and numeric or
//! boolean fields accept their string spelling too, so the same constructors
//! work for JSON envelopes and for rows parsed out of TSV.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One domain entity as a field-name to value mapping.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Pagination {
    #[serde(default, alias = "page_number", with = "lenient::u64_opt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, with = "lenient::u64_opt", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(default, alias = "total_results", alias = "total_count", with = "lenient::u64_opt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, alias = "num_pages", with = "lenient::u64_opt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(default, with = "lenient::bool_opt", skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
    #[serde(default, with = "lenient::bool_opt", skip_serializing_if = "Option::is_none")]
    pub has_previous: Option<bool>,
    #[serde(flatten)]
    pub extra: Record,
}

/// Paginated response body: `{ "data": [...], "pagination": {...}, ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub data: Option<Vec<T>>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Genome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_acronym: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_accession: Option<String>,
    #[serde(default, with = "lenient::bool_opt", skip_serializing_if = "Option::is_none")]
    pub type_strain: Option<bool>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Gene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locus_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_acronym: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_id: Option<String>,
    #[serde(default, with = "lenient::u64_opt", skip_serializing_if = "Option::is_none")]
    pub start_position: Option<u64>,
    #[serde(default, with = "lenient::u64_opt", skip_serializing_if = "Option::is_none")]
    pub end_position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<Value>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DrugMic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_acronym: Option<String>,
    #[serde(default, with = "lenient::f64_opt", skip_serializing_if = "Option::is_none")]
    pub mic_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic_relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental_condition: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DrugMetabolism {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species_acronym: Option<String>,
    #[serde(default, with = "lenient::f64_opt", skip_serializing_if = "Option::is_none")]
    pub degr_percent: Option<f64>,
    #[serde(default, with = "lenient::f64_opt", skip_serializing_if = "Option::is_none")]
    pub pval: Option<f64>,
    #[serde(default, with = "lenient::f64_opt", skip_serializing_if = "Option::is_none")]
    pub fdr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metabolizer_classification: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

/// Serde helpers accepting either the native JSON type or its text form.
/// Empty strings decode to `None`, which is what a blank TSV cell means.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text_or_value<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Value>, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            other => other,
        })
    }

    pub mod u64_opt {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            match text_or_value(deserializer)? {
                None => Ok(None),
                Some(Value::Number(number)) => number
                    .as_u64()
                    .map(Some)
                    .ok_or_else(|| {
                        D::Error::custom(format!("expected unsigned integer, got {number}"))
                    }),
                Some(Value::String(text)) => text
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| {
                        D::Error::custom(format!("expected unsigned integer, got '{text}'"))
                    }),
                Some(other) => Err(D::Error::custom(format!(
                    "expected unsigned integer, got {other}"
                ))),
            }
        }

        pub fn serialize<S: serde::Serializer>(
            value: &Option<u64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serde::Serialize::serialize(value, serializer)
        }
    }

    pub mod f64_opt {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            match text_or_value(deserializer)? {
                None => Ok(None),
                Some(Value::Number(number)) => number
                    .as_f64()
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("expected number, got {number}"))),
                Some(Value::String(text)) => text
                    .trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("expected number, got '{text}'"))),
                Some(other) => Err(D::Error::custom(format!("expected number, got {other}"))),
            }
        }

        pub fn serialize<S: serde::Serializer>(
            value: &Option<f64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serde::Serialize::serialize(value, serializer)
        }
    }

    pub mod bool_opt {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<bool>, D::Error> {
            match text_or_value(deserializer)? {
                None => Ok(None),
                Some(Value::Bool(flag)) => Ok(Some(flag)),
                Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Some(true)),
                    "false" | "0" | "no" => Ok(Some(false)),
                    _ => Err(D::Error::custom(format!("expected boolean, got '{text}'"))),
                },
                Some(other) => Err(D::Error::custom(format!("expected boolean, got {other}"))),
            }
        }

        pub fn serialize<S: serde::Serializer>(
            value: &Option<bool>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serde::Serialize::serialize(value, serializer)
        }
    }
}
