//! Field-alias tables for entities whose wire field names have drifted.
//!
//! Each logical field lists the source names that are accepted for it, in
//! lookup order. The first source holding a present, non-null, non-empty
//! value wins; a field with no usable source resolves to `null`.

use serde_json::Value;

use crate::models::Record;

#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    pub entity: &'static str,
    /// Receives the entry's text when the entry is not an object.
    pub fallback_field: &'static str,
    pub fields: &'static [(&'static str, &'static [&'static str])],
}

pub const SPECIES: AliasTable = AliasTable {
    entity: "species",
    fallback_field: "species_scientific_name",
    fields: &[
        ("species_acronym", &["species_acronym", "acronym", "short_name"]),
        (
            "species_scientific_name",
            &["species_scientific_name", "scientific_name", "name"],
        ),
        ("genome_count", &["genome_count", "genomes", "num_genomes"]),
        ("type_strain_count", &["type_strain_count", "type_strains"]),
        ("description", &["description", "common_name"]),
        ("taxonomy_id", &["taxonomy_id", "tax_id"]),
    ],
};

impl AliasTable {
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    /// Resolves `entry` into a record holding exactly the table's fields, in table order.
    pub fn resolve(&self, entry: &Value) -> Record {
        let mut record = Record::new();
        let Some(object) = entry.as_object() else {
            for name in self.field_names() {
                let value = if name == self.fallback_field {
                    Value::String(display_text(entry))
                } else {
                    Value::Null
                };
                record.insert(name.to_string(), value);
            }
            return record;
        };

        for (name, sources) in self.fields {
            let value = sources
                .iter()
                .filter_map(|source| object.get(*source))
                .find(|value| is_usable(value))
                .cloned()
                .unwrap_or(Value::Null);
            record.insert((*name).to_string(), value);
        }
        record
    }
}

fn is_usable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
