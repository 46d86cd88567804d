//! Typed operation catalogue and the per-category bindings built from it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCategory {
    Species,
    Genomes,
    Genes,
    Drugs,
    Proteomics,
    Essentiality,
    Fitness,
    MutantGrowth,
    Reactions,
    PooledTtp,
    ProteinInteractions,
}

impl fmt::Display for ApiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiCategory::Species => "species",
            ApiCategory::Genomes => "genomes",
            ApiCategory::Genes => "genes",
            ApiCategory::Drugs => "drugs",
            ApiCategory::Proteomics => "proteomics",
            ApiCategory::Essentiality => "essentiality",
            ApiCategory::Fitness => "fitness",
            ApiCategory::MutantGrowth => "mutant-growth",
            ApiCategory::Reactions => "reactions",
            ApiCategory::PooledTtp => "pooled-ttp",
            ApiCategory::ProteinInteractions => "ppi",
        };
        f.write_str(name)
    }
}

/// A GET endpoint with `{placeholder}` path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub category: ApiCategory,
    pub name: &'static str,
    pub path: &'static str,
}

macro_rules! operations {
    ($($ident:ident => ($category:ident, $name:literal, $path:literal);)*) => {
        $(
            pub const $ident: Operation = Operation {
                category: ApiCategory::$category,
                name: $name,
                path: $path,
            };
        )*

        pub const ALL: &[Operation] = &[$($ident),*];
    };
}

pub mod ops {
    use super::{ApiCategory, Operation};

    operations! {
        LIST_SPECIES => (Species, "list_species", "/api/species/");
        SPECIES_GENOMES => (Species, "get_genomes_by_species", "/api/species/{species_acronym}/genomes");
        LIST_GENOMES => (Genomes, "get_all_genomes", "/api/genomes/");
        SEARCH_GENOMES => (Genomes, "search_genomes_by_string", "/api/genomes/search");
        GENOME_GENES => (Genomes, "get_genes_by_genome", "/api/genomes/{isolate_name}/genes");
        STRAIN_DRUG_MIC => (Genomes, "get_strain_drug_mic", "/api/genomes/{isolate_name}/drug-mic");
        STRAIN_DRUG_METABOLISM => (Genomes, "get_strain_drug_metabolism", "/api/genomes/{isolate_name}/drug-metabolism");
        STRAIN_DRUG_DATA => (Genomes, "get_strain_drug_data", "/api/genomes/{isolate_name}/drug-data");
        SEARCH_GENES => (Genes, "search_genes_by_string", "/api/genes/search");
        SEARCH_GENES_ADVANCED => (Genes, "search_genes_advanced", "/api/genes/search/advanced");
        GET_GENE => (Genes, "get_gene_by_locus_tag", "/api/genes/{locus_tag}");
        SEARCH_DRUG_MIC => (Drugs, "search_drug_mic", "/api/drugs/mic/search");
        SEARCH_DRUG_METABOLISM => (Drugs, "search_drug_metabolism", "/api/drugs/metabolism/search");
        SEARCH_PROTEOMICS => (Proteomics, "search_proteomics", "/api/proteomics/search");
        SEARCH_ESSENTIALITY => (Essentiality, "search_essentiality", "/api/essentiality/search");
        SEARCH_FITNESS => (Fitness, "search_fitness", "/api/fitness/search");
        SEARCH_MUTANT_GROWTH => (MutantGrowth, "search_mutant_growth", "/api/mutant-growth/search");
        SEARCH_REACTIONS => (Reactions, "search_reactions", "/api/reactions/search");
        SEARCH_TTP => (PooledTtp, "search_interactions", "/api/interactions/ttp/search");
        TTP_GENE => (PooledTtp, "get_gene_interactions", "/api/interactions/ttp/gene/{locus_tag}");
        TTP_COMPOUND => (PooledTtp, "get_compound_interactions", "/api/interactions/ttp/compound/{compound}");
        SEARCH_PPI => (ProteinInteractions, "search_ppi_interactions", "/api/interactions/ppi/search");
        PPI_NEIGHBORS => (ProteinInteractions, "get_all_protein_neighbors", "/api/interactions/ppi/neighbors");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Param(&'static str),
}

#[derive(Debug, Clone)]
struct Template {
    segments: Vec<Segment>,
    trailing_slash: bool,
}

impl Template {
    fn parse(path: &'static str) -> Self {
        let trimmed = path.trim_start_matches('/');
        let trailing_slash = trimmed.ends_with('/');
        let segments = trimmed
            .trim_end_matches('/')
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => Segment::Param(name),
                None => Segment::Literal(part),
            })
            .collect();
        Self {
            segments,
            trailing_slash,
        }
    }
}

/// The operations of one category, with their path templates parsed against the base URL.
#[derive(Debug)]
pub struct ApiBinding {
    category: ApiCategory,
    root: Url,
    templates: HashMap<&'static str, Template>,
}

impl ApiBinding {
    pub fn new(category: ApiCategory, base_url: &str) -> Result<Self, PortalError> {
        let root = Url::parse(base_url).map_err(|err| PortalError::InvalidConfigValue {
            key: "base_url".to_string(),
            value: format!("{base_url} ({err})"),
        })?;
        if root.cannot_be_a_base() {
            return Err(PortalError::InvalidConfigValue {
                key: "base_url".to_string(),
                value: base_url.to_string(),
            });
        }
        let templates = ops::ALL
            .iter()
            .filter(|op| op.category == category)
            .map(|op| (op.name, Template::parse(op.path)))
            .collect();
        Ok(Self {
            category,
            root,
            templates,
        })
    }

    pub fn category(&self) -> ApiCategory {
        self.category
    }

    /// Renders `op`'s path relative to the base URL, percent-encoding each argument
    /// into a single path segment.
    pub fn path(&self, op: &Operation, args: &[(&str, &str)]) -> Result<String, PortalError> {
        let template = self
            .templates
            .get(op.name)
            .filter(|_| op.category == self.category)
            .ok_or_else(|| PortalError::InvalidPath(op.path.to_string()))?;

        let mut url = self.root.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PortalError::InvalidPath(op.path.to_string()))?;
            segments.pop_if_empty();
            for segment in &template.segments {
                match segment {
                    Segment::Literal(text) => {
                        segments.push(text);
                    }
                    Segment::Param(name) => {
                        let value = args
                            .iter()
                            .find(|(key, _)| key == name)
                            .map(|(_, value)| *value)
                            .filter(|value| !value.is_empty())
                            .ok_or_else(|| {
                                PortalError::InvalidPath(format!("{} (missing {name})", op.path))
                            })?;
                        segments.push(value);
                    }
                }
            }
            if template.trailing_slash {
                segments.push("");
            }
        }

        let full = url.path();
        Ok(full.strip_prefix(prefix.as_str()).unwrap_or(full).to_string())
    }
}

/// Lazily built bindings, one per category, owned by a single client.
#[derive(Debug, Default)]
pub struct ApiRegistry {
    bindings: RefCell<HashMap<ApiCategory, Arc<ApiBinding>>>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        category: ApiCategory,
        base_url: &str,
    ) -> Result<Arc<ApiBinding>, PortalError> {
        if let Some(binding) = self.bindings.borrow().get(&category) {
            return Ok(Arc::clone(binding));
        }
        debug!(%category, "building API binding");
        let binding = Arc::new(ApiBinding::new(category, base_url)?);
        self.bindings
            .borrow_mut()
            .insert(category, Arc::clone(&binding));
        Ok(binding)
    }

    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn renders_literal_paths_with_trailing_slash() {
        let binding = ApiBinding::new(ApiCategory::Species, "https://api.example.org").unwrap();
        assert_eq!(binding.path(&ops::LIST_SPECIES, &[]).unwrap(), "/api/species/");
    }

    #[test]
    fn encodes_arguments_as_single_segments() {
        let binding =
            ApiBinding::new(ApiCategory::Genomes, "https://api.example.org/portal").unwrap();
        let path = binding
            .path(&ops::GENOME_GENES, &[("isolate_name", "BU ATCC/1")])
            .unwrap();
        assert_eq!(path, "/api/genomes/BU%20ATCC%2F1/genes");
    }

    #[test]
    fn missing_argument_is_rejected() {
        let binding = ApiBinding::new(ApiCategory::Genes, "https://api.example.org").unwrap();
        let err = binding.path(&ops::GET_GENE, &[]).unwrap_err();
        assert_matches!(err, PortalError::InvalidPath(_));
    }

    #[test]
    fn operation_from_other_category_is_rejected() {
        let binding = ApiBinding::new(ApiCategory::Genes, "https://api.example.org").unwrap();
        assert!(binding.path(&ops::SEARCH_DRUG_MIC, &[]).is_err());
    }

    #[test]
    fn registry_builds_each_category_once() {
        let registry = ApiRegistry::new();
        let first = registry.get(ApiCategory::Genes, "https://api.example.org").unwrap();
        let second = registry.get(ApiCategory::Genes, "https://api.example.org").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        registry.get(ApiCategory::Drugs, "https://api.example.org").unwrap();
        assert_eq!(registry.len(), 2);
    }
}
