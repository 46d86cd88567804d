use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::aliases;
use crate::api::{ApiRegistry, Operation, ops};
use crate::config::{ClientConfig, ConfigLoader, ConfigOverrides};
use crate::error::PortalError;
use crate::models::{DrugMetabolism, DrugMic, Envelope, Gene, Genome, Record};
use crate::params::{Params, REQUEST_TIMEOUT_KEY, normalize, query_pairs};
use crate::request::{Format, RequestSpec};
use crate::transport::{HttpTransport, RawResponse, Transport, check_status};
use crate::unify::{PaginatedResult, Payload, from_tsv, parse_tsv, unify, unify_listing};

/// High-level client for the METT Data Portal.
///
/// Owns one transport session and a per-category cache of API bindings. The
/// cache uses interior mutability without locking, so one client should not
/// be shared across threads; build one client per thread instead.
pub struct DataPortalClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    transport: T,
    apis: ApiRegistry,
}

impl DataPortalClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, PortalError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Builds a client from `~/.mett/config.json` and `METT_*` environment variables.
    pub fn from_env() -> Result<Self, PortalError> {
        Self::new(ConfigLoader::resolve(None, ConfigOverrides::default())?)
    }
}

impl<T: Transport> DataPortalClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            apis: ApiRegistry::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of API categories whose bindings have been built so far.
    pub fn cached_bindings(&self) -> usize {
        self.apis.len()
    }

    // ---------------------------------------------------------------- species

    /// Lists all species. Entries are alias-resolved into a fixed field set.
    pub fn list_species(&self, format: Format) -> Result<Vec<Record>, PortalError> {
        let path = self.path_for(&ops::LIST_SPECIES, &[])?;
        let spec = RequestSpec::get(path)
            .with_format(format)
            .with_params(&Params::from_iter([(
                "format".to_string(),
                Value::from(format.as_str()),
            )]));
        let response = self.execute(&spec, self.config.timeout())?;
        let payload = match format {
            Format::Tsv => Value::Array(
                parse_tsv(&response.body)?
                    .into_iter()
                    .map(Value::Object)
                    .collect(),
            ),
            Format::Json => decode_json(&response, ops::LIST_SPECIES.path)?,
        };
        unify_listing(&payload, &aliases::SPECIES, ops::LIST_SPECIES.path)
    }

    pub fn species_genomes(
        &self,
        species_acronym: &str,
        params: &Params,
    ) -> Result<PaginatedResult<Genome>, PortalError> {
        self.paginated(
            &ops::SPECIES_GENOMES,
            &[("species_acronym", species_acronym)],
            params,
        )
    }

    // ---------------------------------------------------------------- genomes

    pub fn list_genomes(
        &self,
        format: Format,
        params: &Params,
    ) -> Result<PaginatedResult<Genome>, PortalError> {
        match format {
            Format::Tsv => self.paginated_tsv(&ops::LIST_GENOMES, &[], params),
            Format::Json => self.paginated(&ops::LIST_GENOMES, &[], params),
        }
    }

    pub fn search_genomes(
        &self,
        format: Format,
        params: &Params,
    ) -> Result<PaginatedResult<Genome>, PortalError> {
        match format {
            Format::Tsv => self.paginated_tsv(&ops::SEARCH_GENOMES, &[], params),
            Format::Json => self.paginated(&ops::SEARCH_GENOMES, &[], params),
        }
    }

    pub fn genome_genes(
        &self,
        isolate_name: &str,
        params: &Params,
    ) -> Result<PaginatedResult<Gene>, PortalError> {
        self.paginated(
            &ops::GENOME_GENES,
            &[("isolate_name", isolate_name)],
            params,
        )
    }

    // ------------------------------------------------------------------ genes

    pub fn search_genes(&self, params: &Params) -> Result<PaginatedResult<Gene>, PortalError> {
        self.paginated(&ops::SEARCH_GENES, &[], params)
    }

    pub fn search_genes_advanced(
        &self,
        params: &Params,
    ) -> Result<PaginatedResult<Gene>, PortalError> {
        self.paginated(&ops::SEARCH_GENES_ADVANCED, &[], params)
    }

    pub fn get_gene(&self, locus_tag: &str) -> Result<Gene, PortalError> {
        self.call_typed(&ops::GET_GENE, &[("locus_tag", locus_tag)], &Params::new())
    }

    // ------------------------------------------------------------------ drugs

    pub fn search_drug_mic(
        &self,
        format: Format,
        params: &Params,
    ) -> Result<PaginatedResult<DrugMic>, PortalError> {
        match format {
            Format::Tsv => self.paginated_tsv(&ops::SEARCH_DRUG_MIC, &[], params),
            Format::Json => self.paginated(&ops::SEARCH_DRUG_MIC, &[], params),
        }
    }

    pub fn search_drug_metabolism(
        &self,
        params: &Params,
    ) -> Result<PaginatedResult<DrugMetabolism>, PortalError> {
        self.paginated(&ops::SEARCH_DRUG_METABOLISM, &[], params)
    }

    pub fn strain_drug_mic(
        &self,
        isolate_name: &str,
        params: &Params,
    ) -> Result<PaginatedResult<DrugMic>, PortalError> {
        self.paginated(
            &ops::STRAIN_DRUG_MIC,
            &[("isolate_name", isolate_name)],
            params,
        )
    }

    pub fn strain_drug_metabolism(
        &self,
        isolate_name: &str,
        params: &Params,
    ) -> Result<PaginatedResult<DrugMetabolism>, PortalError> {
        self.paginated(
            &ops::STRAIN_DRUG_METABOLISM,
            &[("isolate_name", isolate_name)],
            params,
        )
    }

    pub fn strain_drug_data(&self, isolate_name: &str) -> Result<Value, PortalError> {
        self.call_typed(
            &ops::STRAIN_DRUG_DATA,
            &[("isolate_name", isolate_name)],
            &Params::new(),
        )
    }

    // ----------------------------------------------------------- experimental

    pub fn search_proteomics(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_PROTEOMICS, &[], params)
    }

    pub fn search_essentiality(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_ESSENTIALITY, &[], params)
    }

    pub fn search_fitness(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_FITNESS, &[], params)
    }

    pub fn search_mutant_growth(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_MUTANT_GROWTH, &[], params)
    }

    pub fn search_reactions(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_REACTIONS, &[], params)
    }

    // ----------------------------------------------------------- interactions

    pub fn search_ttp(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_TTP, &[], params)
    }

    pub fn ttp_gene_interactions(
        &self,
        locus_tag: &str,
        params: &Params,
    ) -> Result<Value, PortalError> {
        self.call_typed(&ops::TTP_GENE, &[("locus_tag", locus_tag)], params)
    }

    pub fn ttp_compound_interactions(
        &self,
        compound: &str,
        params: &Params,
    ) -> Result<Value, PortalError> {
        self.call_typed(&ops::TTP_COMPOUND, &[("compound", compound)], params)
    }

    pub fn search_ppi(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::SEARCH_PPI, &[], params)
    }

    pub fn ppi_neighbors(&self, params: &Params) -> Result<Value, PortalError> {
        self.call_typed(&ops::PPI_NEIGHBORS, &[], params)
    }

    // ---------------------------------------------------------------- generic

    /// Sends an arbitrary request and returns the response of any 2xx status.
    pub fn request(&self, spec: &RequestSpec) -> Result<RawResponse, PortalError> {
        self.execute(spec, self.config.timeout())
    }

    // --------------------------------------------------------------- internal

    fn execute(&self, spec: &RequestSpec, timeout: Duration) -> Result<RawResponse, PortalError> {
        let response = self.transport.send(spec, timeout)?;
        debug!(path = %spec.path, status = response.status, "response received");
        check_status(response)
    }

    fn path_for(&self, op: &Operation, args: &[(&str, &str)]) -> Result<String, PortalError> {
        self.apis
            .get(op.category, &self.config.base_url)?
            .path(op, args)
    }

    /// Normalizes `params` and builds the request. A `_request_timeout` control
    /// from the caller replaces the configured timeout for this call.
    fn typed_request(
        &self,
        op: &Operation,
        args: &[(&str, &str)],
        params: &Params,
    ) -> Result<(RequestSpec, Duration), PortalError> {
        let path = self.path_for(op, args)?;
        let normalized = normalize(params);
        let timeout = match normalized.get(REQUEST_TIMEOUT_KEY) {
            Some(value) => request_timeout(value)?,
            None => self.config.timeout(),
        };

        let mut spec = RequestSpec::get(path);
        spec.query = query_pairs(&normalized);
        Ok((spec, timeout))
    }

    fn call_typed<R: DeserializeOwned>(
        &self,
        op: &Operation,
        args: &[(&str, &str)],
        params: &Params,
    ) -> Result<R, PortalError> {
        let (spec, timeout) = self.typed_request(op, args, params)?;
        let response = self.execute(&spec, timeout)?;
        decode_json(&response, op.path)
    }

    fn paginated<R>(
        &self,
        op: &Operation,
        args: &[(&str, &str)],
        params: &Params,
    ) -> Result<PaginatedResult<R>, PortalError>
    where
        R: DeserializeOwned + Serialize,
    {
        let envelope: Envelope<R> = self.call_typed(op, args, params)?;
        unify(Payload::Typed(envelope))
    }

    fn paginated_tsv<R>(
        &self,
        op: &Operation,
        args: &[(&str, &str)],
        params: &Params,
    ) -> Result<PaginatedResult<R>, PortalError>
    where
        R: DeserializeOwned + Serialize,
    {
        let mut params = params.clone();
        params.insert("format".to_string(), Value::from(Format::Tsv.as_str()));
        let (spec, timeout) = self.typed_request(op, args, &params)?;
        let spec = spec.with_format(Format::Tsv);
        let response = self.execute(&spec, timeout)?;
        from_tsv(&response.body)
    }
}

/// Seconds given as a JSON number. Zero, negative and out-of-range values are rejected.
fn request_timeout(value: &Value) -> Result<Duration, PortalError> {
    value
        .as_f64()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| PortalError::InvalidTimeout(value.to_string()))
}

fn decode_json<R: DeserializeOwned>(response: &RawResponse, source: &str) -> Result<R, PortalError> {
    serde_json::from_str(&response.body).map_err(|err| PortalError::Api {
        status: Some(response.status),
        message: format!("failed to decode response from {source}: {err}"),
    })
}
