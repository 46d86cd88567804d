use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mett_dataportal::config::{ConfigLoader, ConfigOverrides};
use mett_dataportal::error::{ErrorKind, PortalError};
use mett_dataportal::negotiate::{Rendering, negotiate};
use mett_dataportal::output::{JsonOutput, print_rendering};
use mett_dataportal::params::Filters;
use mett_dataportal::request::{Format, RequestSpec, parse_header_pairs, parse_query_pairs};
use mett_dataportal::{DataPortalClient, PaginatedResult};

#[derive(Parser)]
#[command(name = "mett")]
#[command(about = "Query the METT Data Portal: species, genomes, genes and drug data")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    api_key: Option<String>,

    #[arg(long, global = true)]
    jwt: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[arg(long, global = true)]
    verify_ssl: Option<bool>,

    /// Config file (defaults to ~/.mett/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand, about = "Species catalogue")]
    Species(SpeciesCommand),
    #[command(subcommand, about = "Genome search and listing")]
    Genomes(GenomesCommand),
    #[command(subcommand, about = "Gene search and lookup")]
    Genes(GenesCommand),
    #[command(subcommand, about = "Drug MIC and metabolism data")]
    Drugs(DrugsCommand),
    #[command(subcommand, about = "Raw access to any portal endpoint")]
    Api(ApiCommand),
}

#[derive(Subcommand)]
enum SpeciesCommand {
    #[command(about = "List all species")]
    List(FormatArgs),
}

#[derive(Subcommand)]
enum GenomesCommand {
    #[command(about = "Search genomes by free text")]
    Search(GenomeSearchArgs),
    #[command(about = "List all genomes")]
    List(GenomeListArgs),
    #[command(about = "List the genes of one genome")]
    Genes(GenomeGenesArgs),
}

#[derive(Subcommand)]
enum GenesCommand {
    #[command(about = "Search genes by free text")]
    Search(GeneSearchArgs),
    #[command(about = "Fetch one gene by locus tag")]
    Get(GeneGetArgs),
}

#[derive(Subcommand)]
enum DrugsCommand {
    #[command(about = "Search minimum inhibitory concentrations")]
    Mic(DrugSearchArgs),
    #[command(about = "Search drug metabolism measurements")]
    Metabolism(DrugSearchArgs),
}

#[derive(Subcommand)]
enum ApiCommand {
    #[command(about = "Send an arbitrary request")]
    Request(RawRequestArgs),
}

#[derive(Args, Clone, Copy)]
struct FormatArgs {
    #[arg(short, long)]
    format: Option<Format>,
}

#[derive(Args, Clone, Copy)]
struct PageArgs {
    #[arg(long)]
    page: Option<u64>,

    #[arg(long)]
    per_page: Option<u64>,
}

#[derive(Args)]
struct GenomeSearchArgs {
    #[arg(long, short)]
    query: Option<String>,

    #[arg(long)]
    species: Option<String>,

    #[command(flatten)]
    page: PageArgs,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct GenomeListArgs {
    #[command(flatten)]
    page: PageArgs,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct GenomeGenesArgs {
    isolate: String,

    #[command(flatten)]
    page: PageArgs,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct GeneSearchArgs {
    #[arg(long, short)]
    query: Option<String>,

    #[arg(long)]
    species: Option<String>,

    /// Restrict to these isolates; repeatable
    #[arg(long = "isolate")]
    isolates: Vec<String>,

    #[command(flatten)]
    page: PageArgs,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct GeneGetArgs {
    locus_tag: String,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct DrugSearchArgs {
    #[arg(long, short)]
    query: Option<String>,

    #[arg(long)]
    drug_name: Option<String>,

    #[arg(long)]
    species: Option<String>,

    #[arg(long)]
    isolate: Option<String>,

    #[command(flatten)]
    page: PageArgs,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Args)]
struct RawRequestArgs {
    method: String,

    path: String,

    /// Query parameter as KEY=VALUE; repeatable
    #[arg(short = 'q', long = "query")]
    query: Vec<String>,

    /// Header as KEY:VALUE; repeatable
    #[arg(short = 'H', long = "header")]
    header: Vec<String>,

    #[arg(long)]
    body: Option<String>,

    #[arg(long)]
    json: Option<String>,

    #[command(flatten)]
    format: FormatArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PortalError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PortalError) -> u8 {
    match error.kind() {
        ErrorKind::Caller | ErrorKind::Config => 2,
        ErrorKind::Api => 3,
        ErrorKind::Authentication => 4,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("mett_dataportal=debug,mett=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let overrides = ConfigOverrides {
        base_url: cli.base_url,
        api_key: cli.api_key,
        jwt_token: cli.jwt,
        timeout: cli.timeout,
        verify_ssl: cli.verify_ssl,
        user_agent: None,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let client = DataPortalClient::new(config)?;

    match cli.command {
        Commands::Species(SpeciesCommand::List(args)) => run_species(&client, args.format),
        Commands::Genomes(command) => run_genomes(&client, command),
        Commands::Genes(command) => run_genes(&client, command),
        Commands::Drugs(command) => run_drugs(&client, command),
        Commands::Api(ApiCommand::Request(args)) => run_request(&client, args),
    }
}

fn run_species(client: &DataPortalClient, format: Option<Format>) -> miette::Result<()> {
    let records = client.list_species(format.unwrap_or(Format::Json))?;
    let rows = records.into_iter().map(Value::Object).collect::<Vec<_>>();
    let rendering = match format {
        Some(Format::Json) => Rendering::Json(Value::Array(rows)),
        Some(Format::Tsv) => Rendering::Tsv(rows),
        None => Rendering::Table {
            title: "species".to_string(),
            rows,
        },
    };
    print_rendering(&rendering).into_diagnostic()
}

fn run_genomes(client: &DataPortalClient, command: GenomesCommand) -> miette::Result<()> {
    match command {
        GenomesCommand::Search(args) => {
            let params = page_filters(args.page)
                .set_opt("query", args.query)
                .set_opt("species_acronym", args.species)
                .into_params();
            let format = args.format.format;
            let result = client.search_genomes(wire_format(format), &params)?;
            emit(format, "genomes", &result)
        }
        GenomesCommand::List(args) => {
            let params = page_filters(args.page).into_params();
            let format = args.format.format;
            let result = client.list_genomes(wire_format(format), &params)?;
            emit(format, "genomes", &result)
        }
        GenomesCommand::Genes(args) => {
            let params = page_filters(args.page).into_params();
            let result = client.genome_genes(&args.isolate, &params)?;
            emit(args.format.format, "genes", &result)
        }
    }
}

fn run_genes(client: &DataPortalClient, command: GenesCommand) -> miette::Result<()> {
    match command {
        GenesCommand::Search(args) => {
            let params = page_filters(args.page)
                .set_opt("query", args.query)
                .set_opt("species_acronym", args.species)
                .set_list("isolates", &args.isolates)
                .into_params();
            let result = client.search_genes(&params)?;
            emit(args.format.format, "genes", &result)
        }
        GenesCommand::Get(args) => {
            let gene = client.get_gene(&args.locus_tag)?;
            let value = serde_json::to_value(&gene).into_diagnostic()?;
            let rendering = match args.format.format {
                Some(Format::Json) => Rendering::Json(value),
                Some(Format::Tsv) => Rendering::Tsv(vec![value]),
                None => Rendering::Table {
                    title: args.locus_tag,
                    rows: vec![value],
                },
            };
            print_rendering(&rendering).into_diagnostic()
        }
    }
}

fn run_drugs(client: &DataPortalClient, command: DrugsCommand) -> miette::Result<()> {
    match command {
        DrugsCommand::Mic(args) => {
            let format = args.format.format;
            let params = drug_filters(&args).into_params();
            let result = client.search_drug_mic(wire_format(format), &params)?;
            emit(format, "drug MIC", &result)
        }
        DrugsCommand::Metabolism(args) => {
            let format = args.format.format;
            let params = drug_filters(&args).into_params();
            let result = client.search_drug_metabolism(&params)?;
            emit(format, "drug metabolism", &result)
        }
    }
}

fn run_request(client: &DataPortalClient, args: RawRequestArgs) -> miette::Result<()> {
    let mut builder = RequestSpec::builder(&args.method, &args.path)
        .queries(parse_query_pairs(&args.query)?)
        .headers(parse_header_pairs(&args.header)?)
        .format(args.format.format);
    if let Some(body) = args.body {
        builder = builder.text_body(body);
    }
    if let Some(json) = args.json {
        builder = builder.json_literal(json);
    }
    let spec = builder.build()?;
    let response = client.request(&spec)?;
    let rendering = negotiate(spec.format, &response, &spec.path);
    print_rendering(&rendering).into_diagnostic()
}

fn page_filters(page: PageArgs) -> Filters {
    Filters::new()
        .set_opt("page", page.page)
        .set_opt("per_page", page.per_page)
}

fn drug_filters(args: &DrugSearchArgs) -> Filters {
    page_filters(args.page)
        .set_opt("query", args.query.clone())
        .set_opt("drug_name", args.drug_name.clone())
        .set_opt("species_acronym", args.species.clone())
        .set_opt("isolate_name", args.isolate.clone())
}

fn wire_format(format: Option<Format>) -> Format {
    format.unwrap_or(Format::Json)
}

/// `-f json` dumps the raw document, `-f tsv` the items as TSV, otherwise a table.
fn emit<T: Serialize>(
    format: Option<Format>,
    title: &str,
    result: &PaginatedResult<T>,
) -> miette::Result<()> {
    if format == Some(Format::Json) {
        return JsonOutput::print_json(&result.raw).into_diagnostic();
    }
    let rows = match serde_json::to_value(&result.items).into_diagnostic()? {
        Value::Array(rows) => rows,
        other => vec![other],
    };
    let rendering = match format {
        Some(Format::Tsv) => Rendering::Tsv(rows),
        _ => Rendering::Table {
            title: table_title(title, result),
            rows,
        },
    };
    print_rendering(&rendering).into_diagnostic()
}

fn table_title<T>(title: &str, result: &PaginatedResult<T>) -> String {
    match result.pagination.as_ref() {
        Some(pagination) => match (pagination.page, pagination.total_pages, pagination.total) {
            (Some(page), Some(pages), Some(total)) => {
                format!("{title} (page {page}/{pages}, {total} total)")
            }
            (_, _, Some(total)) => format!("{title} ({total} total)"),
            _ => title.to_string(),
        },
        None => title.to_string(),
    }
}
