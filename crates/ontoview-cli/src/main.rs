//! Ontoview CLI - Command-line interface
//!
//! Usage:
//!   ontoview --data snapshot.json ancestors <id>
//!   ontoview --data snapshot.json descendants <id> --direct
//!   ontoview --data snapshot.json --species 9606 elements

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ontoview_core::{
    AppConfig, ConfigError, Entity, EntityKind, LoggingConfig, RelationType, Scope,
};
use ontoview_graph::{Direction, InMemoryStore, OntologyRequest, OntologyService, RelativesQuery};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "ontoview")]
#[command(about = "Query anatomical and developmental stage ontologies")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store snapshot (JSON)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Entity kind: anat_entity or dev_stage
    #[arg(long, global = true)]
    kind: Option<EntityKind>,

    /// Species to restrict to, comma-separated
    #[arg(long, global = true, value_delimiter = ',')]
    species: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the ancestors of an element
    Ancestors(RelativesArgs),
    /// List the descendants of an element
    Descendants(RelativesArgs),
    /// List the elements valid in the requested species
    Elements,
}

#[derive(clap::Args)]
struct RelativesArgs {
    /// Element identifier (e.g., UBERON:0000955)
    id: String,

    /// Only follow direct relations
    #[arg(long)]
    direct: bool,

    /// Relation type to follow (repeatable)
    #[arg(long = "relation-type")]
    relation_types: Vec<RelationType>,
}

#[derive(Serialize)]
struct ElementOutput<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    if let Some(data) = cli.data {
        config.store.snapshot_path = Some(data);
    }
    if let Some(kind) = cli.kind {
        config.query.entity_kind = kind;
    }
    if !cli.species.is_empty() {
        config.query.species = cli.species;
    }

    init_logging(&config.logging);

    let path = config
        .store
        .snapshot_path
        .clone()
        .ok_or_else(|| ConfigError::MissingRequired("store snapshot (--data)".to_string()))?;
    let store = InMemoryStore::from_json_file(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::info!(path = %path.display(), "Store snapshot loaded");
    let service = OntologyService::new(Arc::new(store));

    let output = match cli.command {
        Commands::Ancestors(args) => {
            relatives(&service, &config, Direction::Ancestors, args).await?
        }
        Commands::Descendants(args) => {
            relatives(&service, &config, Direction::Descendants, args).await?
        }
        Commands::Elements => elements(&service, &config).await?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn base_request(config: &AppConfig) -> OntologyRequest {
    OntologyRequest::new(config.query.entity_kind)
        .with_species(config.query.species.iter().cloned())
        .with_relation_types(config.query.relation_types.iter().copied())
}

async fn relatives(
    service: &OntologyService,
    config: &AppConfig,
    direction: Direction,
    args: RelativesArgs,
) -> anyhow::Result<serde_json::Value> {
    let mut request = base_request(config)
        .with_entity_ids(Scope::only([args.id.clone()]))
        .with_ancestors(direction == Direction::Ancestors)
        .with_descendants(direction == Direction::Descendants);
    if !args.relation_types.is_empty() {
        request = request.with_relation_types(args.relation_types);
    }

    let multi = service.build_ontology_view(&request).await?;
    let view = multi.view();

    let mut query = RelativesQuery::new().direct_only(args.direct || config.query.direct_only);
    if !request.species_ids.is_empty() {
        query = query.with_species(request.species_ids.iter().cloned());
    }

    let element = Entity::new(args.id, request.kind);
    let found = view.relatives(&element, direction, &query)?;
    render(found)
}

async fn elements(
    service: &OntologyService,
    config: &AppConfig,
) -> anyhow::Result<serde_json::Value> {
    let request = base_request(config);
    let multi = service.build_ontology_view(&request).await?;
    let view = multi.view();

    let found: HashSet<&Entity> = if request.species_ids.is_empty() {
        view.elements().collect()
    } else {
        view.elements_for_species(&request.species_ids)?
    };
    render(found)
}

fn render(entities: HashSet<&Entity>) -> anyhow::Result<serde_json::Value> {
    let mut output: Vec<ElementOutput<'_>> = entities
        .into_iter()
        .map(|e| ElementOutput {
            id: &e.id,
            name: e.name.as_deref(),
        })
        .collect();
    output.sort_by(|a, b| a.id.cmp(b.id));
    Ok(serde_json::to_value(output)?)
}
