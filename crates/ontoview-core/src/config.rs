//! Ontoview Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{EntityKind, RelationType, SpeciesId};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Relation store configuration
    pub store: StoreConfig,

    /// Default query parameters
    pub query: QueryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ONTOVIEW_DATA") {
            config.store.snapshot_path = Some(PathBuf::from(path));
        }

        // Comma-separated species identifiers
        if let Ok(species) = std::env::var("ONTOVIEW_SPECIES") {
            config.query.species = parse_list(&species);
        }

        if let Ok(kind) = std::env::var("ONTOVIEW_ENTITY_KIND") {
            config.query.entity_kind = kind.parse().map_err(|_| ConfigError::InvalidValue {
                key: "ONTOVIEW_ENTITY_KIND".to_string(),
                value: kind,
            })?;
        }

        if let Ok(types) = std::env::var("ONTOVIEW_RELATION_TYPES") {
            config.query.relation_types = parse_relation_types("ONTOVIEW_RELATION_TYPES", &types)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        if env_config.store.snapshot_path.is_some() {
            self.store.snapshot_path = env_config.store.snapshot_path;
        }
        if !env_config.query.species.is_empty() {
            self.query.species = env_config.query.species;
        }
        if env_config.query.entity_kind != QueryConfig::default().entity_kind {
            self.query.entity_kind = env_config.query.entity_kind;
        }
        if env_config.query.relation_types != QueryConfig::default().relation_types {
            self.query.relation_types = env_config.query.relation_types;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }

        Ok(self)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_relation_types(key: &str, raw: &str) -> Result<Vec<RelationType>, ConfigError> {
    parse_list(raw)
        .into_iter()
        .map(|value| {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .collect()
}

/// Relation store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot loaded into the in-memory store
    pub snapshot_path: Option<PathBuf>,
}

/// Default parameters applied to ontology queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Kind of ontology to build
    pub entity_kind: EntityKind,

    /// Species the ontology is built for
    pub species: Vec<SpeciesId>,

    /// Relation types considered
    pub relation_types: Vec<RelationType>,

    /// Only follow direct relations
    pub direct_only: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            entity_kind: EntityKind::AnatomicalEntity,
            species: Vec::new(),
            relation_types: vec![RelationType::IsaPartOf],
            direct_only: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.query.entity_kind, EntityKind::AnatomicalEntity);
        assert_eq!(config.query.relation_types, vec![RelationType::IsaPartOf]);
        assert!(config.store.snapshot_path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            snapshot_path = "data/bgee.json"

            [query]
            entity_kind = "developmental_stage"
            species = ["9606", "10090"]
            relation_types = ["isa_partof", "develops_from"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.store.snapshot_path,
            Some(PathBuf::from("data/bgee.json"))
        );
        assert_eq!(config.query.entity_kind, EntityKind::DevelopmentalStage);
        assert_eq!(config.query.species, vec!["9606", "10090"]);
        assert_eq!(config.query.relation_types.len(), 2);
        // Missing sections fall back to defaults
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_relation_types() {
        let types = parse_relation_types("KEY", "isa_partof, transformation_of").unwrap();
        assert_eq!(
            types,
            vec![RelationType::IsaPartOf, RelationType::TransformationOf]
        );

        let err = parse_relation_types("KEY", "isa_partof,overlaps").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { value, .. } if value == "overlaps"));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::from_file("/nonexistent/ontoview.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }
}
