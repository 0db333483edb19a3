//! Ontoview Core - Domain models, errors and shared types
//!
//! This crate defines the core abstractions used throughout the ontology
//! view engine:
//! - Ontology elements (anatomical entities, developmental stages)
//! - Typed relations and their status (direct, indirect, reflexive)
//! - Taxon constraints restricting elements and relations to species
//! - Explicit "all or only" scopes replacing null-means-everything filters
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError, LoggingConfig, QueryConfig, StoreConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ontology operations
#[derive(Error, Debug)]
pub enum OntologyError {
    /// An ontology view could not be built from the provided data
    #[error("Invalid ontology view: {0}")]
    Construction(String),

    /// A traversal was requested for an element outside the candidate pool
    #[error("Unrecognized element: {0}")]
    UnknownElement(String),

    /// Species filtering was requested without a taxon constraint source
    #[error("No taxon constraint source for entity kind: {0}")]
    UnsupportedEntityKind(EntityKind),

    #[error("Unsupported relation type: {0}")]
    UnsupportedRelationType(String),

    #[error("Unsupported relation status: {0}")]
    UnsupportedRelationStatus(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for OntologyError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OntologyError>;

/// Species identifier as used by the data store
pub type SpeciesId = String;

// ============================================================================
// Scope
// ============================================================================

/// Either every value of a domain, or an explicit subset of it.
///
/// Used wherever a filter may be absent: `Scope::All` is the unrestricted
/// case, `Scope::Only` carries the values to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope<T: Eq + Hash> {
    All,
    Only(HashSet<T>),
}

impl<T: Eq + Hash> Default for Scope<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: Eq + Hash> Scope<T> {
    /// Build a restricted scope from any collection of values
    pub fn only(values: impl IntoIterator<Item = T>) -> Self {
        Self::Only(values.into_iter().collect())
    }

    /// Whether `value` is covered by this scope
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(values) => values.contains(value),
        }
    }

    /// Whether this scope shares at least one value with `other`
    pub fn intersects(&self, other: &HashSet<T>) -> bool {
        match self {
            Self::All => true,
            Self::Only(values) => !values.is_disjoint(other),
        }
    }

    /// The restricted values, or `None` for `Scope::All`
    pub fn as_only(&self) -> Option<&HashSet<T>> {
        match self {
            Self::All => None,
            Self::Only(values) => Some(values),
        }
    }

    /// The restricted values when they actually restrict something.
    ///
    /// An empty `Only` is treated like `All`.
    pub fn restriction(&self) -> Option<&HashSet<T>> {
        self.as_only().filter(|values| !values.is_empty())
    }

    /// Union of two scopes; `All` absorbs everything
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (Self::Only(mut left), Self::Only(right)) => {
                left.extend(right);
                Self::Only(left)
            }
            _ => Self::All,
        }
    }
}

impl<T: Eq + Hash> From<HashSet<T>> for Scope<T> {
    fn from(values: HashSet<T>) -> Self {
        Self::Only(values)
    }
}

// ============================================================================
// Ontology Elements
// ============================================================================

/// Kind of element an ontology view is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    AnatomicalEntity,
    DevelopmentalStage,
}

impl EntityKind {
    /// Whether relations between elements of this kind carry their own
    /// taxon constraints.
    ///
    /// Stage relations come from a nested set model and have no relation
    /// identifier: they exist in a species when both ends exist there.
    pub fn supports_relation_taxon_constraints(&self) -> bool {
        matches!(self, Self::AnatomicalEntity)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnatomicalEntity => write!(f, "anat_entity"),
            Self::DevelopmentalStage => write!(f, "dev_stage"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = OntologyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anat_entity" | "anatomical_entity" => Ok(Self::AnatomicalEntity),
            "dev_stage" | "developmental_stage" | "stage" => Ok(Self::DevelopmentalStage),
            _ => Err(OntologyError::Config(format!("unknown entity kind: {s}"))),
        }
    }
}

/// An ontology term: an anatomical entity or a developmental stage.
///
/// Identity is by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Ontology identifier (e.g., "UBERON:0000955")
    pub id: String,

    pub kind: EntityKind,

    /// Human-readable label
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            description: None,
        }
    }

    /// Create an anatomical entity
    pub fn anat_entity(id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::AnatomicalEntity)
    }

    /// Create a developmental stage
    pub fn dev_stage(id: impl Into<String>) -> Self {
        Self::new(id, EntityKind::DevelopmentalStage)
    }

    /// Set name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Relations
// ============================================================================

/// Relation types considered between ontology elements.
///
/// is_a and part_of are not distinguished and share one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "isa_partof")]
    IsaPartOf,
    #[serde(rename = "develops_from")]
    DevelopsFrom,
    #[serde(rename = "transformation_of")]
    TransformationOf,
}

impl RelationType {
    pub const ALL: [RelationType; 3] = [
        Self::IsaPartOf,
        Self::DevelopsFrom,
        Self::TransformationOf,
    ];

    /// Every relation type
    pub fn all() -> HashSet<RelationType> {
        Self::ALL.into_iter().collect()
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsaPartOf => "isa_partof",
            Self::DevelopsFrom => "develops_from",
            Self::TransformationOf => "transformation_of",
        }
    }

    /// Code used by the relation store for this type
    pub fn store_code(&self) -> &'static str {
        match self {
            Self::IsaPartOf => "ISA_PARTOF",
            Self::DevelopsFrom => "DEVELOPSFROM",
            Self::TransformationOf => "TRANSFORMATIONOF",
        }
    }

    /// Parse a relation store code.
    ///
    /// An unknown code means the store and this engine disagree on the set
    /// of relation types.
    pub fn from_store_code(code: &str) -> Result<Self> {
        match code {
            "ISA_PARTOF" => Ok(Self::IsaPartOf),
            "DEVELOPSFROM" => Ok(Self::DevelopsFrom),
            "TRANSFORMATIONOF" => Ok(Self::TransformationOf),
            other => Err(OntologyError::UnsupportedRelationType(other.to_string())),
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = OntologyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "isa_partof" | "is_a_part_of" | "isa_part_of" => Ok(Self::IsaPartOf),
            "develops_from" | "developsfrom" => Ok(Self::DevelopsFrom),
            "transformation_of" | "transformationof" => Ok(Self::TransformationOf),
            _ => Err(OntologyError::UnsupportedRelationType(s.to_string())),
        }
    }
}

/// Status of a relation in the pre-computed closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    /// A single edge of the source ontology
    Direct,
    /// Implied by transitivity, stored flattened
    Indirect,
    /// Relation of a term to itself
    Reflexive,
}

impl RelationStatus {
    /// Every status except `Reflexive`
    pub fn non_reflexive() -> HashSet<RelationStatus> {
        [Self::Direct, Self::Indirect].into_iter().collect()
    }

    pub fn store_code(&self) -> &'static str {
        match self {
            Self::Direct => "DIRECT",
            Self::Indirect => "INDIRECT",
            Self::Reflexive => "REFLEXIVE",
        }
    }

    pub fn from_store_code(code: &str) -> Result<Self> {
        match code {
            "DIRECT" => Ok(Self::Direct),
            "INDIRECT" => Ok(Self::Indirect),
            "REFLEXIVE" => Ok(Self::Reflexive),
            other => Err(OntologyError::UnsupportedRelationStatus(other.to_string())),
        }
    }
}

/// A directed, typed relation from `source_id` to `target_id`.
///
/// The target is the ancestor: `source is_a target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub status: RelationStatus,

    /// Store identifier, only present for anatomical entity relations
    #[serde(default)]
    pub relation_id: Option<String>,
}

impl RelationEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: RelationType,
        status: RelationStatus,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
            status,
            relation_id: None,
        }
    }

    /// Set the store relation identifier
    pub fn with_relation_id(mut self, relation_id: impl Into<String>) -> Self {
        self.relation_id = Some(relation_id.into());
        self
    }

    pub fn is_direct(&self) -> bool {
        self.status == RelationStatus::Direct
    }

    pub fn is_reflexive(&self) -> bool {
        self.status == RelationStatus::Reflexive
    }
}

// ============================================================================
// Taxon Constraints
// ============================================================================

/// Species in which an entity (or an anatomical relation) is valid.
///
/// For relation constraints, `entity_id` holds the relation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonConstraint {
    pub entity_id: String,
    pub allowed_species: Scope<SpeciesId>,
}

impl TaxonConstraint {
    pub fn new(
        entity_id: impl Into<String>,
        species: impl IntoIterator<Item = impl Into<SpeciesId>>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            allowed_species: Scope::only(species.into_iter().map(Into::into)),
        }
    }

    /// Constraint valid in every species
    pub fn all_species(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            allowed_species: Scope::All,
        }
    }

    /// Whether the constrained item exists in at least one of `species_ids`
    pub fn is_valid_in(&self, species_ids: &HashSet<SpeciesId>) -> bool {
        self.allowed_species.intersects(species_ids)
    }
}

/// Collect species identifiers into a set
pub fn species_set<I, S>(species: I) -> HashSet<SpeciesId>
where
    I: IntoIterator<Item = S>,
    S: Into<SpeciesId>,
{
    species.into_iter().map(Into::into).collect()
}

// ============================================================================
// Tests
// ============================================================================
