//! In-memory ontology store
//!
//! Serves entities, relation closures and taxon constraints from a JSON
//! snapshot. Relations are kept as raw store records and decoded on fetch.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use ontoview_core::{
    Entity, EntityKind, OntologyError, RelationEdge, RelationStatus, RelationType, Result, Scope,
    SpeciesId, TaxonConstraint,
};
use serde::{Deserialize, Serialize};

use crate::planner::RelationQuery;
use crate::store::OntologyStore;
use crate::taxon::TaxonConstraintIndex;

// ============================================================================
// Snapshot Format
// ============================================================================

/// Relation row as stored, with wire codes for type and status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    /// Store identifier (anatomical entity relations only)
    #[serde(default)]
    pub id: Option<String>,
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    pub relation_status: String,
}

impl RelationRecord {
    /// Decode into a relation edge
    pub fn to_edge(&self) -> Result<RelationEdge> {
        Ok(RelationEdge {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            relation_type: RelationType::from_store_code(&self.relation_type)?,
            status: RelationStatus::from_store_code(&self.relation_status)?,
            relation_id: self.id.clone(),
        })
    }

    /// Encode a relation edge
    pub fn from_edge(edge: &RelationEdge) -> Self {
        Self {
            id: edge.relation_id.clone(),
            source_id: edge.source_id.clone(),
            target_id: edge.target_id.clone(),
            relation_type: edge.relation_type.store_code().to_string(),
            relation_status: edge.status.store_code().to_string(),
        }
    }
}

/// Full content of an in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub entities: Vec<Entity>,
    pub anat_entity_relations: Vec<RelationRecord>,
    pub dev_stage_relations: Vec<RelationRecord>,
    pub anat_entity_taxon_constraints: Vec<TaxonConstraint>,
    pub dev_stage_taxon_constraints: Vec<TaxonConstraint>,
    pub anat_entity_relation_taxon_constraints: Vec<TaxonConstraint>,
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add entities
    pub fn with_entities(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        self.entities.extend(entities);
        self
    }

    /// Add relations between elements of `kind`
    pub fn with_relations<'a>(
        mut self,
        kind: EntityKind,
        relations: impl IntoIterator<Item = &'a RelationEdge>,
    ) -> Self {
        let records = relations.into_iter().map(RelationRecord::from_edge);
        match kind {
            EntityKind::AnatomicalEntity => self.anat_entity_relations.extend(records),
            EntityKind::DevelopmentalStage => self.dev_stage_relations.extend(records),
        }
        self
    }

    /// Add taxon constraints of elements of `kind`
    pub fn with_entity_taxon_constraints(
        mut self,
        kind: EntityKind,
        constraints: impl IntoIterator<Item = TaxonConstraint>,
    ) -> Self {
        match kind {
            EntityKind::AnatomicalEntity => self.anat_entity_taxon_constraints.extend(constraints),
            EntityKind::DevelopmentalStage => self.dev_stage_taxon_constraints.extend(constraints),
        }
        self
    }

    /// Add taxon constraints of anatomical entity relations
    pub fn with_relation_taxon_constraints(
        mut self,
        constraints: impl IntoIterator<Item = TaxonConstraint>,
    ) -> Self {
        self.anat_entity_relation_taxon_constraints
            .extend(constraints);
        self
    }
}

// ============================================================================
// In-memory Store
// ============================================================================

/// Ontology store backed by a snapshot held in memory
pub struct InMemoryStore {
    snapshot: StoreSnapshot,
    anat_entity_index: TaxonConstraintIndex,
    dev_stage_index: TaxonConstraintIndex,
    anat_relation_index: TaxonConstraintIndex,
}

impl InMemoryStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        let anat_entity_index =
            TaxonConstraintIndex::from_constraints(snapshot.anat_entity_taxon_constraints.clone());
        let dev_stage_index =
            TaxonConstraintIndex::from_constraints(snapshot.dev_stage_taxon_constraints.clone());
        let anat_relation_index = TaxonConstraintIndex::from_constraints(
            snapshot.anat_entity_relation_taxon_constraints.clone(),
        );
        Self {
            snapshot,
            anat_entity_index,
            dev_stage_index,
            anat_relation_index,
        }
    }

    /// Load a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)
            .map_err(|e| OntologyError::Store(format!("Invalid store snapshot: {e}")))?;
        Ok(Self::new(snapshot))
    }

    /// Load a snapshot from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            OntologyError::Store(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    fn entity_index(&self, kind: EntityKind) -> &TaxonConstraintIndex {
        match kind {
            EntityKind::AnatomicalEntity => &self.anat_entity_index,
            EntityKind::DevelopmentalStage => &self.dev_stage_index,
        }
    }

    /// Whether a relation exists in at least one of `species_ids`.
    ///
    /// Anatomical relations carry their own constraints; stage relations
    /// exist wherever both of their ends exist.
    fn relation_in_species(
        &self,
        kind: EntityKind,
        relation: &RelationEdge,
        species_ids: &HashSet<SpeciesId>,
    ) -> bool {
        if species_ids.is_empty() {
            return true;
        }
        match kind {
            EntityKind::AnatomicalEntity => relation
                .relation_id
                .as_deref()
                .is_some_and(|id| self.anat_relation_index.is_allowed(id, species_ids)),
            EntityKind::DevelopmentalStage => {
                self.dev_stage_index
                    .is_allowed(&relation.source_id, species_ids)
                    && self
                        .dev_stage_index
                        .is_allowed(&relation.target_id, species_ids)
            }
        }
    }
}

fn constraints_in_species(
    constraints: &[TaxonConstraint],
    species_ids: &HashSet<SpeciesId>,
) -> Vec<TaxonConstraint> {
    constraints
        .iter()
        .filter(|c| species_ids.is_empty() || c.is_valid_in(species_ids))
        .cloned()
        .collect()
}

#[async_trait]
impl OntologyStore for InMemoryStore {
    async fn fetch_relations(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
        query: &RelationQuery,
    ) -> Result<HashSet<RelationEdge>> {
        let records = match kind {
            EntityKind::AnatomicalEntity => &self.snapshot.anat_entity_relations,
            EntityKind::DevelopmentalStage => &self.snapshot.dev_stage_relations,
        };

        let mut relations = HashSet::new();
        for record in records {
            let relation = record.to_edge()?;
            if query.matches(&relation) && self.relation_in_species(kind, &relation, species_ids) {
                relations.insert(relation);
            }
        }
        Ok(relations)
    }

    async fn fetch_entities(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
        ids: &Scope<String>,
    ) -> Result<Vec<Entity>> {
        let index = self.entity_index(kind);
        Ok(self
            .snapshot
            .entities
            .iter()
            .filter(|e| e.kind == kind && ids.contains(&e.id))
            .filter(|e| species_ids.is_empty() || index.is_allowed(&e.id, species_ids))
            .cloned()
            .collect())
    }

    async fn fetch_entity_taxon_constraints(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
    ) -> Result<Vec<TaxonConstraint>> {
        let constraints = match kind {
            EntityKind::AnatomicalEntity => &self.snapshot.anat_entity_taxon_constraints,
            EntityKind::DevelopmentalStage => &self.snapshot.dev_stage_taxon_constraints,
        };
        Ok(constraints_in_species(constraints, species_ids))
    }

    async fn fetch_relation_taxon_constraints(
        &self,
        species_ids: &HashSet<SpeciesId>,
    ) -> Result<Vec<TaxonConstraint>> {
        Ok(constraints_in_species(
            &self.snapshot.anat_entity_relation_taxon_constraints,
            species_ids,
        ))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
