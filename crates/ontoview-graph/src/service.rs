//! Ontology service
//!
//! Builds ontology views from an [`OntologyStore`]: plans the relation
//! fetches, loads the entities they reference and attaches the taxon
//! constraints of the requested species.

use std::collections::HashSet;
use std::sync::Arc;

use ontoview_core::{EntityKind, OntologyError, RelationType, Result, Scope, SpeciesId};
use tracing::{debug, info};

use crate::multi_species::MultiSpeciesView;
use crate::planner::{fetch_closure, ClosureRequest};
use crate::store::{OntologyStore, SpeciesRelationSource};
use crate::taxon::{TaxonConstraintIndex, TaxonConstraints};
use crate::view::OntologyView;

// ============================================================================
// Requests
// ============================================================================

/// Parameters of an ontology view build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyRequest {
    pub kind: EntityKind,

    /// Species the view is built for; empty means no restriction
    pub species_ids: HashSet<SpeciesId>,

    pub entity_ids: Scope<String>,

    /// Relation types considered; must not be empty
    pub relation_types: HashSet<RelationType>,

    pub want_ancestors: bool,
    pub want_descendants: bool,
}

impl OntologyRequest {
    /// Request every element of `kind`, following is_a/part_of relations
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            species_ids: HashSet::new(),
            entity_ids: Scope::All,
            relation_types: HashSet::from([RelationType::IsaPartOf]),
            want_ancestors: false,
            want_descendants: false,
        }
    }

    pub fn with_species(mut self, species: impl IntoIterator<Item = impl Into<SpeciesId>>) -> Self {
        self.species_ids = species.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_entity_ids(mut self, entity_ids: Scope<String>) -> Self {
        self.entity_ids = entity_ids;
        self
    }

    pub fn with_relation_types(mut self, types: impl IntoIterator<Item = RelationType>) -> Self {
        self.relation_types = types.into_iter().collect();
        self
    }

    pub fn with_ancestors(mut self, want_ancestors: bool) -> Self {
        self.want_ancestors = want_ancestors;
        self
    }

    pub fn with_descendants(mut self, want_descendants: bool) -> Self {
        self.want_descendants = want_descendants;
        self
    }
}

// ============================================================================
// Service
// ============================================================================

/// Builds ontology views over a shared store
#[derive(Clone)]
pub struct OntologyService {
    store: Arc<dyn OntologyStore>,
}

impl OntologyService {
    pub fn new(store: Arc<dyn OntologyStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn OntologyStore {
        self.store.as_ref()
    }

    /// Build the view described by `request`.
    ///
    /// Any store failure aborts the build and is returned unchanged.
    pub async fn build_ontology_view(&self, request: &OntologyRequest) -> Result<MultiSpeciesView> {
        if request.relation_types.is_empty() {
            return Err(OntologyError::Construction(
                "Some relation types must be considered".to_string(),
            ));
        }
        let kind = request.kind;
        let species_ids = &request.species_ids;

        info!(
            store = self.store.name(),
            %kind,
            species = species_ids.len(),
            ancestors = request.want_ancestors,
            descendants = request.want_descendants,
            "Building ontology view"
        );

        // 1. Relations covering the requested entities
        let closure = ClosureRequest::new(request.entity_ids.clone())
            .with_relation_types(Scope::Only(request.relation_types.clone()))
            .with_ancestors(request.want_ancestors)
            .with_descendants(request.want_descendants);
        let source = SpeciesRelationSource::new(self.store.as_ref(), kind, species_ids);
        let relations = fetch_closure(&source, &closure).await?;
        debug!(relations = relations.len(), "Relations retrieved");

        // 2. Entities: requested ones plus every relation end
        let entity_ids = match request.entity_ids.restriction() {
            None => Scope::All,
            Some(requested) => {
                let mut ids = requested.clone();
                for relation in &relations {
                    ids.insert(relation.source_id.clone());
                    ids.insert(relation.target_id.clone());
                }
                Scope::Only(ids)
            }
        };
        let entities = self
            .store
            .fetch_entities(kind, species_ids, &entity_ids)
            .await?;
        debug!(entities = entities.len(), "Entities retrieved");

        // 3. Taxon constraints
        let entity_constraints = self
            .store
            .fetch_entity_taxon_constraints(kind, species_ids)
            .await?;
        let relation_constraints = if kind.supports_relation_taxon_constraints() {
            let constraints = self
                .store
                .fetch_relation_taxon_constraints(species_ids)
                .await?;
            Some(TaxonConstraintIndex::from_constraints(constraints))
        } else {
            None
        };
        let constraints = TaxonConstraints::new(
            TaxonConstraintIndex::from_constraints(entity_constraints),
            relation_constraints,
        );

        // 4. View
        let view = OntologyView::new(entities, relations, request.relation_types.iter().copied())?
            .with_taxon_constraints(constraints);
        info!(
            elements = view.len(),
            relations = view.relations().len(),
            "Ontology view built"
        );

        Ok(MultiSpeciesView::new(species_ids.clone(), view))
    }

    /// Anatomical entity view for several species
    pub async fn anat_entity_ontology(
        &self,
        species_ids: HashSet<SpeciesId>,
        entity_ids: Scope<String>,
        relation_types: HashSet<RelationType>,
        want_ancestors: bool,
        want_descendants: bool,
    ) -> Result<MultiSpeciesView> {
        let request = OntologyRequest {
            kind: EntityKind::AnatomicalEntity,
            species_ids,
            entity_ids,
            relation_types,
            want_ancestors,
            want_descendants,
        };
        self.build_ontology_view(&request).await
    }

    /// Anatomical entity view for a single species
    pub async fn anat_entity_ontology_for_species(
        &self,
        species_id: &str,
        entity_ids: Scope<String>,
        relation_types: HashSet<RelationType>,
        want_ancestors: bool,
        want_descendants: bool,
    ) -> Result<OntologyView> {
        self.anat_entity_ontology(
            HashSet::from([species_id.to_string()]),
            entity_ids,
            relation_types,
            want_ancestors,
            want_descendants,
        )
        .await?
        .as_single_species_view(species_id)
    }

    /// Developmental stage view for several species.
    ///
    /// Stages are only related by is_a/part_of.
    pub async fn dev_stage_ontology(
        &self,
        species_ids: HashSet<SpeciesId>,
        entity_ids: Scope<String>,
        want_ancestors: bool,
        want_descendants: bool,
    ) -> Result<MultiSpeciesView> {
        let request = OntologyRequest {
            kind: EntityKind::DevelopmentalStage,
            species_ids,
            entity_ids,
            relation_types: HashSet::from([RelationType::IsaPartOf]),
            want_ancestors,
            want_descendants,
        };
        self.build_ontology_view(&request).await
    }

    /// Developmental stage view for a single species
    pub async fn dev_stage_ontology_for_species(
        &self,
        species_id: &str,
        entity_ids: Scope<String>,
        want_ancestors: bool,
        want_descendants: bool,
    ) -> Result<OntologyView> {
        self.dev_stage_ontology(
            HashSet::from([species_id.to_string()]),
            entity_ids,
            want_ancestors,
            want_descendants,
        )
        .await?
        .as_single_species_view(species_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
