//! Ontology store abstraction
//!
//! The data store holding entities, pre-computed relation closures and
//! taxon constraints. Retrieval is delegated to implementations; this crate
//! never retries a failed call.

use std::collections::HashSet;

use async_trait::async_trait;
use ontoview_core::{Entity, EntityKind, RelationEdge, Result, Scope, SpeciesId, TaxonConstraint};

use crate::planner::{RelationQuery, RelationSource};

/// Trait for ontology data stores.
///
/// An empty `species_ids` set means no species restriction.
#[async_trait]
pub trait OntologyStore: Send + Sync {
    /// Fetch relations between elements of `kind` valid in any of `species_ids`
    async fn fetch_relations(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
        query: &RelationQuery,
    ) -> Result<HashSet<RelationEdge>>;

    /// Fetch elements of `kind` valid in any of `species_ids`
    async fn fetch_entities(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
        ids: &Scope<String>,
    ) -> Result<Vec<Entity>>;

    /// Fetch the taxon constraints of elements of `kind`
    async fn fetch_entity_taxon_constraints(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
    ) -> Result<Vec<TaxonConstraint>>;

    /// Fetch the taxon constraints of anatomical entity relations
    async fn fetch_relation_taxon_constraints(
        &self,
        species_ids: &HashSet<SpeciesId>,
    ) -> Result<Vec<TaxonConstraint>>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

/// Relation source bound to one entity kind and species set
pub struct SpeciesRelationSource<'a, S: ?Sized> {
    store: &'a S,
    kind: EntityKind,
    species_ids: &'a HashSet<SpeciesId>,
}

impl<'a, S: OntologyStore + ?Sized> SpeciesRelationSource<'a, S> {
    pub fn new(store: &'a S, kind: EntityKind, species_ids: &'a HashSet<SpeciesId>) -> Self {
        Self {
            store,
            kind,
            species_ids,
        }
    }
}

#[async_trait]
impl<'a, S: OntologyStore + ?Sized> RelationSource for SpeciesRelationSource<'a, S> {
    async fn fetch_relations(&self, query: &RelationQuery) -> Result<HashSet<RelationEdge>> {
        self.store
            .fetch_relations(self.kind, self.species_ids, query)
            .await
    }
}
