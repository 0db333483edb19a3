//! Ontology view
//!
//! An immutable sub-graph of an ontology: a set of elements of a single
//! kind, the relations between them and the relation types considered.
//! All queries are pure reads, so a view can be shared between threads.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ontoview_core::{
    Entity, EntityKind, OntologyError, RelationEdge, RelationType, Result, Scope, SpeciesId,
};

use crate::taxon::TaxonConstraints;

// ============================================================================
// Queries
// ============================================================================

/// Direction of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow relations from source to target
    Ancestors,
    /// Follow relations from target to source
    Descendants,
}

/// Filters applied when retrieving the relatives of an element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativesQuery {
    /// Relation types to follow; `All` means the types of the view
    pub relation_types: Scope<RelationType>,

    /// Only follow direct relations
    pub direct_only: bool,

    /// Species the traversal is restricted to; `All` or an empty set means
    /// no restriction
    pub species: Scope<SpeciesId>,
}

impl RelativesQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the relation types followed
    pub fn with_relation_types(mut self, types: impl IntoIterator<Item = RelationType>) -> Self {
        self.relation_types = Scope::only(types);
        self
    }

    /// Only follow direct relations
    pub fn direct_only(mut self, direct_only: bool) -> Self {
        self.direct_only = direct_only;
        self
    }

    /// Restrict the traversal to elements and relations valid in `species`
    pub fn with_species(mut self, species: impl IntoIterator<Item = impl Into<SpeciesId>>) -> Self {
        self.species = Scope::only(species.into_iter().map(Into::into));
        self
    }
}

// ============================================================================
// Ontology View
// ============================================================================

/// Read-only graph over elements of one `EntityKind`
#[derive(Debug, Clone)]
pub struct OntologyView {
    kind: EntityKind,
    elements: HashMap<String, Entity>,
    relations: Vec<RelationEdge>,
    /// Relation positions keyed by source id
    by_source: HashMap<String, Vec<usize>>,
    /// Relation positions keyed by target id
    by_target: HashMap<String, Vec<usize>>,
    relation_types: HashSet<RelationType>,
    taxon_constraints: Arc<TaxonConstraints>,
}

impl OntologyView {
    /// Build a view.
    ///
    /// Fails if no element or no relation type is provided, or if elements
    /// are not all of the same kind. An empty relation set is valid.
    pub fn new(
        elements: impl IntoIterator<Item = Entity>,
        relations: impl IntoIterator<Item = RelationEdge>,
        relation_types: impl IntoIterator<Item = RelationType>,
    ) -> Result<Self> {
        let mut kind = None;
        let mut indexed: HashMap<String, Entity> = HashMap::new();
        for element in elements {
            let expected = *kind.get_or_insert(element.kind);
            if element.kind != expected {
                return Err(OntologyError::Construction(format!(
                    "element {} is a {}, expected {}",
                    element.id, element.kind, expected
                )));
            }
            indexed.insert(element.id.clone(), element);
        }
        let kind = kind.ok_or_else(|| {
            OntologyError::Construction("Some elements must be considered".to_string())
        })?;

        let relation_types: HashSet<RelationType> = relation_types.into_iter().collect();
        if relation_types.is_empty() {
            return Err(OntologyError::Construction(
                "Some relation types must be considered".to_string(),
            ));
        }

        let relations: Vec<RelationEdge> = relations
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut by_source: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_target: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, relation) in relations.iter().enumerate() {
            by_source
                .entry(relation.source_id.clone())
                .or_default()
                .push(pos);
            by_target
                .entry(relation.target_id.clone())
                .or_default()
                .push(pos);
        }

        Ok(Self {
            kind,
            elements: indexed,
            relations,
            by_source,
            by_target,
            relation_types,
            taxon_constraints: Arc::new(TaxonConstraints::none()),
        })
    }

    /// Attach the taxon constraints used by species-scoped queries
    pub fn with_taxon_constraints(mut self, constraints: TaxonConstraints) -> Self {
        self.taxon_constraints = Arc::new(constraints);
        self
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.kind
    }

    /// All elements of the view
    pub fn elements(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always `false`: a view holds at least one element
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Get an element by id
    pub fn element(&self, id: &str) -> Option<&Entity> {
        self.elements.get(id)
    }

    pub fn relations(&self) -> &[RelationEdge] {
        &self.relations
    }

    pub fn relation_types(&self) -> &HashSet<RelationType> {
        &self.relation_types
    }

    pub fn taxon_constraints(&self) -> &TaxonConstraints {
        &self.taxon_constraints
    }

    /// Elements valid in at least one of `species_ids`.
    ///
    /// An empty set means no species restriction, as in `relatives`.
    pub fn elements_for_species(
        &self,
        species_ids: &HashSet<SpeciesId>,
    ) -> Result<HashSet<&Entity>> {
        if species_ids.is_empty() {
            return Ok(self.elements.values().collect());
        }
        let allowed = self
            .taxon_constraints
            .allowed_entity_ids(self.kind, species_ids)?;
        Ok(self
            .elements
            .values()
            .filter(|e| allowed.contains(&e.id))
            .collect())
    }

    /// New view keeping only the elements valid in `species_ids`.
    ///
    /// Relations, relation types and taxon constraints are kept unchanged.
    pub fn restrict_to_species(&self, species_ids: &HashSet<SpeciesId>) -> Result<OntologyView> {
        let elements: Vec<Entity> = self
            .elements_for_species(species_ids)?
            .into_iter()
            .cloned()
            .collect();

        let mut view = OntologyView::new(
            elements,
            self.relations.iter().cloned(),
            self.relation_types.iter().copied(),
        )?;
        view.taxon_constraints = Arc::clone(&self.taxon_constraints);
        Ok(view)
    }

    /// Ancestors of `element`
    pub fn ancestors(&self, element: &Entity, query: &RelativesQuery) -> Result<HashSet<&Entity>> {
        self.relatives(element, Direction::Ancestors, query)
    }

    /// Descendants of `element`
    pub fn descendants(
        &self,
        element: &Entity,
        query: &RelativesQuery,
    ) -> Result<HashSet<&Entity>> {
        self.relatives(element, Direction::Descendants, query)
    }

    /// Elements related to `element` in `direction`.
    ///
    /// Relations are pre-computed closures, so one lookup returns every
    /// ancestor (or descendant) unless `direct_only` is set. Fails with
    /// `UnknownElement` when `element` is not part of the candidate pool;
    /// an element without relatives yields an empty set.
    pub fn relatives(
        &self,
        element: &Entity,
        direction: Direction,
        query: &RelativesQuery,
    ) -> Result<HashSet<&Entity>> {
        let species = query.species.restriction();

        let candidates = species
            .map(|species_ids| {
                self.taxon_constraints
                    .allowed_entity_ids(self.kind, species_ids)
            })
            .transpose()?;
        let in_pool = |id: &str| {
            self.elements.contains_key(id)
                && candidates.as_ref().map_or(true, |ids| ids.contains(id))
        };

        if !in_pool(element.id.as_str()) {
            return Err(OntologyError::UnknownElement(element.id.clone()));
        }

        let relation_types = match &query.relation_types {
            Scope::All => &self.relation_types,
            Scope::Only(types) => types,
        };

        let allowed_relation_ids = species.and_then(|species_ids| {
            self.taxon_constraints
                .allowed_relation_ids(self.kind, species_ids)
        });

        tracing::trace!(
            element = %element.id,
            ?direction,
            ?relation_types,
            direct_only = query.direct_only,
            species_scoped = species.is_some(),
            "resolving relatives"
        );

        let index = match direction {
            Direction::Ancestors => &self.by_source,
            Direction::Descendants => &self.by_target,
        };

        let relatives = index
            .get(&element.id)
            .into_iter()
            .flatten()
            .map(|&pos| &self.relations[pos])
            .filter(|r| relation_types.contains(&r.relation_type))
            .filter(|r| !r.is_reflexive())
            .filter(|r| !query.direct_only || r.is_direct())
            .filter(|r| match &allowed_relation_ids {
                Some(ids) => r.relation_id.as_ref().is_some_and(|id| ids.contains(id)),
                None => true,
            })
            .map(|r| match direction {
                Direction::Ancestors => r.target_id.as_str(),
                Direction::Descendants => r.source_id.as_str(),
            })
            .filter(|id| in_pool(*id))
            .filter_map(|id| self.elements.get(id))
            .collect();

        Ok(relatives)
    }
}

impl PartialEq for OntologyView {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.elements == other.elements
            && self.relation_types == other.relation_types
            && self.relations.iter().collect::<HashSet<_>>()
                == other.relations.iter().collect::<HashSet<_>>()
            && self.taxon_constraints == other.taxon_constraints
    }
}

// ============================================================================
// Tests
// ============================================================================
