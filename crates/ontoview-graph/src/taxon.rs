//! Taxon constraint filtering
//!
//! Translates a set of species into the entity and relation identifiers
//! valid in at least one of them.

use std::collections::{HashMap, HashSet};

use ontoview_core::{EntityKind, OntologyError, Result, Scope, SpeciesId, TaxonConstraint};

/// Lookup from an entity (or relation) identifier to the species it is valid in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonConstraintIndex {
    by_id: HashMap<String, Scope<SpeciesId>>,
}

impl TaxonConstraintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index, merging constraints that share an identifier
    pub fn from_constraints(constraints: impl IntoIterator<Item = TaxonConstraint>) -> Self {
        let mut index = Self::new();
        for constraint in constraints {
            index.insert(constraint);
        }
        index
    }

    pub fn insert(&mut self, constraint: TaxonConstraint) {
        let merged = match self.by_id.remove(&constraint.entity_id) {
            Some(existing) => existing.union(constraint.allowed_species),
            None => constraint.allowed_species,
        };
        self.by_id.insert(constraint.entity_id, merged);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether `id` is valid in at least one of `species_ids`.
    ///
    /// Identifiers without any constraint are never valid.
    pub fn is_allowed(&self, id: &str, species_ids: &HashSet<SpeciesId>) -> bool {
        self.by_id
            .get(id)
            .is_some_and(|species| species.intersects(species_ids))
    }

    /// Identifiers valid in at least one of `species_ids`
    pub fn allowed_ids(&self, species_ids: &HashSet<SpeciesId>) -> HashSet<String> {
        self.by_id
            .iter()
            .filter(|(_, species)| species.intersects(species_ids))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Entity and relation constraint indices attached to an ontology view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonConstraints {
    entities: Option<TaxonConstraintIndex>,
    relations: Option<TaxonConstraintIndex>,
}

impl TaxonConstraints {
    /// No constraint source: species-scoped queries are rejected
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(entities: TaxonConstraintIndex, relations: Option<TaxonConstraintIndex>) -> Self {
        Self {
            entities: Some(entities),
            relations,
        }
    }

    /// Entity identifiers valid in `species_ids`
    pub fn allowed_entity_ids(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
    ) -> Result<HashSet<String>> {
        let index = self
            .entities
            .as_ref()
            .ok_or(OntologyError::UnsupportedEntityKind(kind))?;
        Ok(index.allowed_ids(species_ids))
    }

    /// Relation identifiers valid in `species_ids`.
    ///
    /// `None` means relations are not restricted by identifier: either the
    /// kind has no relation-level constraints or no index was provided.
    pub fn allowed_relation_ids(
        &self,
        kind: EntityKind,
        species_ids: &HashSet<SpeciesId>,
    ) -> Option<HashSet<String>> {
        if !kind.supports_relation_taxon_constraints() {
            return None;
        }
        self.relations
            .as_ref()
            .map(|index| index.allowed_ids(species_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoview_core::species_set;

    fn anat_index() -> TaxonConstraintIndex {
        // UBERON:0001 everywhere, UBERON:0002 in sp1/sp2, UBERON:0002p in sp2/sp3
        TaxonConstraintIndex::from_constraints([
            TaxonConstraint::all_species("UBERON:0001"),
            TaxonConstraint::new("UBERON:0002", ["sp1"]),
            TaxonConstraint::new("UBERON:0002", ["sp2"]),
            TaxonConstraint::new("UBERON:0002p", ["sp2", "sp3"]),
        ])
    }

    #[test]
    fn test_merge_constraints() {
        let index = anat_index();
        assert_eq!(index.len(), 3);
        assert!(index.is_allowed("UBERON:0002", &species_set(["sp1"])));
        assert!(index.is_allowed("UBERON:0002", &species_set(["sp2"])));
        assert!(!index.is_allowed("UBERON:0002", &species_set(["sp3"])));
    }

    #[test]
    fn test_all_species_constraint_absorbs() {
        let index = TaxonConstraintIndex::from_constraints([
            TaxonConstraint::new("stage1", ["sp1"]),
            TaxonConstraint::all_species("stage1"),
        ]);
        assert!(index.is_allowed("stage1", &species_set(["sp42"])));
    }

    #[test]
    fn test_allowed_ids() {
        let index = anat_index();
        let ids = index.allowed_ids(&species_set(["sp3"]));
        assert_eq!(
            ids,
            ["UBERON:0001", "UBERON:0002p"]
                .into_iter()
                .map(String::from)
                .collect()
        );
        assert!(!index.is_allowed("UBERON:9999", &species_set(["sp1"])));
    }

    #[test]
    fn test_missing_entity_index() {
        let constraints = TaxonConstraints::none();
        let err = constraints
            .allowed_entity_ids(EntityKind::DevelopmentalStage, &species_set(["sp1"]))
            .unwrap_err();
        assert!(matches!(
            err,
            OntologyError::UnsupportedEntityKind(EntityKind::DevelopmentalStage)
        ));
    }

    #[test]
    fn test_relation_ids_only_for_anat_entities() {
        let relations = TaxonConstraintIndex::from_constraints([
            TaxonConstraint::new("1", ["sp1"]),
            TaxonConstraint::new("2", ["sp2"]),
        ]);
        let constraints = TaxonConstraints::new(anat_index(), Some(relations));
        let sp1 = species_set(["sp1"]);

        let anat = constraints.allowed_relation_ids(EntityKind::AnatomicalEntity, &sp1);
        assert_eq!(anat, Some(["1".to_string()].into_iter().collect()));

        let stages = constraints.allowed_relation_ids(EntityKind::DevelopmentalStage, &sp1);
        assert!(stages.is_none());

        let unindexed = TaxonConstraints::new(anat_index(), None);
        assert!(unindexed
            .allowed_relation_ids(EntityKind::AnatomicalEntity, &sp1)
            .is_none());
    }
}
