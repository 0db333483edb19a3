//! Views spanning several species

use std::collections::HashSet;

use ontoview_core::{OntologyError, RelationEdge, Result, SpeciesId};
use tracing::debug;

use crate::view::OntologyView;

/// An ontology view built for a set of species.
///
/// Elements and relations are those valid in at least one of the species;
/// an empty species set means the view was built without restriction.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSpeciesView {
    species_ids: HashSet<SpeciesId>,
    view: OntologyView,
}

impl MultiSpeciesView {
    pub fn new(species_ids: HashSet<SpeciesId>, view: OntologyView) -> Self {
        Self { species_ids, view }
    }

    pub fn species_ids(&self) -> &HashSet<SpeciesId> {
        &self.species_ids
    }

    pub fn view(&self) -> &OntologyView {
        &self.view
    }

    pub fn into_view(self) -> OntologyView {
        self.view
    }

    /// Extract the part of this view valid in a single species.
    ///
    /// The species must be one the view was built for. Relations are kept
    /// when both ends survive and, for anatomical entities, when the
    /// relation itself is valid in the species.
    pub fn as_single_species_view(&self, species_id: &str) -> Result<OntologyView> {
        if !self.species_ids.is_empty() && !self.species_ids.contains(species_id) {
            return Err(OntologyError::Construction(format!(
                "species {species_id} is not covered by this view"
            )));
        }
        let species_ids: HashSet<SpeciesId> = HashSet::from([species_id.to_string()]);

        let elements = self.view.elements_for_species(&species_ids)?;
        let kept: HashSet<&str> = elements.iter().map(|e| e.id.as_str()).collect();

        let constraints = self.view.taxon_constraints();
        let allowed_relation_ids =
            constraints.allowed_relation_ids(self.view.entity_kind(), &species_ids);
        let relation_allowed = |r: &RelationEdge| match &allowed_relation_ids {
            Some(ids) => r.relation_id.as_ref().is_some_and(|id| ids.contains(id)),
            None => true,
        };

        let relations: Vec<RelationEdge> = self
            .view
            .relations()
            .iter()
            .filter(|r| {
                kept.contains(r.source_id.as_str()) && kept.contains(r.target_id.as_str())
            })
            .filter(|r| relation_allowed(*r))
            .cloned()
            .collect();

        debug!(
            species = species_id,
            elements = elements.len(),
            relations = relations.len(),
            "Extracting single species view"
        );

        let view = OntologyView::new(
            elements.into_iter().cloned(),
            relations,
            self.view.relation_types().iter().copied(),
        )?
        .with_taxon_constraints(constraints.clone());
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxon::{TaxonConstraintIndex, TaxonConstraints};
    use crate::view::RelativesQuery;
    use ontoview_core::{species_set, Entity, RelationStatus, RelationType, TaxonConstraint};

    fn multi_species_view() -> MultiSpeciesView {
        use RelationStatus::*;
        use RelationType::*;
        let entities = ["UBERON:0001", "UBERON:0002", "UBERON:0003"].map(Entity::anat_entity);
        let relations = [
            RelationEdge::new("UBERON:0002", "UBERON:0001", IsaPartOf, Direct)
                .with_relation_id("1"),
            RelationEdge::new("UBERON:0003", "UBERON:0002", IsaPartOf, Direct)
                .with_relation_id("2"),
            RelationEdge::new("UBERON:0003", "UBERON:0001", IsaPartOf, Indirect)
                .with_relation_id("3"),
        ];
        let entity_index = TaxonConstraintIndex::from_constraints([
            TaxonConstraint::all_species("UBERON:0001"),
            TaxonConstraint::new("UBERON:0002", ["sp1", "sp2"]),
            TaxonConstraint::new("UBERON:0003", ["sp1", "sp2"]),
        ]);
        let relation_index = TaxonConstraintIndex::from_constraints([
            TaxonConstraint::new("1", ["sp1", "sp2"]),
            TaxonConstraint::new("2", ["sp1"]),
            TaxonConstraint::new("3", ["sp1", "sp2"]),
        ]);
        let view = OntologyView::new(entities, relations, [IsaPartOf])
            .unwrap()
            .with_taxon_constraints(TaxonConstraints::new(entity_index, Some(relation_index)));
        MultiSpeciesView::new(species_set(["sp1", "sp2"]), view)
    }

    #[test]
    fn test_single_species_view() {
        let multi = multi_species_view();
        let sp2 = multi.as_single_species_view("sp2").unwrap();

        assert_eq!(sp2.len(), 3);
        assert_eq!(sp2.relations().len(), 2);

        let ancestors = sp2
            .ancestors(&Entity::anat_entity("UBERON:0003"), &RelativesQuery::new())
            .unwrap();
        let ids: HashSet<&str> = ancestors.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["UBERON:0001"]));

        let sp1 = multi.as_single_species_view("sp1").unwrap();
        assert_eq!(sp1.relations().len(), 3);
    }

    #[test]
    fn test_species_not_covered() {
        let multi = multi_species_view();
        let err = multi.as_single_species_view("sp3").unwrap_err();
        assert!(matches!(err, OntologyError::Construction(_)));
    }

    #[test]
    fn test_accessors() {
        let multi = multi_species_view();
        assert_eq!(multi.species_ids(), &species_set(["sp1", "sp2"]));
        assert_eq!(multi.view().len(), 3);
        assert_eq!(multi.clone().into_view(), *multi.view());
    }
}
