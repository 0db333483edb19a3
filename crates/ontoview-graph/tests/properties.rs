//! Law checks over randomly generated ontologies

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use ontoview_core::{
    species_set, Entity, EntityKind, RelationEdge, RelationStatus, RelationType, Scope,
    TaxonConstraint,
};
use ontoview_graph::{
    InMemoryStore, OntologyRequest, OntologyService, OntologyView, RelativesQuery, StoreSnapshot,
    TaxonConstraintIndex, TaxonConstraints,
};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};
use proptest::prelude::*;

const SPECIES: [&str; 3] = ["sp1", "sp2", "sp3"];

/// Small ontology: `edges` are direct `(child, parent)` pairs with
/// `child < parent`, so the graph is acyclic.
#[derive(Debug, Clone)]
struct Ontology {
    size: usize,
    edges: Vec<(usize, usize)>,
    species: Vec<Vec<&'static str>>,
}

fn node(i: usize) -> String {
    format!("TERM:{i:04}")
}

impl Ontology {
    fn entities(&self) -> Vec<Entity> {
        (0..self.size).map(|i| Entity::anat_entity(node(i))).collect()
    }

    /// Every (child, ancestor) pair, flattened the way the store holds them
    fn flattened_relations(&self) -> Vec<RelationEdge> {
        let mut reach: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.size];
        for child in (0..self.size).rev() {
            for &(c, parent) in &self.edges {
                if c == child {
                    let above = reach[parent].clone();
                    reach[child].insert(parent);
                    reach[child].extend(above);
                }
            }
        }

        let direct: HashSet<(usize, usize)> = self.edges.iter().copied().collect();
        let mut relations = Vec::new();
        for (child, ancestors) in reach.iter().enumerate() {
            for &ancestor in ancestors {
                let status = if direct.contains(&(child, ancestor)) {
                    RelationStatus::Direct
                } else {
                    RelationStatus::Indirect
                };
                let relation =
                    RelationEdge::new(node(child), node(ancestor), RelationType::IsaPartOf, status);
                relations.push(relation.with_relation_id(format!("{child}-{ancestor}")));
            }
        }
        relations
    }

    fn entity_constraints(&self) -> Vec<TaxonConstraint> {
        (0..self.size)
            .map(|i| TaxonConstraint::new(node(i), self.species[i].iter().copied()))
            .collect()
    }

    fn view(&self) -> OntologyView {
        let constraints = TaxonConstraints::new(
            TaxonConstraintIndex::from_constraints(self.entity_constraints()),
            None,
        );
        OntologyView::new(
            self.entities(),
            self.flattened_relations(),
            [RelationType::IsaPartOf],
        )
        .expect("generated ontologies are never empty")
        .with_taxon_constraints(constraints)
    }

    fn graph(&self) -> DiGraphMap<usize, ()> {
        let mut graph = DiGraphMap::new();
        for i in 0..self.size {
            graph.add_node(i);
        }
        for &(child, parent) in &self.edges {
            graph.add_edge(child, parent, ());
        }
        graph
    }

    /// Ancestors by breadth-first search over direct edges only
    fn reference_ancestors(&self, start: usize) -> HashSet<String> {
        let graph = self.graph();
        let mut bfs = Bfs::new(&graph, start);
        let mut found = HashSet::new();
        while let Some(nx) = bfs.next(&graph) {
            if nx != start {
                found.insert(node(nx));
            }
        }
        found
    }

    fn reference_descendants(&self, start: usize) -> HashSet<String> {
        let graph = self.graph();
        let reversed = Reversed(&graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut found = HashSet::new();
        while let Some(nx) = bfs.next(reversed) {
            if nx != start {
                found.insert(node(nx));
            }
        }
        found
    }
}

fn ontology_strategy() -> impl Strategy<Value = Ontology> {
    (5usize..=8)
        .prop_flat_map(|size| {
            let pairs = proptest::collection::vec((0..size, 0..size), 0..size * 2);
            let species = proptest::collection::vec(
                proptest::sample::subsequence(SPECIES.to_vec(), 0..=SPECIES.len()),
                size,
            );
            (Just(size), pairs, species)
        })
        .prop_map(|(size, pairs, species)| {
            let edges: BTreeSet<(usize, usize)> =
                pairs.into_iter().filter(|(child, parent)| child < parent).collect();
            Ontology {
                size,
                edges: edges.into_iter().collect(),
                species,
            }
        })
}

fn ids<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> HashSet<String> {
    entities.into_iter().map(|e| e.id.clone()).collect()
}

proptest! {
    #[test]
    fn closure_matches_reference_search(ontology in ontology_strategy()) {
        let view = ontology.view();
        for i in 0..ontology.size {
            let entity = Entity::anat_entity(node(i));
            let ancestors = view.ancestors(&entity, &RelativesQuery::new()).unwrap();
            prop_assert_eq!(ids(ancestors), ontology.reference_ancestors(i));

            let descendants = view.descendants(&entity, &RelativesQuery::new()).unwrap();
            prop_assert_eq!(ids(descendants), ontology.reference_descendants(i));
        }
    }

    #[test]
    fn direct_relatives_are_a_subset(ontology in ontology_strategy()) {
        let view = ontology.view();
        let direct = RelativesQuery::new().direct_only(true);
        for entity in ontology.entities() {
            let all = ids(view.ancestors(&entity, &RelativesQuery::new()).unwrap());
            let direct_only = ids(view.ancestors(&entity, &direct).unwrap());
            prop_assert!(direct_only.is_subset(&all));
        }
    }

    #[test]
    fn ancestors_and_descendants_are_symmetric(ontology in ontology_strategy()) {
        let view = ontology.view();
        let query = RelativesQuery::new();
        for relation in view.relations() {
            let child = Entity::anat_entity(relation.source_id.clone());
            let parent = Entity::anat_entity(relation.target_id.clone());

            let ancestors = ids(view.ancestors(&child, &query).unwrap());
            let descendants = ids(view.descendants(&parent, &query).unwrap());
            prop_assert!(ancestors.contains(&parent.id));
            prop_assert!(descendants.contains(&child.id));
        }
    }

    #[test]
    fn species_filter_is_idempotent(
        ontology in ontology_strategy(),
        requested in proptest::sample::subsequence(SPECIES.to_vec(), 1..=SPECIES.len()),
    ) {
        let view = ontology.view();
        let species = species_set(requested);

        let once = ids(view.elements_for_species(&species).unwrap());
        if let Ok(restricted) = view.restrict_to_species(&species) {
            let twice = ids(restricted.elements_for_species(&species).unwrap());
            prop_assert_eq!(&once, &twice);
        } else {
            // nothing survives the first filter
            prop_assert!(once.is_empty());
        }

        let constrained: HashSet<String> = (0..ontology.size)
            .filter(|&i| !ontology.species[i].is_empty())
            .map(node)
            .collect();
        let everywhere = ids(view.elements_for_species(&species_set(SPECIES)).unwrap());
        prop_assert_eq!(everywhere, constrained);
    }

    #[test]
    fn planned_closure_answers_ancestor_queries(
        ontology in ontology_strategy(),
        start in 0usize..5,
    ) {
        let snapshot = StoreSnapshot::new()
            .with_entities(ontology.entities())
            .with_relations(EntityKind::AnatomicalEntity, &ontology.flattened_relations())
            .with_entity_taxon_constraints(
                EntityKind::AnatomicalEntity,
                ontology.entities().into_iter().map(|e| TaxonConstraint::all_species(e.id)),
            )
            .with_relation_taxon_constraints(
                ontology
                    .flattened_relations()
                    .into_iter()
                    .filter_map(|r| r.relation_id)
                    .map(TaxonConstraint::all_species),
            );
        let service = OntologyService::new(Arc::new(InMemoryStore::new(snapshot)));
        let entity = Entity::anat_entity(node(start));

        let request = OntologyRequest::new(EntityKind::AnatomicalEntity)
            .with_entity_ids(Scope::only([entity.id.clone()]))
            .with_ancestors(true);
        let multi = tokio_test::block_on(service.build_ontology_view(&request)).unwrap();
        let ancestors = multi.view().ancestors(&entity, &RelativesQuery::new()).unwrap();
        prop_assert_eq!(ids(ancestors), ontology.reference_ancestors(start));

        let request = OntologyRequest::new(EntityKind::AnatomicalEntity)
            .with_entity_ids(Scope::only([entity.id.clone()]))
            .with_descendants(true);
        let multi = tokio_test::block_on(service.build_ontology_view(&request)).unwrap();
        let descendants = multi.view().descendants(&entity, &RelativesQuery::new()).unwrap();
        prop_assert_eq!(ids(descendants), ontology.reference_descendants(start));
    }
}
