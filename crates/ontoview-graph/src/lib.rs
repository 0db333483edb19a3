//! Ontoview Graph - Ontology views and relation closure
//!
//! Builds read-only sub-graphs of an ontology from a relation store that
//! holds pre-computed transitive closures, and answers ancestor/descendant
//! queries over them, optionally restricted to species.

pub mod memory;
pub mod multi_species;
pub mod planner;
pub mod service;
pub mod store;
pub mod taxon;
pub mod view;

pub use memory::{InMemoryStore, RelationRecord, StoreSnapshot};
pub use multi_species::MultiSpeciesView;
pub use planner::{fetch_closure, ClosureRequest, RelationQuery, RelationSource};
pub use service::{OntologyRequest, OntologyService};
pub use store::{OntologyStore, SpeciesRelationSource};
pub use taxon::{TaxonConstraintIndex, TaxonConstraints};
pub use view::{Direction, OntologyView, RelativesQuery};
