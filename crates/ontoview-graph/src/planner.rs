//! Closure request planning
//!
//! Decides which relations to fetch from the relation store so that a view
//! built from them can answer ancestor/descendant queries for the requested
//! entities, without loading the whole relation table.
//!
//! The store is expected to hold the transitive closure of every relation
//! type, flattened: each ancestor of a term is one row away from it, as a
//! `Direct` or `Indirect` relation. Under that assumption a first fetch
//! returns every relative of the requested entities, and exactly one more
//! fetch returns the relations among the newly discovered terms. A store
//! returning only direct edges would make this under-fetch beyond two hops.

use std::collections::HashSet;

use async_trait::async_trait;
use ontoview_core::{RelationEdge, RelationStatus, RelationType, Result, Scope};
use tracing::debug;

// ============================================================================
// Relation Queries
// ============================================================================

/// One relation fetch issued to the relation store.
///
/// When `source_or_target` is `false`, a relation must satisfy both endpoint
/// filters and a `None` filter accepts any id. When it is `true`, a relation
/// must satisfy at least one of them and a `None` filter accepts nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationQuery {
    pub source_ids: Option<HashSet<String>>,
    pub target_ids: Option<HashSet<String>>,
    pub source_or_target: bool,
    pub relation_types: Scope<RelationType>,
    pub statuses: HashSet<RelationStatus>,
}

impl RelationQuery {
    /// Query every relation of the given types and statuses
    pub fn all(relation_types: Scope<RelationType>, statuses: HashSet<RelationStatus>) -> Self {
        Self {
            source_ids: None,
            target_ids: None,
            source_or_target: false,
            relation_types,
            statuses,
        }
    }

    /// Whether `relation` is selected by this query
    pub fn matches(&self, relation: &RelationEdge) -> bool {
        if !self.relation_types.contains(&relation.relation_type)
            || !self.statuses.contains(&relation.status)
        {
            return false;
        }

        let source = self
            .source_ids
            .as_ref()
            .map(|ids| ids.contains(&relation.source_id));
        let target = self
            .target_ids
            .as_ref()
            .map(|ids| ids.contains(&relation.target_id));

        if self.source_or_target {
            source.unwrap_or(false) || target.unwrap_or(false)
        } else {
            source.unwrap_or(true) && target.unwrap_or(true)
        }
    }
}

/// Anything able to answer relation queries
#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Fetch the relations matching `query`
    async fn fetch_relations(&self, query: &RelationQuery) -> Result<HashSet<RelationEdge>>;
}

// ============================================================================
// Closure Planner
// ============================================================================

/// Entities and relation types a view must cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureRequest {
    /// Requested entities; `All` (or an empty set) selects every relation
    pub entity_ids: Scope<String>,

    pub relation_types: Scope<RelationType>,

    /// Also retrieve relations to the ancestors of the requested entities
    pub want_ancestors: bool,

    /// Also retrieve relations to the descendants of the requested entities
    pub want_descendants: bool,
}

impl ClosureRequest {
    pub fn new(entity_ids: Scope<String>) -> Self {
        Self {
            entity_ids,
            relation_types: Scope::All,
            want_ancestors: false,
            want_descendants: false,
        }
    }

    pub fn with_relation_types(mut self, relation_types: Scope<RelationType>) -> Self {
        self.relation_types = relation_types;
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

/// Fetch the relations needed to cover `request`.
///
/// Issues at most two fetches. Store errors are returned unchanged.
pub async fn fetch_closure<S>(source: &S, request: &ClosureRequest) -> Result<HashSet<RelationEdge>>
where
    S: RelationSource + ?Sized,
{
    // Reflexive relations are never traversed; indirect ones are required
    // as soon as ancestors or descendants are requested.
    let statuses = RelationStatus::non_reflexive();

    let Some(entity_ids) = request.entity_ids.restriction() else {
        debug!("No entity restriction, fetching all relations");
        let query = RelationQuery::all(request.relation_types.clone(), statuses);
        return source.fetch_relations(&query).await;
    };

    let expand = request.want_ancestors || request.want_descendants;

    // Without expansion, both ends must be requested entities. Otherwise a
    // requested entity must be the source (to get its ancestors) or the
    // target (to get its descendants).
    let query = RelationQuery {
        source_ids: (request.want_ancestors || !expand).then(|| entity_ids.clone()),
        target_ids: (request.want_descendants || !expand).then(|| entity_ids.clone()),
        source_or_target: expand,
        relation_types: request.relation_types.clone(),
        statuses: statuses.clone(),
    };
    debug!(
        source_ids = ?query.source_ids,
        target_ids = ?query.target_ids,
        source_or_target = query.source_or_target,
        "Fetching relations of requested entities"
    );

    let mut relations = source.fetch_relations(&query).await?;
    if !expand {
        return Ok(relations);
    }

    let sources = || relations.iter().map(|r| r.source_id.clone());
    let targets = || relations.iter().map(|r| r.target_id.clone());

    let mut new_source_ids: HashSet<String> = HashSet::new();
    let mut new_target_ids: HashSet<String> = HashSet::new();
    if request.want_ancestors {
        // ancestors become sources of the next fetch
        new_source_ids.extend(targets());
    }
    if request.want_descendants {
        // descendants become targets of the next fetch
        new_target_ids.extend(sources());
    }
    if request.want_ancestors && request.want_descendants {
        // a new ancestor can be related to a new descendant
        new_target_ids.extend(targets());
        new_source_ids.extend(sources());
    }
    new_source_ids.retain(|id| !entity_ids.contains(id));
    new_target_ids.retain(|id| !entity_ids.contains(id));

    if new_source_ids.is_empty() && new_target_ids.is_empty() {
        debug!(
            relations = relations.len(),
            "No new entity discovered, closure complete"
        );
        return Ok(relations);
    }

    debug!(
        new_source_ids = new_source_ids.len(),
        new_target_ids = new_target_ids.len(),
        "Fetching relations of discovered entities"
    );
    let expansion = RelationQuery {
        source_ids: (!new_source_ids.is_empty()).then_some(new_source_ids),
        target_ids: (!new_target_ids.is_empty()).then_some(new_target_ids),
        source_or_target: true,
        relation_types: request.relation_types.clone(),
        statuses,
    };
    relations.extend(source.fetch_relations(&expansion).await?);

    debug!(relations = relations.len(), "Closure complete");
    Ok(relations)
}

// ============================================================================
// Tests
// ============================================================================
