//! Reference collection.
//!
//! Walks the document from the requested roots and gathers the flat,
//! de-duplicated sets of entities that become tree items. The walk is
//! cancellable: the abandon predicate is checked before every root and
//! every graph.

use outline_core::{DocumentModel, GraphId, ManagerId, NodeId, RootHandle};
use std::collections::HashSet;
use tracing::debug;

/// Entities gathered for one build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedReferences {
    /// Valid roots, in request order.
    pub roots: Vec<ManagerId>,
    /// Owned graphs, parents before nested graphs.
    pub graphs: Vec<GraphId>,
    /// Structural nodes followed by each graph's annotation nodes.
    pub nodes: Vec<NodeId>,
    /// False when the walk stopped early. Incomplete references must be
    /// discarded.
    pub complete: bool,
}

/// Collects references reachable from `roots`.
///
/// Expired roots are skipped. When `abandon` returns true the walk stops
/// and returns what it has so far with `complete == false`.
pub fn collect_references<M, F>(model: &M, roots: &[RootHandle], abandon: F) -> CollectedReferences
where
    M: DocumentModel + ?Sized,
    F: Fn() -> bool,
{
    let mut refs = CollectedReferences::default();
    let mut seen_roots = HashSet::new();
    let mut seen_graphs = HashSet::new();
    let mut seen_nodes = HashSet::new();

    for &root in roots {
        if abandon() {
            debug!("Collection abandoned at {}", root);
            return refs;
        }
        if model.manager(root).is_none() {
            debug!("Skipping expired root {}", root);
            continue;
        }
        if !seen_roots.insert(root) {
            continue;
        }
        refs.roots.push(root);

        for graph in model.owned_graphs(root) {
            if abandon() {
                debug!("Collection abandoned at {}", graph);
                return refs;
            }
            if !seen_graphs.insert(graph) {
                continue;
            }
            refs.graphs.push(graph);

            for node in model
                .structural_nodes(graph)
                .into_iter()
                .chain(model.annotation_nodes(graph))
            {
                if seen_nodes.insert(node) {
                    refs.nodes.push(node);
                }
            }
        }
    }

    refs.complete = true;
    refs
}
