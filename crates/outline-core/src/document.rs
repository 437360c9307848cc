//! In-memory document.
//!
//! Entities live in a petgraph `StableDiGraph`. The graph reuses freed
//! slots, so handles are not slot indexes: every entity gets an id from a
//! counter that never goes back, and a handle resolves only while that id
//! is mapped to a live slot.

use crate::error::{DocumentError, Result};
use crate::handle::{GraphId, ManagerId, NodeId};
use crate::model::{
    DocumentModel, GraphInfo, ManagerInfo, NodeInfo, NodeKind, PropertyFlags, PropertyInfo,
};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Relationship stored on an edge of the document graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Relation {
    /// Manager owns a top-level graph.
    Owns,
    /// Graph encloses a nested graph.
    SubGraph,
    /// Graph caches a structural node.
    Contains,
    /// Graph carries an annotation node.
    Annotates,
    /// Structural parent to sub-node.
    ParentOf,
    /// Manager designates its root node.
    RootNode,
    /// Manager marks a node as a fragment.
    Fragment,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    name: String,
    display_name: String,
    path: String,
    kind: NodeKind,
    type_name: Option<String>,
    properties: Vec<PropertySpec>,
}

/// A graph slot: the entity plus the id its handles carry.
#[derive(Debug, Clone)]
struct Slot {
    id: u32,
    entity: Entity,
}

#[derive(Debug, Clone)]
enum Entity {
    Manager { name: String, path: String },
    Graph { name: String, path: String },
    Node(NodeEntry),
}

impl Entity {
    fn path(&self) -> &str {
        match self {
            Self::Manager { path, .. } | Self::Graph { path, .. } => path,
            Self::Node(node) => &node.path,
        }
    }
}

/// A property declared on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub flags: PropertyFlags,
    /// The field lives on the node's runtime instance rather than the node
    /// itself. Such properties are reported through the node as an editor
    /// proxy.
    #[serde(default)]
    pub on_instance: bool,
}

impl PropertySpec {
    /// Creates an editable property with no value preview.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: None,
            flags: PropertyFlags::default(),
            on_instance: false,
        }
    }

    /// Sets the value preview.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the editing flags.
    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Marks the property as living on the runtime instance.
    pub fn on_instance(mut self) -> Self {
        self.on_instance = true;
        self
    }
}

/// Entity counts, for the `stats` command.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub managers: usize,
    pub graphs: usize,
    pub nodes: usize,
    pub annotations: usize,
    pub properties: usize,
}

/// A mutable, in-memory graph document.
#[derive(Debug, Default)]
pub struct Document {
    graph: StableDiGraph<Slot, Relation>,

    /// Maps stable paths to graph indexes.
    path_index: HashMap<String, NodeIndex>,

    /// Maps live handle ids to graph indexes.
    handles: HashMap<u32, NodeIndex>,
    next_id: u32,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Builders ───────────────────────────────────────────────────────

    /// Adds a manager. Its path is its name.
    pub fn add_manager(&mut self, name: impl Into<String>) -> Result<ManagerId> {
        let name = name.into();
        let path = name.clone();
        let index = self.insert(Entity::Manager { name, path })?;
        Ok(ManagerId::new(self.id_of(index)))
    }

    /// Adds a top-level graph owned by a manager.
    pub fn add_graph(&mut self, manager: ManagerId, name: impl Into<String>) -> Result<GraphId> {
        let owner = self
            .manager_index(manager)
            .ok_or_else(|| DocumentError::Expired(manager.to_string()))?;
        let index = self.insert_graph(owner, name.into())?;
        self.graph.add_edge(owner, index, Relation::Owns);
        Ok(GraphId::new(self.id_of(index)))
    }

    /// Adds a graph nested inside another graph.
    pub fn add_sub_graph(&mut self, parent: GraphId, name: impl Into<String>) -> Result<GraphId> {
        let owner = self
            .graph_index(parent)
            .ok_or_else(|| DocumentError::Expired(parent.to_string()))?;
        let index = self.insert_graph(owner, name.into())?;
        self.graph.add_edge(owner, index, Relation::SubGraph);
        Ok(GraphId::new(self.id_of(index)))
    }

    /// Adds a structural node to a graph.
    pub fn add_node(&mut self, graph: GraphId, name: impl Into<String>) -> Result<NodeId> {
        self.insert_node(graph, name.into(), NodeKind::Standard, Relation::Contains)
    }

    /// Adds an annotation node (a comment box) to a graph.
    pub fn add_annotation(&mut self, graph: GraphId, name: impl Into<String>) -> Result<NodeId> {
        self.insert_node(graph, name.into(), NodeKind::Annotation, Relation::Annotates)
    }

    /// Sets the structural parent of a node, replacing any previous one.
    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        let child_index = self.require_node(child)?;
        let parent_index = self.require_node(parent)?;
        self.drop_edges(child_index, Relation::ParentOf, Direction::Incoming);
        self.graph
            .add_edge(parent_index, child_index, Relation::ParentOf);
        Ok(())
    }

    /// Designates the manager's root node, replacing any previous one.
    pub fn set_root_node(&mut self, manager: ManagerId, node: NodeId) -> Result<()> {
        let owner = self
            .manager_index(manager)
            .ok_or_else(|| DocumentError::Expired(manager.to_string()))?;
        let target = self.require_node(node)?;
        self.drop_edges(owner, Relation::RootNode, Direction::Outgoing);
        self.graph.add_edge(owner, target, Relation::RootNode);
        Ok(())
    }

    /// Registers a node as a fragment of the manager.
    pub fn add_fragment(&mut self, manager: ManagerId, node: NodeId) -> Result<()> {
        let owner = self
            .manager_index(manager)
            .ok_or_else(|| DocumentError::Expired(manager.to_string()))?;
        let target = self.require_node(node)?;
        if !self.related(owner, Relation::Fragment).contains(&target) {
            self.graph.add_edge(owner, target, Relation::Fragment);
        }
        Ok(())
    }

    /// Declares a property on a node.
    pub fn add_property(&mut self, node: NodeId, property: PropertySpec) -> Result<()> {
        self.node_entry_mut(node)?.properties.push(property);
        Ok(())
    }

    /// Changes the flavour of a node.
    pub fn set_kind(&mut self, node: NodeId, kind: NodeKind) -> Result<()> {
        self.node_entry_mut(node)?.kind = kind;
        Ok(())
    }

    /// Sets the runtime type of a node.
    pub fn set_type_name(&mut self, node: NodeId, type_name: impl Into<String>) -> Result<()> {
        self.node_entry_mut(node)?.type_name = Some(type_name.into());
        Ok(())
    }

    /// Sets the title shown for a node.
    pub fn set_display_name(&mut self, node: NodeId, title: impl Into<String>) -> Result<()> {
        self.node_entry_mut(node)?.display_name = title.into();
        Ok(())
    }

    // ─── Removal ────────────────────────────────────────────────────────

    /// Removes a manager with every graph and node it owns.
    pub fn remove_manager(&mut self, manager: ManagerId) {
        let Some(index) = self.manager_index(manager) else {
            return;
        };
        for graph in self.related(index, Relation::Owns) {
            self.remove_graph_index(graph);
        }
        self.remove_index(index);
    }

    /// Removes a graph with its nested graphs and nodes.
    pub fn remove_graph(&mut self, graph: GraphId) {
        if let Some(index) = self.graph_index(graph) {
            self.remove_graph_index(index);
        }
    }

    /// Removes a single node. Its sub-nodes stay on the graph but lose
    /// their structural parent.
    pub fn remove_node(&mut self, node: NodeId) {
        if let Some(index) = self.node_index(node) {
            self.remove_index(index);
        }
    }

    // ─── Lookups ────────────────────────────────────────────────────────

    /// All managers, in creation order.
    pub fn managers(&self) -> Vec<ManagerId> {
        let mut ids: Vec<ManagerId> = self
            .graph
            .node_indices()
            .filter(|&index| self.is_manager(index))
            .map(|index| ManagerId::new(self.id_of(index)))
            .collect();
        ids.sort();
        ids
    }

    /// Finds a manager by path.
    pub fn manager_by_path(&self, path: &str) -> Option<ManagerId> {
        let index = *self.path_index.get(path)?;
        self.is_manager(index).then(|| ManagerId::new(self.id_of(index)))
    }

    /// Finds a graph by path.
    pub fn graph_by_path(&self, path: &str) -> Option<GraphId> {
        let index = *self.path_index.get(path)?;
        matches!(self.entity(index), Some(Entity::Graph { .. }))
            .then(|| GraphId::new(self.id_of(index)))
    }

    /// Finds a node (structural or annotation) by path.
    pub fn node_by_path(&self, path: &str) -> Option<NodeId> {
        let index = *self.path_index.get(path)?;
        matches!(self.entity(index), Some(Entity::Node(_)))
            .then(|| NodeId::new(self.id_of(index)))
    }

    /// Returns entity counts.
    pub fn stats(&self) -> DocumentStats {
        let mut stats = DocumentStats::default();
        for slot in self.graph.node_weights() {
            match &slot.entity {
                Entity::Manager { .. } => stats.managers += 1,
                Entity::Graph { .. } => stats.graphs += 1,
                Entity::Node(node) => {
                    if node.kind == NodeKind::Annotation {
                        stats.annotations += 1;
                    } else {
                        stats.nodes += 1;
                    }
                    stats.properties += node.properties.len();
                }
            }
        }
        stats
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn insert(&mut self, entity: Entity) -> Result<NodeIndex> {
        let path = entity.path().to_string();
        if self.path_index.contains_key(&path) {
            return Err(DocumentError::DuplicatePath(path));
        }
        let id = self.next_id;
        self.next_id += 1;
        let index = self.graph.add_node(Slot { id, entity });
        self.path_index.insert(path, index);
        self.handles.insert(id, index);
        Ok(index)
    }

    fn insert_graph(&mut self, owner: NodeIndex, name: String) -> Result<NodeIndex> {
        let path = format!("{}/{}", self.graph[owner].entity.path(), name);
        self.insert(Entity::Graph { name, path })
    }

    fn insert_node(
        &mut self,
        graph: GraphId,
        name: String,
        kind: NodeKind,
        relation: Relation,
    ) -> Result<NodeId> {
        let owner = self
            .graph_index(graph)
            .ok_or_else(|| DocumentError::Expired(graph.to_string()))?;
        let path = format!("{}/{}", self.graph[owner].entity.path(), name);
        let index = self.insert(Entity::Node(NodeEntry {
            display_name: name.clone(),
            name,
            path,
            kind,
            type_name: None,
            properties: Vec::new(),
        }))?;
        self.graph.add_edge(owner, index, relation);
        Ok(NodeId::new(self.id_of(index)))
    }

    fn remove_graph_index(&mut self, index: NodeIndex) {
        for sub in self.related(index, Relation::SubGraph) {
            self.remove_graph_index(sub);
        }
        for node in self
            .related(index, Relation::Contains)
            .into_iter()
            .chain(self.related(index, Relation::Annotates))
        {
            self.remove_index(node);
        }
        self.remove_index(index);
    }

    fn remove_index(&mut self, index: NodeIndex) {
        if let Some(slot) = self.graph.remove_node(index) {
            debug!("Removed {}", slot.entity.path());
            self.path_index.remove(slot.entity.path());
            self.handles.remove(&slot.id);
        }
    }

    fn drop_edges(&mut self, index: NodeIndex, relation: Relation, direction: Direction) {
        let stale: Vec<_> = self
            .graph
            .edges_directed(index, direction)
            .filter(|edge| *edge.weight() == relation)
            .map(|edge| edge.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
    }

    /// Outgoing neighbours over one relation, in creation order.
    fn related(&self, index: NodeIndex, relation: Relation) -> Vec<NodeIndex> {
        let mut targets: Vec<NodeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|edge| *edge.weight() == relation)
            .map(|edge| edge.target())
            .collect();
        targets.sort_by_key(|&target| self.graph[target].id);
        targets.dedup();
        targets
    }

    /// The single incoming neighbour over one relation.
    fn source(&self, index: NodeIndex, relation: Relation) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Direction::Incoming)
            .find(|edge| *edge.weight() == relation)
            .map(|edge| edge.source())
    }

    fn id_of(&self, index: NodeIndex) -> u32 {
        self.graph[index].id
    }

    fn entity(&self, index: NodeIndex) -> Option<&Entity> {
        self.graph.node_weight(index).map(|slot| &slot.entity)
    }

    /// Resolves a handle id to its live slot.
    fn resolve(&self, id: u32) -> Option<NodeIndex> {
        self.handles.get(&id).copied()
    }

    fn is_manager(&self, index: NodeIndex) -> bool {
        matches!(self.entity(index), Some(Entity::Manager { .. }))
    }

    fn manager_index(&self, id: ManagerId) -> Option<NodeIndex> {
        let index = self.resolve(id.index())?;
        self.is_manager(index).then_some(index)
    }

    fn graph_index(&self, id: GraphId) -> Option<NodeIndex> {
        let index = self.resolve(id.index())?;
        matches!(self.entity(index), Some(Entity::Graph { .. })).then_some(index)
    }

    fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        let index = self.resolve(id.index())?;
        matches!(self.entity(index), Some(Entity::Node(_))).then_some(index)
    }

    fn require_node(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_index(id)
            .ok_or_else(|| DocumentError::Expired(id.to_string()))
    }

    fn node_entry(&self, id: NodeId) -> Option<&NodeEntry> {
        match self.entity(self.resolve(id.index())?)? {
            Entity::Node(entry) => Some(entry),
            _ => None,
        }
    }

    fn node_entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry> {
        let slot = self
            .resolve(id.index())
            .and_then(|index| self.graph.node_weight_mut(index));
        match slot.map(|slot| &mut slot.entity) {
            Some(Entity::Node(entry)) => Ok(entry),
            _ => Err(DocumentError::Expired(id.to_string())),
        }
    }

    /// Walks up through enclosing graphs to the owning manager.
    fn owning_manager(&self, graph: NodeIndex) -> Option<NodeIndex> {
        let mut current = graph;
        loop {
            if let Some(manager) = self.source(current, Relation::Owns) {
                return Some(manager);
            }
            current = self.source(current, Relation::SubGraph)?;
        }
    }

    fn node_graph(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.source(index, Relation::Contains)
            .or_else(|| self.source(index, Relation::Annotates))
    }
}

impl DocumentModel for Document {
    fn manager(&self, id: ManagerId) -> Option<ManagerInfo> {
        let index = self.manager_index(id)?;
        let Entity::Manager { name, path } = &self.graph[index].entity else {
            return None;
        };
        Some(ManagerInfo {
            name: name.clone(),
            path: path.clone(),
            root_node: self
                .related(index, Relation::RootNode)
                .first()
                .map(|&node| NodeId::new(self.id_of(node))),
            fragments: self
                .related(index, Relation::Fragment)
                .into_iter()
                .map(|node| NodeId::new(self.id_of(node)))
                .collect(),
        })
    }

    fn owned_graphs(&self, manager: ManagerId) -> Vec<GraphId> {
        let Some(index) = self.manager_index(manager) else {
            return Vec::new();
        };

        // Pre-order: each graph comes before its nested graphs.
        let mut result = Vec::new();
        let mut stack: Vec<NodeIndex> = self.related(index, Relation::Owns);
        stack.reverse();
        while let Some(current) = stack.pop() {
            result.push(GraphId::new(self.id_of(current)));
            let mut nested = self.related(current, Relation::SubGraph);
            nested.reverse();
            stack.extend(nested);
        }
        result
    }

    fn graph(&self, id: GraphId) -> Option<GraphInfo> {
        let index = self.graph_index(id)?;
        let Entity::Graph { name, path } = &self.graph[index].entity else {
            return None;
        };
        let manager = self.owning_manager(index)?;
        Some(GraphInfo {
            name: name.clone(),
            path: path.clone(),
            manager: ManagerId::new(self.id_of(manager)),
            parent_graph: self
                .source(index, Relation::SubGraph)
                .map(|parent| GraphId::new(self.id_of(parent))),
        })
    }

    fn structural_nodes(&self, graph: GraphId) -> Vec<NodeId> {
        self.graph_index(graph)
            .map(|index| {
                self.related(index, Relation::Contains)
                    .into_iter()
                    .map(|node| NodeId::new(self.id_of(node)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn annotation_nodes(&self, graph: GraphId) -> Vec<NodeId> {
        self.graph_index(graph)
            .map(|index| {
                self.related(index, Relation::Annotates)
                    .into_iter()
                    .map(|node| NodeId::new(self.id_of(node)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn node(&self, id: NodeId) -> Option<NodeInfo> {
        let index = self.node_index(id)?;
        let entry = self.node_entry(id)?;
        let graph = self.node_graph(index)?;
        Some(NodeInfo {
            name: entry.name.clone(),
            display_name: entry.display_name.clone(),
            path: entry.path.clone(),
            kind: entry.kind,
            type_name: entry.type_name.clone(),
            graph: GraphId::new(self.id_of(graph)),
            manager: self
                .owning_manager(graph)
                .map(|manager| ManagerId::new(self.id_of(manager))),
            structural_parent: self
                .source(index, Relation::ParentOf)
                .map(|parent| NodeId::new(self.id_of(parent))),
        })
    }

    fn reflectable_properties(&self, node: NodeId) -> Vec<PropertyInfo> {
        let Some(entry) = self.node_entry(node) else {
            return Vec::new();
        };
        entry
            .properties
            .iter()
            .map(|property| {
                let (owner_path, editor_proxy) = if property.on_instance {
                    (format!("{}.Instance", entry.path), Some(node))
                } else {
                    (entry.path.clone(), None)
                };
                PropertyInfo {
                    name: property.name.clone(),
                    type_name: property.type_name.clone(),
                    value: property.value.clone(),
                    flags: property.flags,
                    owner_path,
                    editor_proxy,
                }
            })
            .collect()
    }
}

/// A document shared between an editing thread and background readers.
///
/// Every model query takes the read lock for the duration of that single
/// call, so edits may interleave with a running build. Handles removed in
/// between simply stop resolving.
#[derive(Debug, Default)]
pub struct SharedDocument {
    inner: RwLock<Document>,
}

impl SharedDocument {
    /// Wraps a document for shared access.
    pub fn new(document: Document) -> Self {
        Self {
            inner: RwLock::new(document),
        }
    }

    /// Read access to the document.
    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the document.
    pub fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentModel for SharedDocument {
    fn manager(&self, id: ManagerId) -> Option<ManagerInfo> {
        self.read().manager(id)
    }

    fn owned_graphs(&self, manager: ManagerId) -> Vec<GraphId> {
        self.read().owned_graphs(manager)
    }

    fn graph(&self, id: GraphId) -> Option<GraphInfo> {
        self.read().graph(id)
    }

    fn structural_nodes(&self, graph: GraphId) -> Vec<NodeId> {
        self.read().structural_nodes(graph)
    }

    fn annotation_nodes(&self, graph: GraphId) -> Vec<NodeId> {
        self.read().annotation_nodes(graph)
    }

    fn node(&self, id: NodeId) -> Option<NodeInfo> {
        self.read().node(id)
    }

    fn reflectable_properties(&self, node: NodeId) -> Vec<PropertyInfo> {
        self.read().reflectable_properties(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quest_document() -> (Document, ManagerId, GraphId, NodeId, NodeId) {
        let mut doc = Document::new();
        let manager = doc.add_manager("Quest").unwrap();
        let graph = doc.add_graph(manager, "Main").unwrap();
        let start = doc.add_node(graph, "Start").unwrap();
        let talk = doc.add_node(graph, "Talk").unwrap();
        doc.set_parent(talk, start).unwrap();
        (doc, manager, graph, start, talk)
    }

    #[test]
    fn test_paths_follow_ownership() {
        let (doc, manager, graph, start, _) = quest_document();

        assert_eq!(doc.manager(manager).unwrap().path, "Quest");
        assert_eq!(doc.graph(graph).unwrap().path, "Quest/Main");
        assert_eq!(doc.node(start).unwrap().path, "Quest/Main/Start");
        assert!(doc.node_by_path("Quest/Main/Talk").is_some());
    }

    #[test]
    fn test_node_info_resolves_parent_and_manager() {
        let (doc, manager, graph, start, talk) = quest_document();
        let info = doc.node(talk).unwrap();

        assert_eq!(info.structural_parent, Some(start));
        assert_eq!(info.graph, graph);
        assert_eq!(info.manager, Some(manager));
        assert_eq!(info.kind, NodeKind::Standard);
    }

    #[test]
    fn test_owned_graphs_pre_order() {
        let mut doc = Document::new();
        let manager = doc.add_manager("M").unwrap();
        let a = doc.add_graph(manager, "A").unwrap();
        let b = doc.add_graph(manager, "B").unwrap();
        let nested = doc.add_sub_graph(a, "Inner").unwrap();

        assert_eq!(doc.owned_graphs(manager), vec![a, nested, b]);

        let info = doc.graph(nested).unwrap();
        assert_eq!(info.parent_graph, Some(a));
        assert_eq!(info.manager, manager);
        assert_eq!(info.path, "M/A/Inner");
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut doc = Document::new();
        let manager = doc.add_manager("M").unwrap();
        doc.add_graph(manager, "G").unwrap();

        let err = doc.add_graph(manager, "G").unwrap_err();
        assert!(matches!(err, DocumentError::DuplicatePath(path) if path == "M/G"));
    }

    #[test]
    fn test_removal_expires_handles() {
        let (mut doc, manager, graph, start, talk) = quest_document();

        doc.remove_node(start);
        assert!(doc.node(start).is_none());
        assert_eq!(doc.node(talk).unwrap().structural_parent, None);

        doc.remove_manager(manager);
        assert!(doc.manager(manager).is_none());
        assert!(doc.graph(graph).is_none());
        assert!(doc.node(talk).is_none());
        assert!(doc.owned_graphs(manager).is_empty());
        assert!(doc.node_by_path("Quest/Main/Talk").is_none());
    }

    #[test]
    fn test_removed_handles_are_never_reused() {
        let (mut doc, manager, graph, start, _) = quest_document();

        doc.remove_node(start);
        let fresh = doc.add_node(graph, "Fresh").unwrap();
        assert_ne!(fresh, start);
        assert!(doc.node(start).is_none());
        assert!(doc.set_parent(fresh, start).is_err());
        assert_eq!(doc.node(fresh).unwrap().path, "Quest/Main/Fresh");

        doc.remove_manager(manager);
        let other = doc.add_manager("Other").unwrap();
        let side = doc.add_graph(other, "Side").unwrap();
        assert!(doc.manager(manager).is_none());
        assert!(doc.graph(graph).is_none());
        assert!(doc.owned_graphs(manager).is_empty());
        assert_eq!(doc.owned_graphs(other), vec![side]);
        assert_eq!(doc.managers(), vec![other]);
    }

    #[test]
    fn test_enumeration_follows_creation_after_slot_reuse() {
        let (mut doc, _, graph, start, talk) = quest_document();

        doc.remove_node(start);
        let late = doc.add_node(graph, "Late").unwrap();
        assert_eq!(doc.structural_nodes(graph), vec![talk, late]);
    }

    #[test]
    fn test_handles_do_not_cross_kinds() {
        let (doc, manager, _, start, _) = quest_document();

        assert!(doc.graph(GraphId::new(manager.index())).is_none());
        assert!(doc.manager(ManagerId::new(start.index())).is_none());
    }

    #[test]
    fn test_manager_roles() {
        let (mut doc, manager, _, start, talk) = quest_document();
        doc.set_root_node(manager, start).unwrap();
        doc.add_fragment(manager, talk).unwrap();
        doc.add_fragment(manager, talk).unwrap();

        let info = doc.manager(manager).unwrap();
        assert_eq!(info.root_node, Some(start));
        assert_eq!(info.fragments, vec![talk]);

        doc.set_root_node(manager, talk).unwrap();
        assert_eq!(doc.manager(manager).unwrap().root_node, Some(talk));
    }

    #[test]
    fn test_annotations_are_not_structural() {
        let (mut doc, _, graph, _, _) = quest_document();
        let note = doc.add_annotation(graph, "Note").unwrap();

        assert!(!doc.structural_nodes(graph).contains(&note));
        assert_eq!(doc.annotation_nodes(graph), vec![note]);
        assert_eq!(doc.node(note).unwrap().kind, NodeKind::Annotation);
        assert_eq!(doc.stats().annotations, 1);
        assert_eq!(doc.stats().nodes, 2);
    }

    #[test]
    fn test_instance_properties_report_editor_proxy() {
        let (mut doc, _, _, start, _) = quest_document();
        doc.add_property(start, PropertySpec::new("Speaker", "FName"))
            .unwrap();
        doc.add_property(start, PropertySpec::new("Delay", "float").on_instance())
            .unwrap();

        let props = doc.reflectable_properties(start);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].owner_path, "Quest/Main/Start");
        assert_eq!(props[0].editor_proxy, None);
        assert_eq!(props[1].owner_path, "Quest/Main/Start.Instance");
        assert_eq!(props[1].editor_proxy, Some(start));
    }

    #[test]
    fn test_shared_document_sees_edits() {
        let (doc, _, graph, _, _) = quest_document();
        let shared = SharedDocument::new(doc);

        let added = shared.write().add_node(graph, "Late").unwrap();
        assert_eq!(shared.structural_nodes(graph).last(), Some(&added));
    }
}
