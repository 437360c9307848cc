//! JSON document snapshots.
//!
//! A snapshot describes a whole document in one file:
//!
//! ```json
//! {
//!   "managers": [{
//!     "name": "Quest",
//!     "graphs": [{
//!       "name": "Main",
//!       "nodes": [
//!         { "name": "Start", "root": true },
//!         { "name": "Talk", "parent": "Start", "type": "DialogueNode" }
//!       ],
//!       "annotations": [{ "name": "Note" }],
//!       "graphs": []
//!     }]
//!   }]
//! }
//! ```
//!
//! Node parents are referenced by name within the same graph.

use crate::document::{Document, PropertySpec};
use crate::error::{DocumentError, Result};
use crate::handle::{GraphId, ManagerId};
use crate::model::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Top-level snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub managers: Vec<ManagerSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub name: String,
    #[serde(default)]
    pub graphs: Vec<GraphSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub annotations: Vec<AnnotationSnapshot>,
    /// Nested graphs.
    #[serde(default)]
    pub graphs: Vec<GraphSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    /// Name of the structural parent on the same graph.
    #[serde(default)]
    pub parent: Option<String>,
    /// Marks the manager's root node.
    #[serde(default)]
    pub root: bool,
    /// Marks a manager fragment.
    #[serde(default)]
    pub fragment: bool,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl DocumentSnapshot {
    /// Parses a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Document {
    /// Builds a document from a snapshot.
    pub fn from_snapshot(snapshot: &DocumentSnapshot) -> Result<Self> {
        let mut doc = Document::new();
        for manager in &snapshot.managers {
            let id = doc.add_manager(&manager.name)?;
            for graph in &manager.graphs {
                let graph_id = doc.add_graph(id, &graph.name)?;
                doc.fill_graph(id, graph_id, graph)?;
            }
        }
        Ok(doc)
    }

    /// Loads a document from a JSON snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let doc = Self::from_snapshot(&DocumentSnapshot::from_json(&text)?)?;

        let stats = doc.stats();
        info!(
            "Loaded {} ({} managers, {} graphs, {} nodes)",
            path.display(),
            stats.managers,
            stats.graphs,
            stats.nodes
        );
        Ok(doc)
    }

    fn fill_graph(&mut self, manager: ManagerId, graph: GraphId, snapshot: &GraphSnapshot) -> Result<()> {
        // First pass: create every node so parents can be referenced in any order.
        let mut by_name = HashMap::new();
        for node in &snapshot.nodes {
            let id = self.add_node(graph, &node.name)?;
            if node.kind != NodeKind::Standard {
                self.set_kind(id, node.kind)?;
            }
            if let Some(title) = &node.title {
                self.set_display_name(id, title)?;
            }
            if let Some(type_name) = &node.type_name {
                self.set_type_name(id, type_name)?;
            }
            for property in &node.properties {
                self.add_property(id, property.clone())?;
            }
            if node.root {
                self.set_root_node(manager, id)?;
            }
            if node.fragment {
                self.add_fragment(manager, id)?;
            }
            by_name.insert(node.name.as_str(), id);
        }

        // Second pass: wire structural parents.
        for node in &snapshot.nodes {
            let Some(parent) = &node.parent else {
                continue;
            };
            let parent_id = by_name.get(parent.as_str()).copied().ok_or_else(|| {
                DocumentError::DanglingReference {
                    graph: snapshot.name.clone(),
                    name: parent.clone(),
                }
            })?;
            if let Some(&child_id) = by_name.get(node.name.as_str()) {
                self.set_parent(child_id, parent_id)?;
            }
        }

        for annotation in &snapshot.annotations {
            let id = self.add_annotation(graph, &annotation.name)?;
            if let Some(title) = &annotation.title {
                self.set_display_name(id, title)?;
            }
        }

        for nested in &snapshot.graphs {
            let nested_id = self.add_sub_graph(graph, &nested.name)?;
            self.fill_graph(manager, nested_id, nested)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentModel;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const QUEST: &str = r#"{
        "managers": [{
            "name": "Quest",
            "graphs": [{
                "name": "Main",
                "nodes": [
                    { "name": "Talk", "parent": "Start", "type": "DialogueNode" },
                    { "name": "Start", "root": true },
                    { "name": "Reward", "fragment": true, "kind": "composite",
                      "properties": [{ "name": "Gold", "type": "int32", "value": "50" }] }
                ],
                "annotations": [{ "name": "Note", "title": "Check pacing" }],
                "graphs": [{ "name": "Branch", "nodes": [{ "name": "Inner" }] }]
            }]
        }]
    }"#;

    #[test]
    fn test_from_snapshot_builds_structure() {
        let snapshot = DocumentSnapshot::from_json(QUEST).unwrap();
        let doc = Document::from_snapshot(&snapshot).unwrap();

        let manager = doc.manager_by_path("Quest").unwrap();
        let start = doc.node_by_path("Quest/Main/Start").unwrap();
        let talk = doc.node_by_path("Quest/Main/Talk").unwrap();
        let reward = doc.node_by_path("Quest/Main/Reward").unwrap();

        let info = doc.manager(manager).unwrap();
        assert_eq!(info.root_node, Some(start));
        assert_eq!(info.fragments, vec![reward]);

        let talk_info = doc.node(talk).unwrap();
        assert_eq!(talk_info.structural_parent, Some(start));
        assert_eq!(talk_info.type_name.as_deref(), Some("DialogueNode"));
        assert_eq!(doc.node(reward).unwrap().kind, NodeKind::Composite);

        let note = doc.node_by_path("Quest/Main/Note").unwrap();
        assert_eq!(doc.node(note).unwrap().display_name, "Check pacing");

        assert!(doc.node_by_path("Quest/Main/Branch/Inner").is_some());
        assert_eq!(doc.owned_graphs(manager).len(), 2);
    }

    #[test]
    fn test_unknown_parent_is_dangling() {
        let json = r#"{ "managers": [{ "name": "M", "graphs": [{
            "name": "G", "nodes": [{ "name": "A", "parent": "Missing" }]
        }]}]}"#;
        let snapshot = DocumentSnapshot::from_json(json).unwrap();

        let err = Document::from_snapshot(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::DanglingReference { ref graph, ref name } if graph == "G" && name == "Missing"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(QUEST.as_bytes()).unwrap();

        let doc = Document::load(file.path()).unwrap();
        let stats = doc.stats();
        assert_eq!(stats.managers, 1);
        assert_eq!(stats.graphs, 2);
        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.annotations, 1);
        assert_eq!(stats.properties, 1);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        assert!(matches!(
            Document::load(file.path()),
            Err(DocumentError::Json(_))
        ));
    }
}
