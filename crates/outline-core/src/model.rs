//! The document model interface.
//!
//! The outline engine never owns document entities. It reads them through
//! this trait, one snapshot struct at a time, and tolerates any lookup
//! returning `None` because the entity was removed in the meantime.

use crate::handle::{GraphId, ManagerId, NodeId};
use serde::{Deserialize, Serialize};

/// Read access to a graph-structured document.
///
/// Implementations must be safe to query from a background thread while
/// the owning thread keeps editing the document.
pub trait DocumentModel: Send + Sync {
    /// Looks up a manager. `None` when the handle has expired.
    fn manager(&self, id: ManagerId) -> Option<ManagerInfo>;

    /// Every graph owned by the manager, nested graphs included,
    /// parents before their sub-graphs.
    fn owned_graphs(&self, manager: ManagerId) -> Vec<GraphId>;

    /// Looks up a graph. `None` when the handle has expired.
    fn graph(&self, id: GraphId) -> Option<GraphInfo>;

    /// The structural nodes cached on a graph. No duplicates.
    fn structural_nodes(&self, graph: GraphId) -> Vec<NodeId>;

    /// Annotation-only nodes (comments and the like) placed on a graph.
    /// They are not part of the node ownership tree.
    fn annotation_nodes(&self, graph: GraphId) -> Vec<NodeId>;

    /// Looks up a node. `None` when the handle has expired.
    fn node(&self, id: NodeId) -> Option<NodeInfo>;

    /// Reflected properties exposed by a node, flags included. Callers
    /// decide which of them are listable.
    fn reflectable_properties(&self, node: NodeId) -> Vec<PropertyInfo>;
}

/// Snapshot of a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerInfo {
    pub name: String,
    /// Stable path, used as the manager's attach key.
    pub path: String,
    /// The designated root node, if the manager has one.
    pub root_node: Option<NodeId>,
    /// Nodes attached to the manager in a role-marking capacity.
    pub fragments: Vec<NodeId>,
}

impl ManagerInfo {
    /// Returns true if the node is the manager's designated root node.
    pub fn is_root_node(&self, node: NodeId) -> bool {
        self.root_node == Some(node)
    }

    /// Returns true if the node is registered as a manager fragment.
    pub fn is_fragment(&self, node: NodeId) -> bool {
        self.fragments.contains(&node)
    }
}

/// Snapshot of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub name: String,
    pub path: String,
    /// The manager that owns this graph.
    pub manager: ManagerId,
    /// The enclosing graph for nested graphs.
    pub parent_graph: Option<GraphId>,
}

/// The flavour of a node, used for tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Standard,
    Connector,
    Composite,
    Tunnel,
    /// Non-hierarchical annotation such as a comment box.
    Annotation,
}

impl NodeKind {
    /// Human-readable label, `None` for standard nodes.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Standard => None,
            Self::Connector => Some("Connector"),
            Self::Composite => Some("Composite"),
            Self::Tunnel => Some("Tunnel"),
            Self::Annotation => Some("Comment"),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Standard => "standard",
            Self::Connector => "connector",
            Self::Composite => "composite",
            Self::Tunnel => "tunnel",
            Self::Annotation => "annotation",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// Title shown in the outline.
    pub display_name: String,
    pub path: String,
    pub kind: NodeKind,
    /// Type of the runtime instance behind the node, if any.
    pub type_name: Option<String>,
    /// The graph the node is placed on.
    pub graph: GraphId,
    /// The owning manager. Annotations and detached nodes may have none.
    pub manager: Option<ManagerId>,
    /// Structural parent node (sub-nodes hang off their parent).
    pub structural_parent: Option<NodeId>,
}

/// Editing flags of a reflected property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFlags {
    pub editable: bool,
    pub advanced_display: bool,
    pub disable_edit_on_instance: bool,
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            editable: true,
            advanced_display: false,
            disable_edit_on_instance: false,
        }
    }
}

impl PropertyFlags {
    /// Only instance-editable, non-advanced properties get an outline row.
    pub fn is_listable(&self) -> bool {
        self.editable && !self.advanced_display && !self.disable_edit_on_instance
    }
}

/// A reflected property exposed by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub type_name: String,
    /// Exported text of the current value.
    pub value: Option<String>,
    pub flags: PropertyFlags,
    /// Path of the object that holds the field.
    pub owner_path: String,
    /// Editor-side node wrapping the owner. When set, the row attaches
    /// under that node instead of the owner path.
    pub editor_proxy: Option<NodeId>,
}
