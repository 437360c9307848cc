//! Tree items.
//!
//! Items live in the arena of a [`TreeBuilderOutput`](crate::TreeBuilderOutput)
//! and refer to each other by [`ItemId`]. The payload points back into the
//! document through weak handles and never owns anything there.

use crate::query::escape_filter_text;
use outline_core::{GraphId, ManagerId, NodeId};
use serde::{Deserialize, Serialize};

/// Index of an item inside one build's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Visibility computed by the filter, ordered by specificity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterResult {
    #[default]
    Hidden,
    /// Visible only to lead to a matching descendant.
    ShownDescendant,
    Shown,
    ShownHighlighted,
}

impl FilterResult {
    /// Returns true for anything but `Hidden`.
    pub fn is_visible(self) -> bool {
        self != Self::Hidden
    }
}

/// The closed set of item variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Manager,
    Graph,
    Node,
    Property,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Manager => "manager",
            Self::Graph => "graph",
            Self::Node => "node",
            Self::Property => "property",
        };
        write!(f, "{}", s)
    }
}

/// Back-reference into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemPayload {
    Manager(ManagerId),
    Graph(GraphId),
    Node(NodeId),
    /// A reflected property, identified by the node exposing it and its name.
    Property { node: NodeId, name: String },
}

impl ItemPayload {
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Manager(_) => ItemKind::Manager,
            Self::Graph(_) => ItemKind::Graph,
            Self::Node(_) => ItemKind::Node,
            Self::Property { .. } => ItemKind::Property,
        }
    }
}

/// A descriptive label attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemTag {
    pub label: String,
}

impl ItemTag {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// The text this tag contributes to filter strings and chips,
    /// e.g. `Tag:Manager_Fragment`.
    pub fn filter_text(&self) -> String {
        escape_filter_text(&format!("Tag:{}", self.label))
    }
}

/// One entry of the outline.
#[derive(Debug, Clone)]
pub struct TreeItem {
    key: String,
    display_name: String,
    payload: ItemPayload,
    tags: Vec<ItemTag>,
    value: Option<String>,

    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) filtered_children: Vec<ItemId>,
    pub(crate) filter_result: FilterResult,
}

impl TreeItem {
    /// Creates a detached item.
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, payload: ItemPayload) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            payload,
            tags: Vec::new(),
            value: None,
            parent: None,
            children: Vec::new(),
            filtered_children: Vec::new(),
            filter_result: FilterResult::Hidden,
        }
    }

    /// Adds a tag.
    pub fn with_tag(mut self, label: impl Into<String>) -> Self {
        self.tags.push(ItemTag::new(label));
        self
    }

    /// Sets the value preview (properties).
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The attach key other items resolve this item by.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &ItemPayload {
        &self.payload
    }

    pub fn tags(&self) -> &[ItemTag] {
        &self.tags
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// The full, unfiltered children in attach order.
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    /// Children that survived the last filter pass. Stale after a rebuild.
    pub fn filtered_children(&self) -> &[ItemId] {
        &self.filtered_children
    }

    pub fn filter_result(&self) -> FilterResult {
        self.filter_result
    }

    /// The composite string queries are evaluated against:
    /// `Name=<name> Tag:<a> Tag:<b> Value=<value>`, with every part escaped.
    pub fn filter_string(&self) -> String {
        let mut out = format!("Name={}", escape_filter_text(&self.display_name));
        for tag in &self.tags {
            out.push(' ');
            out.push_str(&tag.filter_text());
        }
        if let Some(value) = &self.value {
            out.push_str(" Value=");
            out.push_str(&escape_filter_text(value));
        }
        out
    }
}
