//! Tree assembly.
//!
//! Turns collected references into tree items and attaches each one under
//! its resolved parent key. Nodes resolve their parent with a fixed
//! precedence:
//!
//! 1. the manager's root node attaches under the manager,
//! 2. a manager fragment attaches under `<manager>.Root`,
//! 3. a node without a structural parent attaches under its graph,
//! 4. a sub-node attaches under its structural parent,
//! 5. anything else attaches under the manager.
//!
//! Annotation nodes always attach under their graph. A reference that has
//! expired while resolving a parent turns the item into a forest root.

use crate::collector::{collect_references, CollectedReferences};
use crate::item::{ItemKind, ItemPayload, TreeItem};
use crate::output::TreeBuilderOutput;
use outline_core::{DocumentModel, ManagerId, ManagerInfo, NodeId, NodeInfo, NodeKind, RootHandle};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Suffix of the synthetic bucket fragments attach under.
pub const ROOT_SUFFIX: &str = ".Root";

const MANAGER: &[ItemKind] = &[ItemKind::Manager];
const GRAPH: &[ItemKind] = &[ItemKind::Graph];
const NODE: &[ItemKind] = &[ItemKind::Node];

/// Which item categories a build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderArgs {
    pub show_managers: bool,
    pub show_graphs: bool,
    pub show_nodes: bool,
    pub show_properties: bool,
}

impl Default for BuilderArgs {
    fn default() -> Self {
        Self {
            show_managers: true,
            show_graphs: true,
            show_nodes: true,
            show_properties: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeRole {
    RootNode,
    Fragment,
    Plain,
}

struct NodePlan {
    id: NodeId,
    info: NodeInfo,
    role: NodeRole,
    key: String,
    parent_key: Option<String>,
    parent_kinds: &'static [ItemKind],
    rank: usize,
}

/// Builds a [`TreeBuilderOutput`] from collected references.
pub struct TreeAssembler<'a, M: DocumentModel + ?Sized> {
    model: &'a M,
    args: BuilderArgs,
    managers: HashMap<ManagerId, Option<ManagerInfo>>,
}

impl<'a, M: DocumentModel + ?Sized> TreeAssembler<'a, M> {
    pub fn new(model: &'a M, args: BuilderArgs) -> Self {
        Self {
            model,
            args,
            managers: HashMap::new(),
        }
    }

    /// Assembles the output. Returns `None` if `abandon` fired.
    pub fn assemble<F>(mut self, refs: &CollectedReferences, abandon: F) -> Option<TreeBuilderOutput>
    where
        F: Fn() -> bool,
    {
        let mut output = TreeBuilderOutput::new();

        if self.args.show_managers {
            for &root in &refs.roots {
                if abandon() {
                    return None;
                }
                let Some(info) = self.manager(root) else {
                    debug!("Skipping expired manager {}", root);
                    continue;
                };
                let item = TreeItem::new(&info.path, &info.name, ItemPayload::Manager(root))
                    .with_tag("Manager");
                output.add(item, None, &[]);
            }
        }

        if self.args.show_graphs {
            for &graph in &refs.graphs {
                if abandon() {
                    return None;
                }
                let Some(info) = self.model.graph(graph) else {
                    debug!("Skipping expired graph {}", graph);
                    continue;
                };
                let (parent_key, kinds) = match info.parent_graph {
                    Some(parent) => (self.model.graph(parent).map(|g| g.path), GRAPH),
                    None => (self.manager(info.manager).map(|m| m.path), MANAGER),
                };
                let item = TreeItem::new(&info.path, &info.name, ItemPayload::Graph(graph))
                    .with_tag("Graph");
                output.add(item, parent_key.as_deref(), kinds);
            }
        }

        if !self.args.show_nodes && !self.args.show_properties {
            return Some(output);
        }

        let mut plans = Vec::with_capacity(refs.nodes.len());
        for &node in &refs.nodes {
            if abandon() {
                return None;
            }
            match self.model.node(node) {
                Some(info) => plans.push(self.plan_node(node, info, refs.nodes.len())),
                None => debug!("Skipping expired node {}", node),
            }
        }
        // Parents must exist before their children look them up.
        plans.sort_by_key(|plan| plan.rank);

        if self.args.show_nodes {
            for plan in &plans {
                if abandon() {
                    return None;
                }
                output.add(self.node_item(plan), plan.parent_key.as_deref(), plan.parent_kinds);
            }
        }

        if self.args.show_properties {
            let mut seen = HashSet::new();
            for plan in &plans {
                if abandon() {
                    return None;
                }
                for property in self.model.reflectable_properties(plan.id) {
                    if !property.flags.is_listable() {
                        continue;
                    }
                    let parent_key = match property.editor_proxy {
                        Some(proxy) if proxy != plan.id => self.node_key_of(proxy),
                        _ => Some(plan.key.clone()),
                    };
                    let Some(parent_key) = parent_key else {
                        debug!("Skipping property {} of expired proxy", property.name);
                        continue;
                    };
                    if !seen.insert((parent_key.clone(), property.name.clone())) {
                        debug!("Skipping duplicate property {} on {}", property.name, property.owner_path);
                        continue;
                    }

                    let key = format!("{}.{}", parent_key, property.name);
                    let mut item = TreeItem::new(
                        key,
                        &property.name,
                        ItemPayload::Property {
                            node: plan.id,
                            name: property.name.clone(),
                        },
                    )
                    .with_tag(&property.type_name);
                    if let Some(value) = &property.value {
                        item = item.with_value(value);
                    }
                    output.add(item, Some(&parent_key), NODE);
                }
            }
        }

        debug!(
            "Assembled {} items ({} graphs, {} nodes, {} properties)",
            output.len(),
            output.count_kind(ItemKind::Graph),
            output.count_kind(ItemKind::Node),
            output.count_kind(ItemKind::Property)
        );
        Some(output)
    }

    fn manager(&mut self, id: ManagerId) -> Option<ManagerInfo> {
        let model = self.model;
        self.managers
            .entry(id)
            .or_insert_with(|| model.manager(id))
            .clone()
    }

    fn role_of(&mut self, id: NodeId, info: &NodeInfo) -> (NodeRole, Option<ManagerInfo>) {
        let manager = info.manager.and_then(|m| self.manager(m));
        let role = match &manager {
            Some(m) if m.is_root_node(id) => NodeRole::RootNode,
            Some(m) if m.is_fragment(id) => NodeRole::Fragment,
            _ => NodeRole::Plain,
        };
        (role, manager)
    }

    /// The attach key of a node. The manager's root node is keyed as the
    /// `.Root` bucket.
    fn node_key(&mut self, id: NodeId, info: &NodeInfo) -> String {
        match self.role_of(id, info) {
            (NodeRole::RootNode, Some(manager)) => format!("{}{}", manager.path, ROOT_SUFFIX),
            _ => info.path.clone(),
        }
    }

    fn node_key_of(&mut self, id: NodeId) -> Option<String> {
        let info = self.model.node(id)?;
        Some(self.node_key(id, &info))
    }

    fn plan_node(&mut self, id: NodeId, info: NodeInfo, limit: usize) -> NodePlan {
        let (role, manager) = self.role_of(id, &info);
        let key = self.node_key(id, &info);

        if info.kind == NodeKind::Annotation {
            let parent_key = self.model.graph(info.graph).map(|g| g.path);
            return NodePlan {
                id,
                info,
                role,
                key,
                parent_key,
                parent_kinds: GRAPH,
                rank: 2,
            };
        }

        let (parent_key, parent_kinds) = match (role, &manager) {
            (NodeRole::RootNode, Some(m)) => (Some(m.path.clone()), MANAGER),
            (NodeRole::Fragment, Some(m)) => (Some(format!("{}{}", m.path, ROOT_SUFFIX)), NODE),
            _ => match info.structural_parent {
                None => match self.model.graph(info.graph) {
                    Some(graph) => (Some(graph.path), GRAPH),
                    None => (manager.as_ref().map(|m| m.path.clone()), MANAGER),
                },
                Some(parent) => (self.node_key_of(parent), NODE),
            },
        };

        let rank = match role {
            NodeRole::RootNode => 0,
            NodeRole::Fragment => 1,
            NodeRole::Plain => 2 + self.structural_depth(&info, limit),
        };

        NodePlan {
            id,
            info,
            role,
            key,
            parent_key,
            parent_kinds,
            rank,
        }
    }

    /// Number of structural ancestors, bounded to survive cycles.
    fn structural_depth(&self, info: &NodeInfo, limit: usize) -> usize {
        let mut depth = 0;
        let mut current = info.structural_parent;
        while let Some(parent) = current {
            if depth >= limit {
                break;
            }
            depth += 1;
            current = self.model.node(parent).and_then(|n| n.structural_parent);
        }
        depth
    }

    fn node_item(&self, plan: &NodePlan) -> TreeItem {
        let info = &plan.info;
        let mut item = TreeItem::new(&plan.key, &info.display_name, ItemPayload::Node(plan.id));

        if info.kind == NodeKind::Annotation {
            return item.with_tag("Comment");
        }

        item = item.with_tag("Node");
        if plan.role == NodeRole::Fragment {
            item = item.with_tag("Manager Fragment");
        }
        if let Some(label) = info.kind.label() {
            item = item.with_tag(label);
        }
        if let Some(type_name) = &info.type_name {
            item = item.with_tag(type_name);
        }
        item
    }
}

/// Collects and assembles in one go. Returns `None` when `abandon` fired
/// at any point.
pub fn build_tree<M, F>(
    model: &M,
    roots: &[RootHandle],
    args: BuilderArgs,
    abandon: F,
) -> Option<TreeBuilderOutput>
where
    M: DocumentModel + ?Sized,
    F: Fn() -> bool,
{
    let refs = collect_references(model, roots, &abandon);
    if !refs.complete {
        return None;
    }
    TreeAssembler::new(model, args).assemble(&refs, &abandon)
}
