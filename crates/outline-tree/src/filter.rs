//! Filter engine.
//!
//! One recursive pass per query: every item first decides its own result
//! (text match, or scope rules when no text query is active), then takes
//! the most specific result among its children into account on the way back
//! up. An item with a visible descendant stays visible as
//! `ShownDescendant` to provide a path to it.

use crate::item::{FilterResult, ItemId, ItemKind};
use crate::output::TreeBuilderOutput;
use crate::query::TextQuery;

/// Inputs of a filter pass.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub query: TextQuery,
    /// List every match as a top-level row instead of keeping hierarchy.
    pub flatten_hierarchy: bool,
    /// Keys of the graphs allowed when no text query is active. Empty
    /// means every graph.
    pub graphs_to_show: Vec<String>,
}

impl FilterArgs {
    /// Filter args for a query text.
    pub fn new(query: &str) -> Self {
        Self {
            query: TextQuery::parse(query),
            ..Self::default()
        }
    }
}

/// Runs a filter pass over the whole output and returns the rows to show
/// at the top level.
///
/// In hierarchy mode that is every root whose result is not `Hidden`. In
/// flatten mode with an active query it is every matching item, at any
/// depth, in pre-order.
pub fn filter(tree: &mut TreeBuilderOutput, args: &FilterArgs) -> Vec<ItemId> {
    let roots = tree.items().to_vec();
    let mut filtered = Vec::with_capacity(roots.len());

    for &root in &roots {
        if filter_recursive(tree, args, root).is_visible() {
            filtered.push(root);
        }
    }

    if args.flatten_hierarchy && args.query.is_active() {
        let mut matches = Vec::new();
        for &root in &roots {
            collect_matches(tree, root, &mut matches);
        }
        return matches;
    }

    filtered
}

/// Computes and stores the result of one item and its subtree.
pub fn filter_recursive(tree: &mut TreeBuilderOutput, args: &FilterArgs, id: ItemId) -> FilterResult {
    let own = own_result(tree, args, id);

    // Tentative: children consult it for the "parent hidden" scope rule.
    tree.get_mut(id).filter_result = own;

    let children = tree[id].children().to_vec();
    let mut descendants = FilterResult::Hidden;
    let mut visible = Vec::with_capacity(children.len());
    for child in children {
        let result = filter_recursive(tree, args, child);
        descendants = descendants.max(result);
        if result.is_visible() {
            visible.push(child);
        }
    }

    let result = if descendants > own && own < FilterResult::ShownDescendant {
        FilterResult::ShownDescendant
    } else {
        own
    };

    let item = tree.get_mut(id);
    item.filter_result = result;
    item.filtered_children = visible;
    result
}

fn own_result(tree: &TreeBuilderOutput, args: &FilterArgs, id: ItemId) -> FilterResult {
    let item = &tree[id];

    if args.query.is_active() {
        return if args.query.matches(&item.filter_string()) {
            FilterResult::Shown
        } else {
            FilterResult::Hidden
        };
    }

    if item.kind() == ItemKind::Graph {
        let allowed = args.graphs_to_show.is_empty()
            || args.graphs_to_show.iter().any(|key| key == item.key());
        return if allowed {
            FilterResult::ShownDescendant
        } else {
            FilterResult::Hidden
        };
    }

    let parent_hidden = item
        .parent()
        .is_some_and(|parent| tree[parent].filter_result() == FilterResult::Hidden);
    if parent_hidden {
        FilterResult::Hidden
    } else {
        FilterResult::ShownDescendant
    }
}

fn collect_matches(tree: &TreeBuilderOutput, id: ItemId, out: &mut Vec<ItemId>) {
    let item = &tree[id];
    if item.filter_result() >= FilterResult::Shown {
        out.push(id);
    }
    for &child in item.children() {
        collect_matches(tree, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{build_tree, BuilderArgs};
    use outline_core::{Document, ManagerId};

    fn example() -> TreeBuilderOutput {
        let mut doc = Document::new();
        let manager = doc.add_manager("ManagerA").unwrap();
        let graph = doc.add_graph(manager, "GraphA").unwrap();
        let a = doc.add_node(graph, "NodeA").unwrap();
        let b = doc.add_node(graph, "NodeB").unwrap();
        doc.set_parent(b, a).unwrap();
        build_tree(&doc, &[manager], BuilderArgs::default(), || false).unwrap()
    }

    fn two_graphs() -> (TreeBuilderOutput, ManagerId) {
        let mut doc = Document::new();
        let manager = doc.add_manager("M").unwrap();
        for name in ["Intro", "Outro"] {
            let graph = doc.add_graph(manager, name).unwrap();
            let start = doc.add_node(graph, "Start").unwrap();
            let talk = doc.add_node(graph, format!("{name}Talk")).unwrap();
            doc.set_parent(talk, start).unwrap();
        }
        let out = build_tree(&doc, &[manager], BuilderArgs::default(), || false).unwrap();
        (out, manager)
    }

    fn result(tree: &TreeBuilderOutput, key: &str) -> FilterResult {
        tree[tree.find(key, &[]).unwrap()].filter_result()
    }

    fn id(tree: &TreeBuilderOutput, key: &str) -> ItemId {
        tree.find(key, &[]).unwrap()
    }

    #[test]
    fn test_example_query_hierarchy() {
        let mut tree = example();
        let rows = filter(&mut tree, &FilterArgs::new("NodeB"));

        assert_eq!(rows, vec![id(&tree, "ManagerA")]);
        assert_eq!(result(&tree, "ManagerA"), FilterResult::ShownDescendant);
        assert_eq!(result(&tree, "ManagerA/GraphA"), FilterResult::ShownDescendant);
        assert_eq!(result(&tree, "ManagerA/GraphA/NodeA"), FilterResult::ShownDescendant);
        assert_eq!(result(&tree, "ManagerA/GraphA/NodeB"), FilterResult::Shown);
    }

    #[test]
    fn test_example_query_flatten() {
        let mut tree = example();
        let args = FilterArgs {
            flatten_hierarchy: true,
            ..FilterArgs::new("NodeB")
        };

        let rows = filter(&mut tree, &args);
        assert_eq!(rows, vec![id(&tree, "ManagerA/GraphA/NodeB")]);
    }

    #[test]
    fn test_no_query_shows_everything() {
        let mut tree = example();
        let rows = filter(&mut tree, &FilterArgs::default());

        assert_eq!(rows.len(), 1);
        for &item in tree.linear_items() {
            assert_eq!(tree[item].filter_result(), FilterResult::ShownDescendant);
            assert_eq!(tree[item].filtered_children(), tree[item].children());
        }
    }

    #[test]
    fn test_invalid_query_is_inactive() {
        let mut tree = example();
        filter(&mut tree, &FilterArgs::new("(NodeB"));

        assert_eq!(result(&tree, "ManagerA/GraphA/NodeB"), FilterResult::ShownDescendant);
    }

    #[test]
    fn test_no_match_hides_everything() {
        let mut tree = example();
        let rows = filter(&mut tree, &FilterArgs::new("Nothing"));

        assert!(rows.is_empty());
        assert!(tree
            .linear_items()
            .iter()
            .all(|&item| tree[item].filter_result() == FilterResult::Hidden));
    }

    #[test]
    fn test_graph_allow_list() {
        let (mut tree, _) = two_graphs();
        let args = FilterArgs {
            graphs_to_show: vec!["M/Outro".to_string()],
            ..FilterArgs::default()
        };
        filter(&mut tree, &args);

        assert_eq!(result(&tree, "M/Intro"), FilterResult::Hidden);
        assert_eq!(result(&tree, "M/Intro/Start"), FilterResult::Hidden);
        assert_eq!(result(&tree, "M/Intro/IntroTalk"), FilterResult::Hidden);
        assert_eq!(result(&tree, "M/Outro/OutroTalk"), FilterResult::ShownDescendant);

        let manager = id(&tree, "M");
        assert_eq!(tree[manager].filtered_children(), &[id(&tree, "M/Outro")]);
    }

    #[test]
    fn test_filtered_children_keep_order() {
        let (mut tree, _) = two_graphs();
        filter(&mut tree, &FilterArgs::new("Talk || Outro"));

        let manager = id(&tree, "M");
        assert_eq!(
            tree[manager].filtered_children(),
            &[id(&tree, "M/Intro"), id(&tree, "M/Outro")]
        );
        // A matching parent keeps its own result.
        assert_eq!(result(&tree, "M/Outro"), FilterResult::Shown);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let (mut tree, _) = two_graphs();
        let args = FilterArgs::new("talk");

        let first_rows = filter(&mut tree, &args);
        let first: Vec<Vec<ItemId>> = tree
            .linear_items()
            .iter()
            .map(|&item| tree[item].filtered_children().to_vec())
            .collect();

        let second_rows = filter(&mut tree, &args);
        let second: Vec<Vec<ItemId>> = tree
            .linear_items()
            .iter()
            .map(|&item| tree[item].filtered_children().to_vec())
            .collect();

        assert_eq!(first_rows, second_rows);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ancestors_of_matches_are_visible() {
        let (mut tree, _) = two_graphs();
        filter(&mut tree, &FilterArgs::new("OutroTalk"));

        for &item in tree.linear_items() {
            if tree[item].filter_result() < FilterResult::Shown {
                continue;
            }
            let mut parent = tree[item].parent();
            while let Some(ancestor) = parent {
                assert!(tree[ancestor].filter_result() >= FilterResult::ShownDescendant);
                parent = tree[ancestor].parent();
            }
        }
        assert_eq!(result(&tree, "M/Intro"), FilterResult::Hidden);
    }

    #[test]
    fn test_later_pass_replaces_state() {
        let mut tree = example();
        filter(&mut tree, &FilterArgs::new("Nothing"));
        filter(&mut tree, &FilterArgs::default());

        assert_eq!(result(&tree, "ManagerA/GraphA/NodeB"), FilterResult::ShownDescendant);
    }
}
