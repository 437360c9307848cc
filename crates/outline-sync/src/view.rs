//! The consuming side of the build protocol.
//!
//! An [`OutlineView`] lives on one thread. It owns the installed tree, the
//! top-level filtered rows and everything the user has typed or toggled.
//! Background builds never touch it: finished trees arrive as events and
//! are installed wholesale by [`OutlineView::pump`].

use crate::coordinator::{BuildCoordinator, BuildEvent};
use outline_core::RootHandle;
use outline_tree::{
    compose_query, escape_filter_text, filter, FilterArgs, FilterChips, FilterResult, ItemId,
    ItemKind, TextQuery, TreeBuilderOutput,
};
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::debug;

/// One visible line of the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineRow {
    pub depth: usize,
    pub key: String,
    pub display_name: String,
    pub kind: ItemKind,
    pub result: FilterResult,
}

/// Tree state owned by the consuming thread.
pub struct OutlineView {
    coordinator: BuildCoordinator,
    events: mpsc::UnboundedReceiver<BuildEvent>,

    tree: TreeBuilderOutput,
    filtered_items: Vec<ItemId>,
    flat_rows: bool,

    query_text: String,
    highlight_text: String,
    chips: FilterChips,
    flatten_hierarchy: bool,
    graphs_to_show: Vec<String>,
    expanded: HashSet<String>,

    loading: bool,
}

impl OutlineView {
    /// Wraps a coordinator and the receiving end of its event channel.
    pub fn new(coordinator: BuildCoordinator, events: mpsc::UnboundedReceiver<BuildEvent>) -> Self {
        Self {
            coordinator,
            events,
            tree: TreeBuilderOutput::new(),
            filtered_items: Vec::new(),
            flat_rows: false,
            query_text: String::new(),
            highlight_text: String::new(),
            chips: FilterChips::new(),
            flatten_hierarchy: false,
            graphs_to_show: Vec::new(),
            expanded: HashSet::new(),
            loading: false,
        }
    }

    // ─── Building ───────────────────────────────────────────────────────

    /// Shows the loading state and asks the coordinator for a build.
    pub fn request_build(&mut self, roots: Vec<RootHandle>) {
        self.loading = true;
        self.coordinator.request_build(roots);
        // Inline builds have already queued their events.
        self.pump();
    }

    pub fn abandon_build(&self) {
        self.coordinator.abandon_build();
    }

    /// Handles every pending event. Returns the number handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Waits for events until no build is running or pending. Returns true
    /// if a tree was installed along the way.
    pub async fn settle(&mut self) -> bool {
        let mut installed = false;
        loop {
            let idle = !self.coordinator.is_busy();
            // Events are sent before the building flag drops, so an idle
            // coordinator has nothing left in flight.
            while let Ok(event) = self.events.try_recv() {
                installed |= matches!(event, BuildEvent::Finished(_));
                self.handle(event);
            }
            if idle {
                return installed;
            }
            let poll = self.coordinator.config().poll_interval();
            match tokio::time::timeout(poll, self.events.recv()).await {
                Ok(Some(event)) => {
                    installed |= matches!(event, BuildEvent::Finished(_));
                    self.handle(event);
                }
                Ok(None) => return installed,
                // The last event may already be handled while the flags drop.
                Err(_) => {}
            }
        }
    }

    fn handle(&mut self, event: BuildEvent) {
        match event {
            BuildEvent::Started => {
                self.loading = true;
            }
            BuildEvent::Finished(output) => {
                debug!("Installing tree with {} items", output.len());
                self.tree = output;
                self.filtered_items = self.tree.items().to_vec();
                self.flat_rows = false;
                self.loading = false;
                self.apply_filter();
            }
            BuildEvent::Cancelled => {
                self.loading = false;
            }
        }
    }

    // ─── Filtering ──────────────────────────────────────────────────────

    /// Sets the typed query and re-filters.
    pub fn set_query(&mut self, text: &str) {
        self.query_text = text.to_string();
        self.highlight_text = text.to_string();
        self.apply_filter();
    }

    /// Adds a chip (no-op if present) and re-filters.
    pub fn add_chip(&mut self, text: &str) {
        if self.chips.add(text) {
            self.apply_filter();
        }
    }

    pub fn remove_chip(&mut self, text: &str) {
        if self.chips.remove(text) {
            self.apply_filter();
        }
    }

    pub fn toggle_chip(&mut self, text: &str) {
        if self.chips.toggle(text).is_some() {
            self.apply_filter();
        }
    }

    pub fn set_flatten(&mut self, flatten: bool) {
        self.flatten_hierarchy = flatten;
        self.apply_filter();
    }

    pub fn set_graphs_to_show(&mut self, graphs: Vec<String>) {
        self.graphs_to_show = graphs;
        self.apply_filter();
    }

    /// The effective query: typed text AND'ed with the enabled chips.
    ///
    /// Typed text is escaped like a filter string, so it matches as one
    /// phrase (`Start Here` finds `Start_Here`) and a leading `!` is searched
    /// for rather than read as negation. Only chips contribute operators.
    pub fn effective_query(&self) -> String {
        let typed = escape_filter_text(self.query_text.trim());
        compose_query(&typed, &self.chips.expression())
    }

    /// Re-runs the filter over the installed tree and expands every visible
    /// item. Skipped while the abandon predicate holds; returns whether the
    /// pass ran.
    pub fn apply_filter(&mut self) -> bool {
        if self.coordinator.should_abandon() {
            debug!("Skipping filter while builds are being abandoned");
            return false;
        }

        let args = FilterArgs {
            query: TextQuery::parse(&self.effective_query()),
            flatten_hierarchy: self.flatten_hierarchy,
            graphs_to_show: self.graphs_to_show.clone(),
        };
        self.filtered_items = filter(&mut self.tree, &args);
        self.flat_rows = args.flatten_hierarchy && args.query.is_active();

        for &id in self.tree.linear_items() {
            let item = &self.tree[id];
            if item.filter_result().is_visible() {
                self.expanded.insert(item.key().to_string());
            }
        }
        true
    }

    // ─── Reading ────────────────────────────────────────────────────────

    /// Collapses or expands an item by key.
    pub fn set_expanded(&mut self, key: &str, expanded: bool) {
        if expanded {
            self.expanded.insert(key.to_string());
        } else {
            self.expanded.remove(key);
        }
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    /// The visible outline, in display order.
    pub fn rows(&self) -> Vec<OutlineRow> {
        let mut rows = Vec::new();
        for &id in &self.filtered_items {
            if self.flat_rows {
                rows.push(self.row(id, 0));
            } else {
                self.push_rows(id, 0, &mut rows);
            }
        }
        rows
    }

    fn push_rows(&self, id: ItemId, depth: usize, rows: &mut Vec<OutlineRow>) {
        rows.push(self.row(id, depth));
        let item = &self.tree[id];
        if !self.expanded.contains(item.key()) {
            return;
        }
        for &child in item.filtered_children() {
            self.push_rows(child, depth + 1, rows);
        }
    }

    fn row(&self, id: ItemId, depth: usize) -> OutlineRow {
        let item = &self.tree[id];
        OutlineRow {
            depth,
            key: item.key().to_string(),
            display_name: item.display_name().to_string(),
            kind: item.kind(),
            result: item.filter_result(),
        }
    }

    pub fn tree(&self) -> &TreeBuilderOutput {
        &self.tree
    }

    /// Top-level rows of the last filter pass.
    pub fn filtered_items(&self) -> &[ItemId] {
        &self.filtered_items
    }

    pub fn chips(&self) -> &FilterChips {
        &self.chips
    }

    pub fn query(&self) -> &str {
        &self.query_text
    }

    /// Text the presentation layer emphasises inside row labels.
    pub fn highlight_text(&self) -> &str {
        &self.highlight_text
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn coordinator(&self) -> &BuildCoordinator {
        &self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildMode, CoordinatorConfig};
    use crate::signals::ShutdownSignals;
    use outline_core::{Document, ManagerId};
    use std::sync::Arc;

    fn example() -> (Document, ManagerId) {
        let mut doc = Document::new();
        let manager = doc.add_manager("ManagerA").unwrap();
        let graph = doc.add_graph(manager, "GraphA").unwrap();
        let a = doc.add_node(graph, "NodeA").unwrap();
        let b = doc.add_node(graph, "NodeB").unwrap();
        doc.set_parent(b, a).unwrap();
        let other = doc.add_graph(manager, "GraphB").unwrap();
        doc.add_node(other, "Lonely").unwrap();
        (doc, manager)
    }

    fn view(mode: BuildMode, signals: Arc<ShutdownSignals>) -> (OutlineView, ManagerId) {
        let (doc, manager) = example();
        (view_of(doc, mode, signals), manager)
    }

    fn view_of(doc: Document, mode: BuildMode, signals: Arc<ShutdownSignals>) -> OutlineView {
        let config = CoordinatorConfig {
            mode,
            poll_interval_ms: 2,
            ..CoordinatorConfig::default()
        };
        let (coordinator, events) = BuildCoordinator::new(Arc::new(doc), config, signals);
        OutlineView::new(coordinator, events)
    }

    fn keys(rows: &[OutlineRow]) -> Vec<(usize, &str)> {
        rows.iter().map(|r| (r.depth, r.key.as_str())).collect()
    }

    #[test]
    fn test_inline_build_installs_tree() {
        let (mut view, manager) = view(BuildMode::Sync, Arc::new(ShutdownSignals::new()));
        view.request_build(vec![manager]);

        assert!(!view.is_loading());
        assert_eq!(view.tree().len(), 6);
        assert_eq!(
            keys(&view.rows()),
            [
                (0, "ManagerA"),
                (1, "ManagerA/GraphA"),
                (2, "ManagerA/GraphA/NodeA"),
                (3, "ManagerA/GraphA/NodeB"),
                (1, "ManagerA/GraphB"),
                (2, "ManagerA/GraphB/Lonely"),
            ]
        );
    }

    #[test]
    fn test_query_hierarchy_and_flatten() {
        let (mut view, manager) = view(BuildMode::Sync, Arc::new(ShutdownSignals::new()));
        view.request_build(vec![manager]);

        view.set_query("NodeB");
        let rows = view.rows();
        assert_eq!(
            keys(&rows),
            [
                (0, "ManagerA"),
                (1, "ManagerA/GraphA"),
                (2, "ManagerA/GraphA/NodeA"),
                (3, "ManagerA/GraphA/NodeB"),
            ]
        );
        assert_eq!(rows[2].result, FilterResult::ShownDescendant);
        assert_eq!(rows[3].result, FilterResult::Shown);
        assert_eq!(view.highlight_text(), "NodeB");

        view.set_flatten(true);
        assert_eq!(keys(&view.rows()), [(0, "ManagerA/GraphA/NodeB")]);
    }

    fn shown(view: &OutlineView) -> Vec<String> {
        view.rows()
            .into_iter()
            .filter(|r| r.result == FilterResult::Shown)
            .map(|r| r.display_name)
            .collect()
    }

    #[test]
    fn test_typed_query_matches_as_phrase() {
        let mut doc = Document::new();
        let manager = doc.add_manager("M").unwrap();
        let graph = doc.add_graph(manager, "G").unwrap();
        for name in ["Start Here", "Here We Start", "!important", "important"] {
            doc.add_node(graph, name).unwrap();
        }
        let mut view = view_of(doc, BuildMode::Sync, Arc::new(ShutdownSignals::new()));
        view.request_build(vec![manager]);

        view.set_query("Start Here");
        assert_eq!(view.effective_query(), "Start_Here");
        assert_eq!(shown(&view), ["Start Here"]);

        view.set_query("!important");
        assert_eq!(view.effective_query(), "$important");
        assert_eq!(shown(&view), ["!important"]);

        // Chips still combine with the escaped phrase.
        view.add_chip("Tag:Node");
        view.set_query(" Start Here ");
        assert_eq!(view.effective_query(), "(Start_Here) && (Tag:Node)");
        assert_eq!(shown(&view), ["Start Here"]);
    }

    #[test]
    fn test_chips_narrow_the_query() {
        let (mut view, manager) = view(BuildMode::Sync, Arc::new(ShutdownSignals::new()));
        view.request_build(vec![manager]);

        view.add_chip("Tag:Graph");
        assert_eq!(view.effective_query(), "(Tag:Graph)");
        let shown: Vec<String> = view
            .rows()
            .into_iter()
            .filter(|r| r.result == FilterResult::Shown)
            .map(|r| r.key)
            .collect();
        assert_eq!(shown, ["ManagerA/GraphA", "ManagerA/GraphB"]);

        view.set_query("GraphB");
        assert_eq!(view.effective_query(), "(GraphB) && (Tag:Graph)");
        assert_eq!(
            keys(&view.rows()),
            [(0, "ManagerA"), (1, "ManagerA/GraphB")]
        );

        view.toggle_chip("Tag:Graph");
        view.set_query("");
        assert_eq!(view.rows().len(), 6);

        view.remove_chip("Tag:Graph");
        assert!(view.chips().is_empty());
    }

    #[test]
    fn test_graph_scope_without_query() {
        let (mut view, manager) = view(BuildMode::Sync, Arc::new(ShutdownSignals::new()));
        view.request_build(vec![manager]);

        view.set_graphs_to_show(vec!["ManagerA/GraphB".to_string()]);
        assert_eq!(
            keys(&view.rows()),
            [(0, "ManagerA"), (1, "ManagerA/GraphB"), (2, "ManagerA/GraphB/Lonely")]
        );
    }

    #[test]
    fn test_collapsed_items_hide_children() {
        let (mut view, manager) = view(BuildMode::Sync, Arc::new(ShutdownSignals::new()));
        view.request_build(vec![manager]);

        view.set_expanded("ManagerA/GraphA", false);
        assert!(!view.is_expanded("ManagerA/GraphA"));
        assert_eq!(view.rows().len(), 4);

        // Filtering re-expands every visible item.
        view.set_query("");
        assert_eq!(view.rows().len(), 6);
    }

    #[test]
    fn test_filter_skipped_while_abandoning() {
        let signals = Arc::new(ShutdownSignals::new());
        let (mut view, manager) = view(BuildMode::Sync, signals.clone());
        view.request_build(vec![manager]);

        signals.set_process_exiting(true);
        view.set_query("NodeB");
        // The query is stored, but the previous pass stays in effect.
        assert_eq!(view.query(), "NodeB");
        assert_eq!(view.rows().len(), 6);

        signals.set_process_exiting(false);
        assert!(view.apply_filter());
        assert_eq!(view.rows().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_build_settles() {
        let (mut view, manager) = view(BuildMode::Async, Arc::new(ShutdownSignals::new()));
        view.set_query("Lonely");

        view.request_build(vec![manager]);
        assert!(view.is_loading());

        let installed = tokio::time::timeout(std::time::Duration::from_secs(5), view.settle())
            .await
            .unwrap();
        assert!(installed);
        assert!(!view.is_loading());
        assert_eq!(
            keys(&view.rows()),
            [(0, "ManagerA"), (1, "ManagerA/GraphB"), (2, "ManagerA/GraphB/Lonely")]
        );
    }
}
