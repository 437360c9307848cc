//! The built forest.

use crate::item::{ItemId, ItemKind, TreeItem};
use std::collections::HashMap;
use std::ops::Index;
use tracing::debug;

/// Result of one build: an arena of items plus the views over it.
///
/// An output is populated once by the assembler and then only read, except
/// for the per-item filter state the filter engine rewrites on every pass.
#[derive(Debug, Default)]
pub struct TreeBuilderOutput {
    arena: Vec<TreeItem>,

    /// Top-level items in insertion order.
    items: Vec<ItemId>,

    /// Every item in insertion order.
    linear_items: Vec<ItemId>,

    /// Key to the last item inserted under that key.
    item_map: HashMap<String, ItemId>,
}

impl TreeBuilderOutput {
    /// Creates an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item and attaches it.
    ///
    /// With a parent key, the parent is resolved through [`find`](Self::find)
    /// restricted to `kinds`; if nothing matches the item becomes a new root.
    /// The item map entry for the item's key is overwritten.
    pub fn add(&mut self, mut item: TreeItem, parent_key: Option<&str>, kinds: &[ItemKind]) -> ItemId {
        let id = ItemId(self.arena.len());
        let parent = parent_key.and_then(|key| {
            let found = self.find(key, kinds);
            if found.is_none() {
                debug!("No parent '{}' for '{}', attaching at root", key, item.key());
            }
            found
        });

        item.parent = parent;
        match parent {
            Some(parent) => self.arena[parent.0].children.push(id),
            None => self.items.push(id),
        }

        self.item_map.insert(item.key().to_string(), id);
        self.linear_items.push(id);
        self.arena.push(item);
        id
    }

    /// Resolves a key to an item whose kind is in `kinds` (any kind when
    /// `kinds` is empty).
    ///
    /// The item map is consulted first. When its entry has the wrong kind,
    /// the linear list is scanned from the end so the most recently
    /// inserted candidate wins.
    pub fn find(&self, key: &str, kinds: &[ItemKind]) -> Option<ItemId> {
        let accepts = |id: ItemId| kinds.is_empty() || kinds.contains(&self.arena[id.0].kind());

        if let Some(&id) = self.item_map.get(key) {
            if accepts(id) {
                return Some(id);
            }
        }

        self.linear_items
            .iter()
            .rev()
            .copied()
            .find(|&id| self.arena[id.0].key() == key && accepts(id))
    }

    /// Looks up an item by id.
    pub fn get(&self, id: ItemId) -> Option<&TreeItem> {
        self.arena.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> &mut TreeItem {
        &mut self.arena[id.0]
    }

    /// Top-level items.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Every item, in insertion order.
    pub fn linear_items(&self) -> &[ItemId] {
        &self.linear_items
    }

    /// The attach key of an item's parent, `None` for roots.
    pub fn parent_key(&self, id: ItemId) -> Option<&str> {
        let parent = self.get(id)?.parent()?;
        self.get(parent).map(TreeItem::key)
    }

    /// Number of ancestors above an item.
    pub fn depth(&self, id: ItemId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(TreeItem::parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(TreeItem::parent);
        }
        depth
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns true if the build produced nothing.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Counts items per kind.
    pub fn count_kind(&self, kind: ItemKind) -> usize {
        self.arena.iter().filter(|item| item.kind() == kind).count()
    }
}

impl Index<ItemId> for TreeBuilderOutput {
    type Output = TreeItem;

    fn index(&self, id: ItemId) -> &TreeItem {
        &self.arena[id.0]
    }
}
