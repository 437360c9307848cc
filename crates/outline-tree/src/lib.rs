//! Outline Tree - Building and filtering the outline
//!
//! This crate turns a document into a searchable forest of tree items.
//!
//! # Architecture
//!
//! A build runs in two stages, both cancellable through an abandon
//! predicate:
//! - [`collect_references`] walks the document from the requested roots
//! - [`TreeAssembler`] creates the items and attaches each under its parent key
//!
//! The resulting [`TreeBuilderOutput`] is then filtered in place by
//! [`filter`] whenever the query changes.
//!
//! # Example
//!
//! ```
//! use outline_core::Document;
//! use outline_tree::{build_tree, filter, BuilderArgs, FilterArgs, FilterResult};
//!
//! let mut doc = Document::new();
//! let quest = doc.add_manager("Quest").unwrap();
//! let main = doc.add_graph(quest, "Main").unwrap();
//! doc.add_node(main, "Talk").unwrap();
//!
//! let mut tree = build_tree(&doc, &[quest], BuilderArgs::default(), || false).unwrap();
//! filter(&mut tree, &FilterArgs::new("talk"));
//!
//! let talk = tree.find("Quest/Main/Talk", &[]).unwrap();
//! assert_eq!(tree[talk].filter_result(), FilterResult::Shown);
//! ```

mod assembler;
mod chips;
mod collector;
mod filter;
mod item;
mod output;
mod query;

pub use assembler::{build_tree, BuilderArgs, TreeAssembler, ROOT_SUFFIX};
pub use chips::{compose_query, FilterChip, FilterChips};
pub use collector::{collect_references, CollectedReferences};
pub use filter::{filter, filter_recursive, FilterArgs};
pub use item::{FilterResult, ItemId, ItemKind, ItemPayload, ItemTag, TreeItem};
pub use output::TreeBuilderOutput;
pub use query::{escape_filter_text, QueryError, QueryKind, TextQuery};
