//! Outline Core - Document model for the outline engine
//!
//! This crate defines what the outline engine reads: weak entity handles,
//! the [`DocumentModel`] trait, and an in-memory [`Document`] that
//! implements it on top of petgraph.
//!
//! # Example
//!
//! ```
//! use outline_core::{Document, DocumentModel};
//!
//! let mut doc = Document::new();
//! let quest = doc.add_manager("Quest").unwrap();
//! let main = doc.add_graph(quest, "Main").unwrap();
//! let start = doc.add_node(main, "Start").unwrap();
//!
//! assert_eq!(doc.node(start).unwrap().path, "Quest/Main/Start");
//! ```

mod document;
mod error;
mod handle;
mod model;
mod snapshot;

pub use document::{Document, DocumentStats, PropertySpec, SharedDocument};
pub use error::{DocumentError, Result};
pub use handle::{GraphId, ManagerId, NodeId, RootHandle};
pub use model::{
    DocumentModel, GraphInfo, ManagerInfo, NodeInfo, NodeKind, PropertyFlags, PropertyInfo,
};
pub use snapshot::{
    AnnotationSnapshot, DocumentSnapshot, GraphSnapshot, ManagerSnapshot, NodeSnapshot,
};
