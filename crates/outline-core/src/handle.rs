//! Weak handles into a document.
//!
//! A handle never keeps an entity alive. Every lookup through a
//! [`DocumentModel`](crate::DocumentModel) returns `Option`, and `None`
//! means the entity behind the handle has expired.

use serde::{Deserialize, Serialize};

macro_rules! entity_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Creates a handle from a raw id.
            pub fn new(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw id.
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_handle!(
    /// Handle to a manager, the top-level owner of graphs.
    ManagerId,
    "manager"
);

entity_handle!(
    /// Handle to a graph owned by a manager (possibly nested in another graph).
    GraphId,
    "graph"
);

entity_handle!(
    /// Handle to a node placed on a graph.
    NodeId,
    "node"
);

/// A build root. Roots are managers; expired roots are skipped silently.
pub type RootHandle = ManagerId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(ManagerId::new(3).to_string(), "manager#3");
        assert_eq!(GraphId::new(0).to_string(), "graph#0");
        assert_eq!(NodeId::new(12).to_string(), "node#12");
    }

    #[test]
    fn test_handle_serializes_as_index() {
        let json = serde_json::to_string(&NodeId::new(7)).unwrap();
        assert_eq!(json, "7");

        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index(), 7);
    }
}
