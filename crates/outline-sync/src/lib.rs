//! Outline Sync - Background builds for the outline view
//!
//! Tree builds can take a while on large documents, so they run off the
//! consuming thread. This crate owns that protocol:
//!
//! - [`BuildCoordinator`] keeps at most one build running, supersedes it
//!   when a newer request arrives, and reports progress as [`BuildEvent`]s
//! - [`OutlineView`] installs finished trees and re-filters them as the
//!   query, chips or scope change
//!
//! Any raised [`ShutdownSignals`] flag makes running builds abandon their
//! work.

mod config;
mod coordinator;
mod signals;
mod view;

pub use config::{BuildMode, ConfigError, CoordinatorConfig};
pub use coordinator::{BuildCoordinator, BuildEvent};
pub use signals::ShutdownSignals;
pub use view::{OutlineRow, OutlineView};
