//! Build coordination.
//!
//! The coordinator runs at most one build at a time. A newer request
//! supersedes the running build: the running build is told to abandon, the
//! new attempt polls until it has unwound, and then builds whatever roots
//! were queued last. Results travel back to the consumer as [`BuildEvent`]s
//! over an unbounded channel that the consumer drains on its own thread.

use crate::config::{BuildMode, CoordinatorConfig};
use crate::signals::ShutdownSignals;
use outline_core::{DocumentModel, RootHandle};
use outline_tree::{build_tree, TreeBuilderOutput};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Notifications sent to the consumer.
#[derive(Debug)]
pub enum BuildEvent {
    /// A build began. Show the loading state.
    Started,
    /// A build completed. The consumer installs the output as its tree.
    Finished(TreeBuilderOutput),
    /// A build was abandoned and its partial output discarded.
    Cancelled,
}

/// State shared between the coordinator and its background attempts.
struct Shared {
    model: Arc<dyn DocumentModel>,
    config: CoordinatorConfig,
    signals: Arc<ShutdownSignals>,

    /// Roots of the latest request. Last writer wins.
    queued: Mutex<Vec<RootHandle>>,
    /// Held for the whole critical section of a build.
    build_lock: Mutex<()>,

    is_building: AtomicBool,
    abandon: AtomicBool,
    new_build_requested: AtomicBool,
    shut_down: AtomicBool,

    events: mpsc::UnboundedSender<BuildEvent>,
}

impl Shared {
    fn should_abandon(&self) -> bool {
        self.abandon.load(Ordering::SeqCst)
            || self.shut_down.load(Ordering::SeqCst)
            || self.signals.any_raised()
    }

    fn emit(&self, event: BuildEvent) {
        // The consumer may already be gone during teardown.
        let _ = self.events.send(event);
    }

    /// Runs one build if the build lock is free.
    fn run_locked(&self) {
        let guard = match self.build_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Build lock contended, yielding");
                return;
            }
        };

        // Raised before the shutdown check so teardown either sees this
        // build or this build sees teardown.
        self.is_building.store(true, Ordering::SeqCst);
        if self.shut_down.load(Ordering::SeqCst) {
            self.new_build_requested.store(false, Ordering::SeqCst);
            self.is_building.store(false, Ordering::SeqCst);
            return;
        }
        self.abandon.store(false, Ordering::SeqCst);
        self.new_build_requested.store(false, Ordering::SeqCst);

        let roots = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        info!("Building outline for {} roots", roots.len());
        self.emit(BuildEvent::Started);
        let start = Instant::now();

        let output = build_tree(self.model.as_ref(), &roots, self.config.builder, || {
            self.should_abandon()
        });

        match output {
            Some(output) if !self.should_abandon() => {
                info!(
                    "Build finished in {:?} ({} items)",
                    start.elapsed(),
                    output.len()
                );
                self.emit(BuildEvent::Finished(output));
            }
            _ => {
                info!("Build cancelled after {:?}", start.elapsed());
                self.emit(BuildEvent::Cancelled);
            }
        }

        drop(guard);
        self.abandon.store(false, Ordering::SeqCst);
        self.is_building.store(false, Ordering::SeqCst);
    }
}

/// One asynchronous build attempt.
async fn run_attempt(shared: Arc<Shared>) {
    if shared.is_building.load(Ordering::SeqCst) {
        debug!("Superseding the running build");
        shared.abandon.store(true, Ordering::SeqCst);
        while shared.is_building.load(Ordering::SeqCst) {
            tokio::time::sleep(shared.config.poll_interval()).await;
        }
    }

    if shared.shut_down.load(Ordering::SeqCst) {
        debug!("Dropping pending build after shutdown");
        shared.new_build_requested.store(false, Ordering::SeqCst);
        return;
    }

    let worker = shared.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || worker.run_locked()).await {
        warn!("Build task failed: {}", e);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BuildCoordinator
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the single-flight build protocol.
///
/// Dropping the coordinator abandons any running build and blocks until it
/// has unwound.
pub struct BuildCoordinator {
    shared: Arc<Shared>,
    runtime: Option<Handle>,
}

impl BuildCoordinator {
    /// Creates a coordinator and the receiving end of its event channel.
    ///
    /// Async mode uses the tokio runtime current at construction. Without
    /// one, builds fall back to running inline.
    pub fn new(
        model: Arc<dyn DocumentModel>,
        config: CoordinatorConfig,
        signals: Arc<ShutdownSignals>,
    ) -> (Self, mpsc::UnboundedReceiver<BuildEvent>) {
        let (events, rx) = mpsc::unbounded_channel();

        let runtime = match config.mode {
            BuildMode::Async => {
                let handle = Handle::try_current().ok();
                if handle.is_none() {
                    warn!("No tokio runtime available, building synchronously");
                }
                handle
            }
            BuildMode::Sync => None,
        };

        let shared = Arc::new(Shared {
            model,
            config,
            signals,
            queued: Mutex::new(Vec::new()),
            build_lock: Mutex::new(()),
            is_building: AtomicBool::new(false),
            abandon: AtomicBool::new(false),
            new_build_requested: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            events,
        });

        (Self { shared, runtime }, rx)
    }

    /// Queues `roots` and starts a build for them.
    ///
    /// In async mode, requests arriving while an attempt is already pending
    /// are folded into it: the pending attempt reads the queue only once it
    /// holds the build lock, so the newest roots win.
    pub fn request_build(&self, roots: Vec<RootHandle>) {
        if self.shared.shut_down.load(Ordering::SeqCst) {
            debug!("Ignoring build request after shutdown");
            return;
        }

        *self
            .shared
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = roots;

        let Some(runtime) = &self.runtime else {
            self.shared.run_locked();
            return;
        };

        if self.shared.new_build_requested.swap(true, Ordering::SeqCst) {
            debug!("Build already pending, coalescing request");
            return;
        }
        runtime.spawn(run_attempt(self.shared.clone()));
    }

    /// Asks the running build to stop. No-op for inline builds.
    pub fn abandon_build(&self) {
        if self.runtime.is_some() {
            self.shared.abandon.store(true, Ordering::SeqCst);
        }
    }

    /// The abandon predicate: an explicit abandon, teardown, or any
    /// external shutdown signal.
    pub fn should_abandon(&self) -> bool {
        self.shared.should_abandon()
    }

    /// Returns true while a build is running.
    pub fn is_building(&self) -> bool {
        self.shared.is_building.load(Ordering::SeqCst)
    }

    /// Returns true while a build is running or a request is pending.
    pub fn is_busy(&self) -> bool {
        self.is_building() || self.shared.new_build_requested.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }

    /// Abandons any running build and blocks until it has unwound. Later
    /// requests are ignored.
    pub fn shutdown(&self) {
        if self.shared.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.abandon.store(true, Ordering::SeqCst);

        while self.shared.is_building.load(Ordering::SeqCst) {
            std::thread::sleep(self.shared.config.poll_interval());
        }
        debug!("Build coordinator shut down");
    }
}

impl Drop for BuildCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
