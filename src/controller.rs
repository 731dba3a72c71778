//! Polling controller.
//!
//! Owns the session's [`ClusterContext`], pulls snapshots from a
//! [`ClusterSource`], applies them and publishes the derived
//! [`ClusterViewState`] on a watch channel.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::context::{ApplyOutcome, ClusterContext, ModePolicy};
use crate::error::Result;
use crate::source::ClusterSource;
use crate::view::ClusterViewState;

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub refresh_interval: Duration,
    /// Fail on malformed snapshots instead of skipping them.
    pub strict_snapshots: bool,
    pub mode_policy: ModePolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            refresh_interval: cfg.refresh_interval(),
            strict_snapshots: cfg.strict_snapshots,
            mode_policy: cfg.mode_policy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(ApplyOutcome),
    /// The snapshot was malformed and nothing was changed.
    Ignored,
    /// Another load was still outstanding.
    Skipped,
}

pub struct ClusterController {
    source: Arc<dyn ClusterSource>,
    options: ControllerOptions,
    context: Mutex<ClusterContext>,
    /// Held for the whole fetch-and-apply of one load.
    loading: Mutex<()>,
    view_tx: watch::Sender<ClusterViewState>,
    interval: StdMutex<Option<JoinHandle<()>>>,
}

impl ClusterController {
    pub fn new(source: Arc<dyn ClusterSource>, options: ControllerOptions) -> Self {
        let context = ClusterContext::new();
        let (view_tx, _) = watch::channel(ClusterViewState::derive(&context));
        Self {
            source,
            options,
            context: Mutex::new(context),
            loading: Mutex::new(()),
            view_tx,
            interval: StdMutex::new(None),
        }
    }

    /// Latest derived view-state.
    pub fn view(&self) -> ClusterViewState {
        self.view_tx.borrow().clone()
    }

    /// Receiver notified each time the view-state is recomputed.
    pub fn subscribe(&self) -> watch::Receiver<ClusterViewState> {
        self.view_tx.subscribe()
    }

    /// Fetches one snapshot and applies it.
    ///
    /// Errors leave the node sets and mode flags as they were.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let Ok(_loading) = self.loading.try_lock() else {
            debug!("cluster load already in flight, skipping");
            return Ok(LoadOutcome::Skipped);
        };
        self.fetch_and_apply().await
    }

    async fn fetch_and_apply(&self) -> Result<LoadOutcome> {
        let response = self.source.fetch().await?;
        let snapshot = match response.into_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) if !self.options.strict_snapshots => {
                warn!("Ignoring cluster snapshot: {}", e);
                return Ok(LoadOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        let mut ctx = self.context.lock().await;
        let outcome = ctx.apply(&snapshot, self.options.mode_policy);
        self.publish(&ctx);
        Ok(LoadOutcome::Applied(outcome))
    }

    pub async fn reload(&self) -> Result<LoadOutcome> {
        self.load().await
    }

    /// Initial load followed by periodic polling.
    pub async fn activate(self: &Arc<Self>) {
        if let Err(e) = self.load().await {
            error!("Initial cluster load failed: {}", e);
        }
        self.start_interval(self.options.refresh_interval);
    }

    /// Starts polling every `period`, replacing any running poller.
    pub fn start_interval(self: &Arc<Self>, period: Duration) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match this.reload().await {
                    Ok(LoadOutcome::Applied(outcome))
                        if outcome.current.changed_membership()
                            || outcome.staged.is_some_and(|s| s.changed_membership()) =>
                    {
                        info!("Cluster membership changed: {:?}", outcome)
                    }
                    Ok(outcome) => debug!("Poll finished: {:?}", outcome),
                    Err(e) if e.is_retryable() => warn!("Cluster poll failed: {}", e),
                    Err(e) => error!("Cluster poll failed: {}", e),
                }
            }
        });

        let previous = self
            .interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        info!("Polling cluster every {:?}", period);
    }

    /// Stops polling. Safe to call when polling never started.
    pub fn cancel_interval(&self) {
        let handle = self
            .interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Stopped polling cluster");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Drops the staged plan server-side, then refreshes.
    ///
    /// A poll already in flight may have been answered before the delete, so
    /// this waits for it and fetches again rather than skipping.
    pub async fn clear_plan(&self) -> Result<LoadOutcome> {
        self.source.clear_plan().await?;
        info!("Cleared staged cluster plan");
        let _loading = self.loading.lock().await;
        self.fetch_and_apply().await
    }

    /// Re-seeds both node sets empty and clears the mode flags.
    pub async fn reset(&self) {
        let mut ctx = self.context.lock().await;
        *ctx = ClusterContext::new();
        self.publish(&ctx);
    }

    fn publish(&self, ctx: &ClusterContext) {
        self.view_tx.send_replace(ClusterViewState::derive(ctx));
    }
}
