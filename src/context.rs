//! Session-owned cluster state: the current and staged node sets plus the
//! two cluster-wide mode flags.

use log::info;
use serde::{Deserialize, Serialize};

use crate::node_set::{NodeSet, ReconcileOutcome};
use crate::types::{ClusterSnapshot, StagedCluster};

/// How the `legacy` / `ring_not_ready` flags react to later snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePolicy {
    /// Flags follow the latest snapshot.
    #[default]
    Reset,
    /// Once set, a flag stays set until the context is re-seeded.
    Latch,
}

/// What applying one snapshot did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub current: ReconcileOutcome,
    /// `None` when the snapshot carried a mode marker instead of a plan.
    pub staged: Option<ReconcileOutcome>,
    pub modes_changed: bool,
}

#[derive(Debug)]
pub struct ClusterContext {
    pub current: NodeSet,
    pub staged: NodeSet,
    pub legacy: bool,
    pub ring_not_ready: bool,
}

impl Default for ClusterContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterContext {
    pub fn new() -> Self {
        Self {
            current: NodeSet::new("current"),
            staged: NodeSet::new("staged"),
            legacy: false,
            ring_not_ready: false,
        }
    }

    pub fn apply(&mut self, snapshot: &ClusterSnapshot, policy: ModePolicy) -> ApplyOutcome {
        let current = self.current.reconcile(&snapshot.current);
        let before = (self.legacy, self.ring_not_ready);

        let staged = match &snapshot.staged {
            StagedCluster::RingNotReady => {
                self.ring_not_ready = true;
                if policy == ModePolicy::Reset {
                    self.legacy = false;
                }
                None
            }
            StagedCluster::Legacy => {
                self.legacy = true;
                if policy == ModePolicy::Reset {
                    self.ring_not_ready = false;
                }
                None
            }
            StagedCluster::Nodes(nodes) => {
                if policy == ModePolicy::Reset {
                    self.legacy = false;
                    self.ring_not_ready = false;
                }
                Some(self.staged.reconcile(nodes))
            }
        };

        let modes_changed = before != (self.legacy, self.ring_not_ready);
        if modes_changed {
            info!(
                "cluster mode changed: legacy={} ring_not_ready={}",
                self.legacy, self.ring_not_ready
            );
        }

        ApplyOutcome {
            current,
            staged,
            modes_changed,
        }
    }
}
