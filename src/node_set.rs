//! Identity-preserving node collections and the reconciler that keeps them
//! in step with snapshots.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::node::{NodeRecord, NodeRef};
use crate::types::NodeDescription;

/// What a single reconcile pass did to a [`NodeSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub added: usize,
    /// Distinct nodes overwritten in place; repeats of a name are counted
    /// in `duplicates` only.
    pub updated: usize,
    pub removed: usize,
    /// Descriptions whose name already appeared earlier in the same input.
    pub duplicates: usize,
    /// Whether the removals were applied as a bulk replacement.
    pub replaced: bool,
}

impl ReconcileOutcome {
    pub fn changed_membership(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Ordered set of live records keyed by node name.
#[derive(Debug)]
pub struct NodeSet {
    label: &'static str,
    nodes: Vec<NodeRef>,
    notifications: u64,
}

impl NodeSet {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            nodes: Vec::new(),
            notifications: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRef> {
        self.nodes.iter()
    }

    pub fn get(&self, name: &str) -> Option<&NodeRef> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Number of collection-level changes observers would have been told
    /// about: one per append and one per bulk replacement.
    pub fn notifications(&self) -> u64 {
        self.notifications
    }

    /// Records that have not been destroyed.
    pub fn active(&self) -> Vec<NodeRef> {
        self.nodes
            .iter()
            .filter(|node| !node.is_destroyed())
            .cloned()
            .collect()
    }

    fn push(&mut self, node: NodeRef) {
        self.nodes.push(node);
        self.notifications += 1;
    }

    fn replace_all(&mut self, nodes: Vec<NodeRef>) {
        self.nodes = nodes;
        self.notifications += 1;
    }

    /// Merges `incoming` into the set by name.
    ///
    /// Known names are updated in place, new names are appended and names
    /// missing from `incoming` are destroyed.  All removals from one pass are
    /// applied with a single replacement.  If a name occurs more than once in
    /// `incoming` the last occurrence wins.
    pub fn reconcile(&mut self, incoming: &[NodeDescription]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        let mut index: HashMap<String, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name(), i))
            .collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(incoming.len());

        for desc in incoming {
            let duplicate = !seen.insert(desc.name.as_str());
            if duplicate {
                outcome.duplicates += 1;
                warn!(
                    "{} cluster snapshot lists node {} more than once; keeping the last entry",
                    self.label, desc.name
                );
            }

            match index.get(&desc.name) {
                Some(&i) => {
                    self.nodes[i].set_properties(desc);
                    if !duplicate {
                        outcome.updated += 1;
                    }
                }
                None => {
                    index.insert(desc.name.clone(), self.nodes.len());
                    self.push(NodeRecord::new(desc.clone()));
                    outcome.added += 1;
                }
            }
        }

        let mut survivors = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if seen.contains(node.name().as_str()) {
                survivors.push(node.clone());
            } else {
                node.destroy();
                outcome.removed += 1;
            }
        }

        if outcome.removed > 0 {
            self.replace_all(survivors);
            outcome.replaced = true;
        }

        debug!(
            "reconciled {} cluster: {} added, {} updated, {} removed",
            self.label, outcome.added, outcome.updated, outcome.removed
        );
        outcome
    }
}
