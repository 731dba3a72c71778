//! Derived view-state handed to renderers.
//!
//! Everything here is a pure function of a [`ClusterContext`]; it is
//! recomputed after every reconcile pass rather than tracked incrementally.

use crate::context::ClusterContext;
use crate::node::NodeRef;
use crate::types::{NodeDescription, NodeStatus};

#[derive(Debug, Clone, Default)]
pub struct ClusterViewState {
    pub active_current: Vec<NodeRef>,
    pub active_staged: Vec<NodeRef>,
    pub ring_not_ready: bool,
    pub legacy: bool,
    /// Placeholder for an asynchronous loading indicator; always `false`.
    pub is_loading: bool,
    pub display_plan: bool,
}

impl ClusterViewState {
    pub fn derive(ctx: &ClusterContext) -> Self {
        let active_current = ctx.current.active();
        let active_staged = ctx.staged.active();
        let is_loading = false;
        let display_plan =
            plan_visible(is_loading, ctx.ring_not_ready, ctx.legacy, active_staged.len());

        Self {
            active_current,
            active_staged,
            ring_not_ready: ctx.ring_not_ready,
            legacy: ctx.legacy,
            is_loading,
            display_plan,
        }
    }

    pub fn current_views(&self) -> Vec<CurrentNodeView> {
        self.active_current
            .iter()
            .map(|node| CurrentNodeView::new(&node.description()))
            .collect()
    }

    pub fn staged_views(&self) -> Vec<StagedNodeView> {
        self.active_staged
            .iter()
            .map(|node| StagedNodeView::new(&node.description()))
            .collect()
    }
}

/// Whether the planned cluster should be shown at all.
pub fn plan_visible(is_loading: bool, ring_not_ready: bool, legacy: bool, staged: usize) -> bool {
    !is_loading && !ring_not_ready && !legacy && staged > 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorLight {
    Red,
    Orange,
    Green,
    Grey,
}

impl IndicatorLight {
    pub fn for_node(reachable: Option<bool>, status: Option<&NodeStatus>) -> Self {
        if reachable == Some(false) {
            return IndicatorLight::Red;
        }
        match status {
            Some(NodeStatus::Leaving) | Some(NodeStatus::Joining) => IndicatorLight::Orange,
            Some(NodeStatus::Valid) => IndicatorLight::Green,
            _ => IndicatorLight::Grey,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorLight::Red => "red",
            IndicatorLight::Orange => "orange",
            IndicatorLight::Green => "green",
            IndicatorLight::Grey => "grey",
        }
    }
}

/// Memory figures normalised to a 0-100 scale of `mem_total`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    /// One percent of total memory, in the node's units.
    pub divider: f64,
    pub erlang_ceil: i64,
    pub non_erlang: i64,
    /// Unnormalised free memory.
    pub free: f64,
    pub free_readable: i64,
    pub used_readable: i64,
}

impl MemoryUsage {
    pub fn compute(total: Option<f64>, used: Option<f64>, erlang: Option<f64>) -> Option<Self> {
        let (total, used, erlang) = (total?, used?, erlang?);
        if !(total > 0.0) {
            return None;
        }

        let divider = total / 100.0;
        let erlang_ceil = (erlang / divider).ceil();
        let non_erlang = (used / divider - erlang_ceil).round();
        let free = total - used;

        Some(Self {
            divider,
            erlang_ceil: erlang_ceil as i64,
            non_erlang: non_erlang as i64,
            free,
            free_readable: (free / divider).round() as i64,
            used_readable: ((total - free) / divider).round() as i64,
        })
    }

    /// Bar widths in percent: erlang, other processes, free.
    pub fn bar_widths(&self) -> (i64, i64, i64) {
        (self.erlang_ceil, self.non_erlang, self.free_readable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentNodeView {
    pub name: String,
    pub status: Option<NodeStatus>,
    pub light: IndicatorLight,
    pub ring_pct_readable: Option<f64>,
    pub memory: Option<MemoryUsage>,
}

impl CurrentNodeView {
    pub fn new(desc: &NodeDescription) -> Self {
        Self {
            name: desc.name.clone(),
            status: desc.status.clone(),
            light: IndicatorLight::for_node(desc.reachable, desc.status.as_ref()),
            ring_pct_readable: desc.ring_pct.map(|pct| pct * 100.0),
            memory: MemoryUsage::compute(desc.mem_total, desc.mem_used, desc.mem_erlang),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedNodeView {
    pub name: String,
    pub status: Option<NodeStatus>,
    pub light: IndicatorLight,
    pub ring_pct_readable: Option<f64>,
    pub action: Option<String>,
    pub replacement: Option<String>,
}

impl StagedNodeView {
    /// Planned rows are lit by status alone; reachability only describes the
    /// current cluster.
    pub fn new(desc: &NodeDescription) -> Self {
        Self {
            name: desc.name.clone(),
            status: desc.status.clone(),
            light: IndicatorLight::for_node(None, desc.status.as_ref()),
            ring_pct_readable: desc.ring_pct.map(|pct| pct * 100.0),
            action: desc.action.clone(),
            replacement: desc.replacement.clone(),
        }
    }

    pub fn is_replaced(&self) -> bool {
        self.replacement.is_some()
    }

    pub fn is_action(&self) -> bool {
        self.action.is_some()
    }
}
