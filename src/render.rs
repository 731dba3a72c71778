//! Plain-text rendering of the cluster view.

use std::fmt::Write;

use crate::view::{ClusterViewState, CurrentNodeView, StagedNodeView};

pub fn render(view: &ClusterViewState) -> String {
    let mut out = String::new();

    if view.ring_not_ready {
        out.push_str("! ring not ready, the planned cluster cannot be shown yet\n");
    }
    if view.legacy {
        out.push_str("! legacy cluster, planned changes are not supported\n");
    }

    let _ = writeln!(out, "Current cluster ({} nodes)", view.active_current.len());
    for node in view.current_views() {
        out.push_str(&current_row(&node));
        out.push('\n');
    }

    if view.display_plan {
        let _ = writeln!(out, "Planned cluster ({} nodes)", view.active_staged.len());
        for node in view.staged_views() {
            out.push_str(&staged_row(&node));
            out.push('\n');
        }
    }
    out
}

fn status_str(status: &Option<crate::types::NodeStatus>) -> &str {
    status.as_ref().map(|s| s.as_str()).unwrap_or("-")
}

fn ring_str(pct: Option<f64>) -> String {
    pct.map(|p| format!("{:.1}%", p)).unwrap_or_else(|| "-".into())
}

fn current_row(node: &CurrentNodeView) -> String {
    let mut row = format!(
        "  [{:<6}] {:<32} {:<8} ring {:>6}",
        node.light.as_str(),
        node.name,
        status_str(&node.status),
        ring_str(node.ring_pct_readable)
    );
    if let Some(mem) = &node.memory {
        let (erlang, other, free) = mem.bar_widths();
        let _ = write!(row, "  mem erlang {}% other {}% free {}%", erlang, other, free);
    }
    row
}

fn staged_row(node: &StagedNodeView) -> String {
    let mut row = format!(
        "  [{:<6}] {:<32} {:<8} ring {:>6}",
        node.light.as_str(),
        node.name,
        status_str(&node.status),
        ring_str(node.ring_pct_readable)
    );
    if node.is_action() {
        let _ = write!(row, "  action {}", node.action.as_deref().unwrap_or_default());
    }
    if node.is_replaced() {
        let _ = write!(
            row,
            "  replaced by {}",
            node.replacement.as_deref().unwrap_or_default()
        );
    }
    row
}
