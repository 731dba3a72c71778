//! Wire types for the `/admin/cluster` endpoint.
//!
//! The endpoint answers with an envelope of the form
//! `{ "cluster": { "current": [...], "staged": [...] } }`.  `staged` is
//! either a list of node descriptions or one of two marker strings,
//! `"ring_not_ready"` and `"legacy"`, when no plan can be reported.
//!
//! Node descriptions are deliberately loose: only `name` is required.
//! Any other field that is missing, `null`, the string `"undefined"` or of
//! the wrong type simply stays `None`, so one odd node never costs the rest
//! of the snapshot.

use std::fmt;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Membership status of a node as reported by the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Joining,
    Valid,
    Leaving,
    Exiting,
    Down,
    /// Any status string this watcher does not know about.
    Other(String),
}

impl NodeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NodeStatus::Joining => "joining",
            NodeStatus::Valid => "valid",
            NodeStatus::Leaving => "leaving",
            NodeStatus::Exiting => "exiting",
            NodeStatus::Down => "down",
            NodeStatus::Other(s) => s,
        }
    }
}

impl From<String> for NodeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "joining" => NodeStatus::Joining,
            "valid" => NodeStatus::Valid,
            "leaving" => NodeStatus::Leaving,
            "exiting" => NodeStatus::Exiting,
            "down" => NodeStatus::Down,
            _ => NodeStatus::Other(s),
        }
    }
}

impl From<&str> for NodeStatus {
    fn from(s: &str) -> Self {
        NodeStatus::from(s.to_string())
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(NodeStatus::from)
    }
}

/// One cluster member as described by a snapshot.
///
/// `name` is the identity key; two descriptions with the same name refer
/// to the same node across polls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    /// Share of the ring owned by the node, in `[0, 1]`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ring_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mem_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mem_used: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mem_erlang: Option<f64>,
    /// Planned action for a staged node (e.g. `"leave"`).
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Node taking over this node's partitions, if it is being replaced.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// Decodes an optional field, treating unusable values as absent.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.as_str() == Some("undefined") {
        return Ok(None);
    }
    Ok(T::deserialize(value).ok())
}

impl NodeDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<NodeStatus>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_reachable(mut self, reachable: bool) -> Self {
        self.reachable = Some(reachable);
        self
    }
}

/// The staged half of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedCluster {
    Nodes(Vec<NodeDescription>),
    /// The ring cannot report a coherent plan yet.
    RingNotReady,
    /// The cluster speaks an older protocol with no plan support.
    Legacy,
}

/// A validated snapshot, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSnapshot {
    pub current: Vec<NodeDescription>,
    pub staged: StagedCluster,
}

impl ClusterSnapshot {
    pub fn new(current: Vec<NodeDescription>, staged: StagedCluster) -> Self {
        Self { current, staged }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCluster {
    #[serde(default)]
    pub current: Option<Value>,
    #[serde(default)]
    pub staged: Option<Value>,
}

/// Body of `GET /admin/cluster`, decoded without assuming its shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClusterResponse {
    #[serde(default)]
    pub cluster: Option<RawCluster>,
}

/// Decodes a node list entry by entry; entries without a usable `name`
/// cannot be keyed and are dropped.
fn node_list(section: &str, entries: Vec<Value>) -> Vec<NodeDescription> {
    entries
        .into_iter()
        .filter_map(|entry| match NodeDescription::deserialize(&entry) {
            Ok(desc) => Some(desc),
            Err(e) => {
                warn!("Dropping {} node entry {}: {}", section, entry, e);
                None
            }
        })
        .collect()
}

impl ClusterResponse {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(Error::Decode)
    }

    /// Checks the envelope shape and resolves the staged markers.
    pub fn into_snapshot(self) -> Result<ClusterSnapshot> {
        let cluster = self
            .cluster
            .ok_or_else(|| Error::MalformedSnapshot("missing `cluster`".into()))?;
        let current = match cluster.current {
            Some(Value::Array(entries)) => node_list("current", entries),
            Some(other) => {
                return Err(Error::MalformedSnapshot(format!(
                    "`cluster.current` is not a list: {}",
                    other
                )))
            }
            None => {
                return Err(Error::MalformedSnapshot("missing `cluster.current`".into()));
            }
        };
        let staged = match cluster.staged {
            Some(Value::Array(entries)) => StagedCluster::Nodes(node_list("staged", entries)),
            Some(Value::String(marker)) => match marker.as_str() {
                "ring_not_ready" => StagedCluster::RingNotReady,
                "legacy" => StagedCluster::Legacy,
                other => {
                    return Err(Error::MalformedSnapshot(format!(
                        "unknown staged marker {:?}",
                        other
                    )))
                }
            },
            Some(other) => {
                return Err(Error::MalformedSnapshot(format!(
                    "`cluster.staged` is neither a list nor a marker: {}",
                    other
                )))
            }
            None => {
                return Err(Error::MalformedSnapshot("missing `cluster.staged`".into()));
            }
        };
        Ok(ClusterSnapshot { current, staged })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<ClusterSnapshot> {
        ClusterResponse::from_json(&value.to_string())?.into_snapshot()
    }

    #[test]
    fn decodes_full_node_description() {
        let snapshot = decode(json!({
            "cluster": {
                "current": [{
                    "name": "riak@10.0.0.1",
                    "reachable": true,
                    "status": "valid",
                    "ring_pct": 0.25,
                    "mem_total": 8192,
                    "mem_used": 4096,
                    "mem_erlang": 1024
                }],
                "staged": [{
                    "name": "riak@10.0.0.1",
                    "status": "leaving",
                    "action": "leave",
                    "replacement": "riak@10.0.0.2"
                }]
            }
        }))
        .unwrap();

        let node = &snapshot.current[0];
        assert_eq!(node.name, "riak@10.0.0.1");
        assert_eq!(node.reachable, Some(true));
        assert_eq!(node.status, Some(NodeStatus::Valid));
        assert_eq!(node.ring_pct, Some(0.25));
        assert_eq!(node.mem_total, Some(8192.0));

        match snapshot.staged {
            StagedCluster::Nodes(ref staged) => {
                assert_eq!(staged[0].action.as_deref(), Some("leave"));
                assert_eq!(staged[0].replacement.as_deref(), Some("riak@10.0.0.2"));
                assert_eq!(staged[0].reachable, None);
            }
            ref other => panic!("unexpected staged value: {:?}", other),
        }
    }

    #[test]
    fn resolves_staged_markers() {
        let ring = decode(json!({"cluster": {"current": [], "staged": "ring_not_ready"}})).unwrap();
        assert_eq!(ring.staged, StagedCluster::RingNotReady);

        let legacy = decode(json!({"cluster": {"current": [], "staged": "legacy"}})).unwrap();
        assert_eq!(legacy.staged, StagedCluster::Legacy);
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let snapshot = decode(json!({
            "cluster": {"current": [{"name": "a", "status": "bootstrapping"}], "staged": []}
        }))
        .unwrap();
        assert_eq!(
            snapshot.current[0].status,
            Some(NodeStatus::Other("bootstrapping".into()))
        );
        assert_eq!(snapshot.current[0].status.as_ref().unwrap().as_str(), "bootstrapping");
    }

    #[test]
    fn missing_sections_are_malformed() {
        for body in [
            json!({}),
            json!({"cluster": {"staged": []}}),
            json!({"cluster": {"current": []}}),
            json!({"cluster": {"current": [], "staged": "half_ready"}}),
        ] {
            match decode(body.clone()) {
                Err(Error::MalformedSnapshot(_)) => {}
                other => panic!("{} decoded to {:?}", body, other),
            }
        }
    }

    #[test]
    fn odd_fields_do_not_sink_the_snapshot() {
        let snapshot = decode(json!({
            "cluster": {
                "current": [
                    {"name": "a", "reachable": true, "status": "valid", "ring_pct": 0.5},
                    {
                        "name": "b",
                        "reachable": "yes",
                        "status": 7,
                        "ring_pct": "undefined",
                        "mem_total": "undefined",
                        "mem_used": null,
                        "mem_erlang": {"bytes": 12}
                    },
                    {"status": "valid"}
                ],
                "staged": [
                    {"name": "b", "action": "undefined", "replacement": "undefined"},
                    {"name": "c", "action": "join"}
                ]
            }
        }))
        .unwrap();

        assert_eq!(snapshot.current.len(), 2);
        assert_eq!(snapshot.current[0].ring_pct, Some(0.5));
        assert_eq!(snapshot.current[1], NodeDescription::new("b"));

        match snapshot.staged {
            StagedCluster::Nodes(ref staged) => {
                assert_eq!(staged[0], NodeDescription::new("b"));
                assert_eq!(staged[1].action.as_deref(), Some("join"));
            }
            ref other => panic!("unexpected staged value: {:?}", other),
        }
    }

    #[test]
    fn non_list_sections_are_malformed() {
        for body in [
            json!({"cluster": {"current": {"name": "a"}, "staged": []}}),
            json!({"cluster": {"current": [], "staged": 3}}),
        ] {
            assert!(matches!(decode(body), Err(Error::MalformedSnapshot(_))));
        }
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        assert!(matches!(
            ClusterResponse::from_json("{\"cluster\": "),
            Err(Error::Decode(_))
        ));
    }
}
