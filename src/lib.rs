//! Cluster topology watcher.
//!
//! Polls a cluster-management endpoint and keeps an identity-preserving
//! model of the current and planned membership, from which a dashboard
//! view-state is derived after every poll.

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod node;
pub mod node_set;
pub mod render;
pub mod source;
pub mod types;
pub mod view;

pub use error::{Error, Result};
