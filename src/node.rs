//! Live node records.
//!
//! A [`NodeRecord`] is created the first time a node name shows up in a
//! snapshot and is then updated in place for as long as the name keeps
//! appearing.  Observers hold [`NodeRef`] handles, so any state they attach
//! to a record (an expanded row, a selection) survives every poll.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::NodeDescription;

pub type NodeRef = Arc<NodeRecord>;

#[derive(Debug)]
pub struct NodeRecord {
    fields: RwLock<NodeDescription>,
    destroyed: AtomicBool,
}

impl NodeRecord {
    pub fn new(desc: NodeDescription) -> NodeRef {
        Arc::new(Self {
            fields: RwLock::new(desc),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    /// Consistent copy of every field.
    pub fn description(&self) -> NodeDescription {
        self.read().clone()
    }

    /// Overwrites every field from `desc` under a single write lock, so
    /// readers never see a half-applied update.
    pub fn set_properties(&self, desc: &NodeDescription) {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        *fields = desc.clone();
    }

    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, NodeDescription> {
        self.fields.read().unwrap_or_else(PoisonError::into_inner)
    }
}
