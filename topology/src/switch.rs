// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The OpenFlow switch (datapath) a flow mod targets.

use id::Id;
use parking_lot::RwLock;

/// An OpenFlow switch, identified by its datapath id (dpid).
#[derive(Debug)]
pub struct Switch {
    id: Id<Switch>,
    /// Wire-format datapath id, e.g. `"00:00:00:00:00:00:00:01"`.
    dpid: String,
    enabled: RwLock<bool>,
}

impl Switch {
    /// Register a new switch with the given wire-format dpid.
    #[must_use]
    pub fn new(dpid: impl Into<String>) -> Self {
        Self {
            id: Id::new(),
            dpid: dpid.into(),
            enabled: RwLock::new(true),
        }
    }

    #[must_use]
    pub fn id(&self) -> Id<Switch> {
        self.id
    }

    #[must_use]
    pub fn dpid(&self) -> &str {
        &self.dpid
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        *self.enabled.read()
    }

    /// Registered switches live behind an `Arc` in [`crate::registry::SwitchRegistry`], so this
    /// takes `&self` rather than `&mut self` like [`crate::interface::Interface::set_status`].
    pub fn set_enabled(&self, enabled: bool) {
        *self.enabled.write() = enabled;
    }
}
