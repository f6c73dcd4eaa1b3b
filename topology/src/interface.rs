// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network-facing or user-facing port on a [`Switch`](crate::switch::Switch).

use crate::link::Link;
use crate::switch::Switch;
use id::Id;
use parking_lot::RwLock;

/// Operational status of an interface, mirroring the status rollup used for links and paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceStatus {
    Up,
    Down,
    Disabled,
}

/// A switch port: the UNI/NNI attachment point flows are installed against.
///
/// The `current_link` field is the arena's replacement for the source's cyclic
/// `interface.link` back-reference: it names the link this interface currently believes is
/// bound to it, as reported by the topology/event bus. Path validity (§4.1) compares this
/// against the link a `Path` was computed with, to detect a stale path.
#[derive(Debug)]
pub struct Interface {
    id: Id<Interface>,
    /// Wire-format interface id, e.g. `"00:00:00:00:00:00:00:01:2"`.
    interface_id: String,
    switch: Id<Switch>,
    port_number: u32,
    status: RwLock<InterfaceStatus>,
    current_link: RwLock<Option<Id<Link>>>,
}

impl Interface {
    #[must_use]
    pub fn new(interface_id: impl Into<String>, switch: Id<Switch>, port_number: u32) -> Self {
        Self {
            id: Id::new(),
            interface_id: interface_id.into(),
            switch,
            port_number,
            status: RwLock::new(InterfaceStatus::Up),
            current_link: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn id(&self) -> Id<Interface> {
        self.id
    }

    #[must_use]
    pub fn interface_id(&self) -> &str {
        &self.interface_id
    }

    #[must_use]
    pub fn switch(&self) -> Id<Switch> {
        self.switch
    }

    #[must_use]
    pub fn port_number(&self) -> u32 {
        self.port_number
    }

    #[must_use]
    pub fn status(&self) -> InterfaceStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: InterfaceStatus) {
        *self.status.write() = status;
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status() == InterfaceStatus::Up
    }

    /// The link this interface currently believes it is bound to, if any.
    #[must_use]
    pub fn current_link(&self) -> Option<Id<Link>> {
        *self.current_link.read()
    }

    /// Record that the topology/event bus reports `link` as bound to this interface (or `None`
    /// if the interface was unbound).
    pub fn set_current_link(&self, link: Option<Id<Link>>) {
        *self.current_link.write() = link;
    }
}
