// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Concurrent registries mapping stable ids to live topology objects.
//!
//! This is the arena half of the "arena + stable ids" replacement for the source's cyclic
//! object graph (see the crate docs): every [`Switch`], [`Interface`] and [`Link`] lives here,
//! reference-counted, and every other part of the workspace carries an [`id::Id`] rather than a
//! borrowed or owning pointer into this table.

use crate::interface::Interface;
use crate::link::Link;
use crate::switch::Switch;
use dashmap::DashMap;
use id::Id;
use std::sync::Arc;

/// Registry of switches keyed by their stable id.
#[derive(Debug, Default)]
pub struct SwitchRegistry(DashMap<Id<Switch>, Arc<Switch>>);

impl SwitchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, switch: Switch) -> Id<Switch> {
        let id = switch.id();
        self.0.insert(id, Arc::new(switch));
        id
    }

    #[must_use]
    pub fn get(&self, id: Id<Switch>) -> Option<Arc<Switch>> {
        self.0.get(&id).map(|entry| Arc::clone(&entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Registry of interfaces keyed by their stable id, with a secondary index by wire-format id
/// for resolving path finder hops (§6) back into registered interfaces.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    by_id: DashMap<Id<Interface>, Arc<Interface>>,
    by_wire_id: DashMap<String, Id<Interface>>,
}

impl InterfaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, interface: Interface) -> Id<Interface> {
        let id = interface.id();
        self.by_wire_id
            .insert(interface.interface_id().to_string(), id);
        self.by_id.insert(id, Arc::new(interface));
        id
    }

    #[must_use]
    pub fn get(&self, id: Id<Interface>) -> Option<Arc<Interface>> {
        self.by_id.get(&id).map(|entry| Arc::clone(&entry))
    }

    /// Resolve a wire-format interface id (e.g. from a path finder hop) to its registered id.
    #[must_use]
    pub fn find_by_wire_id(&self, wire_id: &str) -> Option<Id<Interface>> {
        self.by_wire_id.get(wire_id).map(|entry| *entry)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Registry of links keyed by their stable id.
#[derive(Debug, Default)]
pub struct LinkRegistry(DashMap<Id<Link>, Arc<Link>>);

impl LinkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, link: Link) -> Id<Link> {
        let id = link.id();
        self.0.insert(id, Arc::new(link));
        id
    }

    #[must_use]
    pub fn get(&self, id: Id<Link>) -> Option<Arc<Link>> {
        self.0.get(&id).map(|entry| Arc::clone(&entry))
    }

    /// Every link whose endpoints include `interface`.
    #[must_use]
    pub fn links_on_interface(&self, interface: Id<Interface>) -> Vec<Arc<Link>> {
        self.0
            .iter()
            .filter(|entry| entry.has_endpoint(interface))
            .map(|entry| Arc::clone(&entry))
            .collect()
    }

    /// The link directly connecting `a` and `b`, if one is registered (order-insensitive).
    #[must_use]
    pub fn find_by_endpoints(&self, a: Id<Interface>, b: Id<Interface>) -> Option<Id<Link>> {
        self.0
            .iter()
            .find(|entry| entry.has_endpoint(a) && entry.has_endpoint(b))
            .map(|entry| entry.id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The full topology: switches, interfaces and links, each in its own registry.
#[derive(Debug, Default)]
pub struct Topology {
    pub switches: SwitchRegistry,
    pub interfaces: InterfaceRegistry,
    pub links: LinkRegistry,
}

impl Topology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The switch an interface belongs to, resolved in one hop.
    #[must_use]
    pub fn switch_of(&self, interface: Id<Interface>) -> Option<Arc<Switch>> {
        let iface = self.interfaces.get(interface)?;
        self.switches.get(iface.switch())
    }
}
