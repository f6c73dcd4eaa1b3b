// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An ordered sequence of links between two switches, and its structural invariants (§4.1).

use crate::errors::PathError;
use id::Id;
use topology::{Link, LinkStatus, Switch, Topology};
use tracing::warn;

/// Rolled-up operational status of a [`Path`], mirroring [`LinkStatus`] but adding the
/// empty/disabled case from §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// No links: the path slot is unused.
    Disabled,
    /// Every link is up and every endpoint's `current_link` back-reference agrees with it.
    Up,
    /// At least one link is down, or a back-reference has drifted.
    Down,
}

/// An ordered sequence of links a circuit is (or may be) carried over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    links: Vec<Id<Link>>,
}

impl Path {
    /// An empty (disabled) path.
    #[must_use]
    pub fn empty() -> Self {
        Self { links: Vec::new() }
    }

    #[must_use]
    pub fn new(links: Vec<Id<Link>>) -> Self {
        Self { links }
    }

    #[must_use]
    pub fn links(&self) -> &[Id<Link>] {
        &self.links
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Every switch visited by this path, in order: `switch_a`, each transit switch, `switch_z`.
    fn switches_in_order(&self, topology: &Topology) -> Option<Vec<Id<Switch>>> {
        let mut out = Vec::with_capacity(self.links.len() + 1);
        let first = topology.links.get(*self.links.first()?)?;
        out.push(topology.switch_of(first.endpoint_a())?.id());
        for link_id in &self.links {
            let link = topology.links.get(*link_id)?;
            out.push(topology.switch_of(link.endpoint_b())?.id());
        }
        Some(out)
    }

    /// Enforce the four structural invariants from §3/§4.1:
    ///
    /// 1. Consecutive links share exactly one switch (the transit switch).
    /// 2. No switch appears twice (no loops).
    /// 3. The path starts at `switch_a` and ends at `switch_z`.
    /// 4. Unless `scheduled` (a path hint not yet installed), every link is currently bound at
    ///    both endpoints: the endpoint interface's `current_link` equals the link itself.
    pub fn is_valid(
        &self,
        topology: &Topology,
        switch_a: Id<Switch>,
        switch_z: Id<Switch>,
        scheduled: bool,
    ) -> Result<(), PathError> {
        if self.links.is_empty() {
            return Err(PathError::InvalidPath("path has no links".to_string()));
        }

        let switches = self
            .switches_in_order(topology)
            .ok_or_else(|| PathError::InvalidPath("path references an unknown link".to_string()))?;

        if switches.first().copied() != Some(switch_a) || switches.last().copied() != Some(switch_z) {
            return Err(PathError::InvalidPath(
                "path does not connect the expected switches".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for switch in &switches {
            if !seen.insert(*switch) {
                return Err(PathError::InvalidPath(
                    "path visits the same switch twice".to_string(),
                ));
            }
        }

        if !scheduled {
            for link_id in &self.links {
                let link = topology
                    .links
                    .get(*link_id)
                    .ok_or_else(|| PathError::InvalidPath("path references an unknown link".to_string()))?;
                for endpoint in [link.endpoint_a(), link.endpoint_b()] {
                    let iface = topology.interfaces.get(endpoint).ok_or_else(|| {
                        PathError::InvalidPath("path references an unknown interface".to_string())
                    })?;
                    if iface.current_link() != Some(*link_id) {
                        return Err(PathError::InvalidPath(format!(
                            "link {link_id} is not currently bound at interface {}",
                            iface.interface_id()
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Roll up this path's status from its links' statuses and back-references, per §3.
    #[must_use]
    pub fn status(&self, topology: &Topology) -> PathStatus {
        if self.links.is_empty() {
            return PathStatus::Disabled;
        }

        for link_id in &self.links {
            let Some(link) = topology.links.get(*link_id) else {
                return PathStatus::Down;
            };
            if link.status() != LinkStatus::Up {
                return PathStatus::Down;
            }
            for endpoint in [link.endpoint_a(), link.endpoint_b()] {
                let Some(iface) = topology.interfaces.get(endpoint) else {
                    return PathStatus::Down;
                };
                if iface.current_link() != Some(*link_id) {
                    return PathStatus::Down;
                }
            }
        }
        PathStatus::Up
    }

    /// Allocate a service VLAN on each link of this path.
    ///
    /// On the first link with no free tag, every tag already taken on this path is released
    /// before returning `NoTagAvailable`, so the caller never needs to track partial success.
    pub fn choose_vlans(&self, topology: &Topology) -> Result<(), PathError> {
        for (i, link_id) in self.links.iter().enumerate() {
            let Some(link) = topology.links.get(*link_id) else {
                self.release_prefix(topology, i);
                return Err(PathError::InvalidPath(format!(
                    "path references unknown link {link_id}"
                )));
            };
            if link.choose_vlan().is_none() {
                self.release_prefix(topology, i);
                return Err(PathError::NoTagAvailable(link_id.to_string()));
            }
        }
        Ok(())
    }

    fn release_prefix(&self, topology: &Topology, up_to: usize) {
        for link_id in &self.links[..up_to] {
            if let Some(link) = topology.links.get(*link_id) {
                link.make_vlan_available();
            }
        }
    }

    /// Release the service VLAN allocated on every link of this path.
    ///
    /// Tolerant of links that never had a tag allocated, or that no longer resolve in the
    /// topology: both are reported at `warn` level, matching the idempotent-release rule in §5.
    pub fn make_vlans_available(&self, topology: &Topology) {
        for link_id in &self.links {
            match topology.links.get(*link_id) {
                Some(link) => link.make_vlan_available(),
                None => warn!(%link_id, "releasing vlan on a link no longer in the topology"),
            }
        }
    }

    /// Parse a path finder hop list (`[if_id, sw_id, if_id, sw_id, if_id, ...]`) back into a
    /// `Path` of already-registered links.
    ///
    /// Mirrors the source's `_clear_path`/`create_path` pairing: interface ids are identified by
    /// string length (wire interface ids run longer than 23 characters, switch dpids do not), and
    /// consecutive interface ids are paired two at a time into transit links.
    pub fn from_hops(topology: &Topology, hops: &[String]) -> Result<Self, PathError> {
        let interface_ids: Vec<&str> = hops
            .iter()
            .map(String::as_str)
            .filter(|hop| hop.len() > 23)
            .collect();

        if interface_ids.is_empty() || interface_ids.len() % 2 != 0 {
            return Err(PathError::MalformedHops(format!(
                "expected an even, non-zero number of interface hops, got {}",
                interface_ids.len()
            )));
        }

        let mut links = Vec::with_capacity(interface_ids.len() / 2);
        for pair in interface_ids.chunks_exact(2) {
            let [a_wire, b_wire] = pair else {
                unreachable!("chunks_exact(2) always yields pairs")
            };
            let a = topology.interfaces.find_by_wire_id(a_wire).ok_or_else(|| {
                PathError::MalformedHops(format!("unknown interface id {a_wire}"))
            })?;
            let b = topology.interfaces.find_by_wire_id(b_wire).ok_or_else(|| {
                PathError::MalformedHops(format!("unknown interface id {b_wire}"))
            })?;
            let link = topology.links.find_by_endpoints(a, b).ok_or_else(|| {
                PathError::MalformedHops(format!("no registered link between {a_wire} and {b_wire}"))
            })?;
            links.push(link);
        }

        Ok(Self::new(links))
    }
}
