// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A physical connection between two switches, and the service-VLAN pool it owns (§5).

use crate::interface::Interface;
use id::Id;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use tracing::warn;

/// Operational status of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Up,
    Down,
    Disabled,
}

/// The full range of valid 802.1Q service VLAN tags (`1..=4094`; `0` and `4095` are reserved).
const FIRST_VLAN: u16 = 1;
const LAST_VLAN: u16 = 4094;

/// A link's pool of free service VLANs.
///
/// Allocation and release are mediated entirely by this type so that concurrent EVCs contending
/// for the same link's tags never race: every public method takes `&self` and serializes through
/// an internal lock, matching the "the link mediates all concurrent EVCs" rule in §5.
#[derive(Debug)]
pub struct VlanPool {
    free: Mutex<BTreeSet<u16>>,
}

impl Default for VlanPool {
    fn default() -> Self {
        Self::new()
    }
}

impl VlanPool {
    /// A pool with the full `1..=4094` range available.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: Mutex::new((FIRST_VLAN..=LAST_VLAN).collect()),
        }
    }

    /// Allocate and return the lowest-numbered free tag, or `None` if the pool is exhausted.
    pub fn allocate_next(&self) -> Option<u16> {
        let mut free = self.free.lock();
        let tag = *free.iter().next()?;
        free.remove(&tag);
        Some(tag)
    }

    /// Return `tag` to the pool.
    ///
    /// A double release is not an error: it is reported at `warn` level and otherwise ignored,
    /// matching the idempotent-release rule in §5.
    pub fn release(&self, tag: u16) {
        let mut free = self.free.lock();
        if !free.insert(tag) {
            warn!(tag, "vlan tag released twice on the same link");
        }
    }

    /// Number of tags currently free, for tests and diagnostics.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}

/// A link between two switches (a "transit" edge in a path), with the mutable metadata a path
/// needs while it is active: its observed status and the service VLAN allocated to it, if any.
#[derive(Debug)]
pub struct Link {
    id: Id<Link>,
    endpoint_a: Id<Interface>,
    endpoint_b: Id<Interface>,
    status: RwLock<LinkStatus>,
    vlan_pool: VlanPool,
    s_vlan: RwLock<Option<u16>>,
}

impl Link {
    #[must_use]
    pub fn new(endpoint_a: Id<Interface>, endpoint_b: Id<Interface>) -> Self {
        Self {
            id: Id::new(),
            endpoint_a,
            endpoint_b,
            status: RwLock::new(LinkStatus::Up),
            vlan_pool: VlanPool::new(),
            s_vlan: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn id(&self) -> Id<Link> {
        self.id
    }

    #[must_use]
    pub fn endpoint_a(&self) -> Id<Interface> {
        self.endpoint_a
    }

    #[must_use]
    pub fn endpoint_b(&self) -> Id<Interface> {
        self.endpoint_b
    }

    /// Whether `interface` is one of this link's two endpoints.
    #[must_use]
    pub fn has_endpoint(&self, interface: Id<Interface>) -> bool {
        self.endpoint_a == interface || self.endpoint_b == interface
    }

    #[must_use]
    pub fn status(&self) -> LinkStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: LinkStatus) {
        *self.status.write() = status;
    }

    #[must_use]
    pub fn vlan_pool(&self) -> &VlanPool {
        &self.vlan_pool
    }

    /// The service VLAN currently allocated to this link by whichever EVC owns it, if any.
    #[must_use]
    pub fn s_vlan(&self) -> Option<u16> {
        *self.s_vlan.read()
    }

    /// Allocate the next free tag from this link's pool and record it as the link's `s_vlan`.
    pub fn choose_vlan(&self) -> Option<u16> {
        let tag = self.vlan_pool.allocate_next()?;
        *self.s_vlan.write() = Some(tag);
        Some(tag)
    }

    /// Release the link's allocated `s_vlan`, if any, back to the pool.
    pub fn make_vlan_available(&self) {
        if let Some(tag) = self.s_vlan.write().take() {
            self.vlan_pool.release(tag);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pool_allocates_lowest_first() {
        let pool = VlanPool::new();
        assert_eq!(pool.allocate_next(), Some(1));
        assert_eq!(pool.allocate_next(), Some(2));
        assert_eq!(pool.available(), (LAST_VLAN - FIRST_VLAN + 1) as usize - 2);
    }

    #[test]
    fn pool_exhausts() {
        let pool = VlanPool::new();
        for _ in FIRST_VLAN..=LAST_VLAN {
            pool.allocate_next().unwrap();
        }
        assert_eq!(pool.allocate_next(), None);
    }

    #[test]
    fn double_release_is_tolerated() {
        let pool = VlanPool::new();
        let tag = pool.allocate_next().unwrap();
        pool.release(tag);
        pool.release(tag);
        assert_eq!(pool.available(), (LAST_VLAN - FIRST_VLAN + 1) as usize);
    }
}
