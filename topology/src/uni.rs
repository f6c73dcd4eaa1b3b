// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The User-Network Interface: an interface plus the customer tag it is expected to carry.

use crate::interface::Interface;
use id::Id;

/// The tag a customer's frames are expected to carry at a UNI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserTag {
    /// A single VLAN id in `1..=4094`.
    Tagged(u16),
    /// Wire `vlan 0`: the customer sends untagged frames.
    Untagged,
    /// Wire OXM match `4096/4096`: any VLAN (or none) is accepted.
    Any,
    /// A sorted list of non-overlapping inclusive `[lo, hi]` ranges.
    ///
    /// The minimal `vlan/mask` covering set for these ranges is derived on demand by
    /// `pathmodel::vlan::mask_list`, not stored here, so that the mask-list algorithm has a
    /// single home.
    Ranges(Vec<(u16, u16)>),
}

impl UserTag {
    /// Build a `Ranges` tag, sorting the given ranges by lower bound.
    ///
    /// Callers are expected to supply non-overlapping ranges (an invariant owned by the REST
    /// layer this workspace does not implement); this only normalizes ordering.
    #[must_use]
    pub fn ranges(mut ranges: Vec<(u16, u16)>) -> Self {
        ranges.sort_unstable_by_key(|(lo, _)| *lo);
        Self::Ranges(ranges)
    }

    /// Whether this tag is the `any` sentinel.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, UserTag::Any)
    }

    /// Whether this tag is the `untagged` sentinel.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        matches!(self, UserTag::Untagged)
    }
}

/// A User-Network Interface: the edge port where a customer attaches, with the tag their
/// frames are expected to carry (or `None` for "no user tag configured").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uni {
    interface: Id<Interface>,
    tag: Option<UserTag>,
}

impl Uni {
    #[must_use]
    pub fn new(interface: Id<Interface>, tag: Option<UserTag>) -> Self {
        Self { interface, tag }
    }

    #[must_use]
    pub fn interface(&self) -> Id<Interface> {
        self.interface
    }

    #[must_use]
    pub fn tag(&self) -> Option<&UserTag> {
        self.tag.as_ref()
    }
}
