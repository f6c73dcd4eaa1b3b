// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Wire-shaped types for a single flow mod (§4.3, §6) and the inputs needed to build one.

use id::Id;
use pathmodel::Path;
use serde::Serialize;
use topology::Uni;

/// Marker type disambiguating an EVC's [`id::Id`] without this crate depending on `mefeline-core`
/// (which depends on this crate). `mefeline-core::Evc` uses this same alias for its own id so the
/// two line up without either crate needing to name the other's concrete type.
pub struct EvcMarker;

/// An EVC's stable id, as seen from the flow builder.
pub type EvcId = Id<EvcMarker>;

/// A VLAN value as it appears in a flow's match or in a `set_vlan`/`push_vlan` action.
///
/// Unifies the four cases enumerated in §3/§4.3 (no tag configured, untagged, any, a specific
/// tag or tag-range mask entry) so the match/action derivation in [`crate::build`] can treat them
/// uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlanTag {
    /// No user tag is configured at all (wire: the `dl_vlan` match is omitted).
    Unset,
    /// Wire `vlan 0`: the customer sends untagged frames.
    Untagged,
    /// Wire OXM match `4096/4096`: any VLAN (or none) is accepted.
    Any,
    /// A single VLAN id.
    Single(u16),
    /// A `vlan/mask` OXM match covering a power-of-two-aligned block of VLAN ids.
    Masked { vlan: u16, mask: u16 },
}

impl VlanTag {
    /// The three sentinel values the action-chain rules in §4.3 special-case (`S` in the spec
    /// text): no tag configured, untagged, or any.
    #[must_use]
    pub fn is_special(self) -> bool {
        matches!(self, VlanTag::Unset | VlanTag::Untagged | VlanTag::Any)
    }
}

impl From<pathmodel::MaskEntry> for VlanTag {
    fn from(entry: pathmodel::MaskEntry) -> Self {
        match entry {
            pathmodel::MaskEntry::Single(vlan) => VlanTag::Single(vlan),
            pathmodel::MaskEntry::Masked { vlan, mask } => VlanTag::Masked { vlan, mask },
        }
    }
}

impl Serialize for VlanTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match *self {
            VlanTag::Unset => serializer.serialize_none(),
            VlanTag::Untagged => serializer.serialize_u16(0),
            VlanTag::Any => serializer.serialize_str("4096/4096"),
            VlanTag::Single(vlan) => serializer.serialize_u16(vlan),
            VlanTag::Masked { vlan, mask } => serializer.serialize_str(&format!("{vlan}/{mask}")),
        }
    }
}

/// The operator-visible tag expected at a UNI, expanded into one [`VlanTag`] per flow this UNI
/// needs (more than one only for `TAGRange`, via [`pathmodel::mask_list`]).
#[must_use]
pub fn tags_for_uni(uni: &Uni) -> Vec<VlanTag> {
    match uni.tag() {
        None => vec![VlanTag::Unset],
        Some(topology::UserTag::Untagged) => vec![VlanTag::Untagged],
        Some(topology::UserTag::Any) => vec![VlanTag::Any],
        Some(topology::UserTag::Tagged(vlan)) => vec![VlanTag::Single(*vlan)],
        Some(topology::UserTag::Ranges(ranges)) => {
            pathmodel::mask_list(ranges).into_iter().map(VlanTag::from).collect()
        }
    }
}

/// One step of an OpenFlow action chain (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum FlowAction {
    /// Strip the outermost 802.1Q tag.
    PopVlan,
    /// Push a new 802.1Q tag (ethertype `0x8100`).
    PushVlan,
    /// Rewrite the 802.1Q tag to `vlan`.
    SetVlan {
        #[serde(rename = "vlan_id")]
        vlan: VlanTag,
    },
    /// Send the frame out `port`.
    Output { port: u32 },
    /// Annotate the output with a queue id (the only QoS enforcement this engine does, per §1).
    SetQueue { queue_id: u32 },
}

/// A flow's match fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowMatch {
    pub in_port: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_vlan: Option<VlanTag>,
}

/// Which of the EVC's two flow tables (§3's `table_group` mapping) a flow belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableGroup {
    Evpl,
    Epl,
}

/// The EVC-level `table_group` mapping (`{evpl: table_id, epl: table_id}`) from §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableGroupIds {
    pub evpl: u8,
    pub epl: u8,
}

impl TableGroupIds {
    #[must_use]
    pub fn resolve(self, group: TableGroup) -> u8 {
        match group {
            TableGroup::Evpl => self.evpl,
            TableGroup::Epl => self.epl,
        }
    }
}

/// The `EPL_SB_PRIORITY`/`EVPL_SB_PRIORITY`/`ANY_SB_PRIORITY`/`UNTAGGED_SB_PRIORITY` constants
/// (§6), looked up by `get_priority(v_src)` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priorities {
    pub epl: u16,
    pub untagged: u16,
    pub any: u16,
    pub evpl: u16,
}

impl Priorities {
    /// `get_priority(v)`: `None → EPL`; `0 → UNTAGGED`; `"4096/4096" → ANY`; any specific tag (or
    /// mask entry) → EVPL.
    #[must_use]
    pub fn get_priority(self, tag: VlanTag) -> u16 {
        match tag {
            VlanTag::Unset => self.epl,
            VlanTag::Untagged => self.untagged,
            VlanTag::Any => self.any,
            VlanTag::Single(_) | VlanTag::Masked { .. } => self.evpl,
        }
    }
}

/// A single flow mod, as produced by [`crate::build::build_flows`] and consumed by
/// `mefeline-dispatcher`'s flow manager client (§4.3, §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowMod {
    #[serde(rename = "match")]
    pub match_: FlowMatch,
    pub actions: Vec<FlowAction>,
    pub cookie: u64,
    pub priority: u16,
    pub owner: &'static str,
    pub table_id: u8,
    pub table_group: TableGroup,
}

/// Cookie high byte fixed for every flow this engine installs (§3): `0xaa00…`.
pub const COOKIE_PREFIX: u64 = 0xaa00_0000_0000_0000;

/// `cookie = 0xaa00_0000_0000_0000 | e.id_low56` (§3).
#[must_use]
pub fn cookie_for(evc_id: EvcId) -> u64 {
    let low = evc_id.as_raw().as_u128() as u64;
    COOKIE_PREFIX | (low & 0x00ff_ffff_ffff_ffff)
}

/// All inputs needed to translate one EVC's current placement into flow mods.
#[derive(Debug, Clone)]
pub struct EvcFlowSpec {
    pub evc_id: EvcId,
    pub uni_a: Uni,
    pub uni_z: Uni,
    /// Empty for an intra-switch EVC; otherwise the ordered links between `uni_a` and `uni_z`.
    pub path: Path,
    /// `None` means "unset" (the EVC's `-1` sentinel from §3 translated at the boundary).
    pub queue_id: Option<u32>,
    pub table_group: TableGroupIds,
    pub priorities: Priorities,
    /// Operator override replacing the computed `get_priority` result, if set.
    pub sb_priority: Option<u16>,
}
