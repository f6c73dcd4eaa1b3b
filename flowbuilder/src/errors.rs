// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors raised while translating an EVC and its path into flow mods.

use thiserror::Error;

/// Failures turning an `(Evc, Path)` pair into switch-indexed flow mods (§4.3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowBuildError {
    /// Both UNIs carry a `TAGRange` tag but with differently-sized mask lists, so no
    /// element-wise translation between them is possible for the intra-switch case.
    #[error("uni_a and uni_z tag range mask lists have different lengths ({0} vs {1})")]
    TagRangeLengthMismatch(usize, usize),
    /// A UNI or path endpoint interface is not registered in the topology.
    #[error("unknown interface {0}")]
    UnknownInterface(String),
    /// A link referenced by the path is not registered in the topology.
    #[error("unknown link {0}")]
    UnknownLink(String),
    /// A path link has no service VLAN allocated; `choose_vlans` must run before building flows.
    #[error("link {0} has no service vlan allocated")]
    NoServiceVlan(String),
    /// The path is empty but the two UNIs are not on the same switch (or vice versa).
    #[error("path topology does not match uni placement: {0}")]
    PathUniMismatch(String),
}
