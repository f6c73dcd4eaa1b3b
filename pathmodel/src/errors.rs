// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors raised while validating a path or allocating its service VLANs.

use thiserror::Error;

/// Failures validating a [`crate::path::Path`] or allocating its VLANs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path fails one of the structural invariants in §4.1: a missing transit switch, a
    /// repeated switch (loop), a stale (unbound) link, or a last link that does not reach the
    /// destination switch.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A link along the path has no free service VLAN left to allocate.
    #[error("no service vlan tag available on link {0}")]
    NoTagAvailable(String),
    /// A raw hop list from the path finder could not be parsed back into a path (odd length,
    /// or an interface id the topology does not recognize).
    #[error("could not parse path finder hops into a path: {0}")]
    MalformedHops(String),
}
