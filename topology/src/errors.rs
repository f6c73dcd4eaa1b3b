// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors raised while resolving or mutating topology state.

use thiserror::Error;

/// Failures resolving or mutating registered topology objects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("switch {0} is not registered")]
    UnknownSwitch(String),
    #[error("interface {0} is not registered")]
    UnknownInterface(String),
    #[error("link {0} is not registered")]
    UnknownLink(String),
    #[error("switch {0} is disabled")]
    DisabledSwitch(String),
}
