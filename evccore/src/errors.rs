// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The EVC-level error enum (§7), aggregating the lower-crate errors plus the EVC-specific
//! variants the distilled spec names by semantic kind rather than by type name.

use thiserror::Error;

/// The path finder collaborator is unreachable, or returned an error response, after retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathFinderError {
    #[error("path finder request failed: {0}")]
    Transport(String),
    #[error("path finder returned an error response: {0}")]
    Response(String),
}

/// The flow manager collaborator rejected an install or delete batch, after retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowModError {
    #[error("flow manager request failed: {0}")]
    Transport(String),
    #[error("flow manager rejected the batch: {0}")]
    Response(String),
}

/// The trace collaborator is unreachable, or returned an error response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("trace request failed: {0}")]
    Transport(String),
    #[error("trace service returned an error response: {0}")]
    Response(String),
}

/// The document-store collaborator failed to persist an EVC.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("persisting evc {0} failed: {1}")]
    Write(String, String),
}

/// Failures raised while driving an EVC through its lifecycle (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvcError {
    /// The path fails one of the structural invariants in §4.1: rejected operator input or a
    /// stale hint. Not retried.
    #[error(transparent)]
    InvalidPath(#[from] pathmodel::PathError),
    /// The path finder is unreachable or erroring after retries; the caller treats this as
    /// "no path" and tries the next candidate or constraint set.
    #[error(transparent)]
    PathFinder(#[from] PathFinderError),
    /// The dispatcher failed to install or delete a batch after retries; the caller marks the
    /// EVC inactive, rolls back any partial install, and emits a failure event.
    #[error(transparent)]
    FlowMod(#[from] FlowModError),
    /// A UNI switch or interface is disabled; deploy is blocked until an operator re-enables it.
    #[error("switch or interface {0} is disabled")]
    DisabledSwitch(String),
    /// Preconditions for activation are not met (a UNI is down, or the current path is not up).
    /// Not an error at the deploy level: the EVC simply stays inactive.
    #[error("activation preconditions not met: {0}")]
    ActivationError(String),
    /// The flow builder could not translate this EVC's placement into flow mods.
    #[error(transparent)]
    FlowBuild(#[from] flowbuilder::FlowBuildError),
    /// The document store rejected a persist call.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The operation is a no-op because the EVC is archived (a terminal state).
    #[error("evc {0} is archived")]
    Archived(String),
    /// The operation is a no-op because another mutation already holds the EVC's lock.
    #[error("evc {0} is locked by a concurrent operation")]
    Locked(String),
}

/// Convenience alias for EVC-lifecycle operations.
pub type EvcResult<T> = Result<T, EvcError>;
