// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Retrying HTTP implementations of `mefeline-core`'s collaborator traits: the path finder, the
//! flow manager, and the data-plane trace service (§4.4, §4.9, §6).
//!
//! `mefeline-core` never depends on this crate; `mefeline-svc` constructs these clients and
//! hands them to the engine as trait objects, matching the "engine depends on traits, the binary
//! wires concrete collaborators in" split the launch site in `mgmt/src/processor/launch.rs`
//! follows for its own gRPC/HTTP clients.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

mod flowmanager;
mod pathfinder;
mod retry;
mod tracer;
mod wire;

pub use flowmanager::HttpFlowManager;
pub use pathfinder::HttpPathFinder;
pub use tracer::HttpTracer;

use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_dispatcher", LevelFilter::INFO, &["dispatcher"]);
