// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The EVC lifecycle and path protection engine (§3–§9): the `Evc` aggregate, the deploy/
//! redeploy/undeploy/failover-setup primitives, the bulk link-down pipeline, the link-up
//! handler, the periodic consistency loop, and the event router tying them to the topology and
//! flow manager's notifications.
//!
//! This crate depends only on the narrow async trait boundary in [`collaborators`] — never on
//! `reqwest` or any transport detail — so the whole engine can be exercised against in-memory
//! fakes (see `test_support`, test builds only). `mefeline-dispatcher` supplies the production
//! implementations, and `mefeline-svc` wires the two together.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub mod collaborators;
pub mod consistency;
pub mod deploy;
pub mod errors;
pub mod evc;
pub mod events;
pub mod linkdown;
pub mod linkup;
pub mod router;

#[cfg(test)]
mod test_support;

pub use collaborators::{EventBus, FlowManager, PathConstraints, PathFinder, Persist, Tracer};
pub use deploy::Deployer;
pub use errors::{EvcError, EvcResult};
pub use evc::{CircuitSchedule, Evc, EvcMutable, LifecycleFlags};
pub use events::{EvcEvent, EvcSnapshot};
pub use router::EventRouter;

use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_core", LevelFilter::INFO, &["core"]);
