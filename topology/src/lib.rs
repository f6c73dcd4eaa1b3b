// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch, interface and link registries for the EVC lifecycle and path protection engine.
//!
//! The source this workspace is distilled from keeps cyclic references between links,
//! interfaces and switches (an interface points at its switch and at the link currently bound to
//! it; a link points back at its two endpoint interfaces). A systems language collapses that
//! object graph into an arena plus stable ids: every [`Switch`], [`Interface`] and [`Link`] is
//! keyed by an [`id::Id`] in a registry, and code resolves those ids back to live state through
//! the registry rather than holding owning back-pointers.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub mod errors;
pub mod interface;
pub mod link;
pub mod registry;
pub mod switch;
pub mod uni;

pub use errors::TopologyError;
pub use interface::{Interface, InterfaceStatus};
pub use link::{Link, LinkStatus, VlanPool};
pub use registry::{InterfaceRegistry, LinkRegistry, SwitchRegistry, Topology};
pub use switch::Switch;
pub use uni::{Uni, UserTag};

use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_topology", LevelFilter::INFO, &["topology"]);
