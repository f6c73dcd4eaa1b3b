// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Translates an EVC's placement on the topology into the flow mods each touched switch needs
//! (§4.3).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub mod build;
pub mod errors;
pub mod model;

pub use build::build_flows;
pub use errors::FlowBuildError;
pub use model::{
    cookie_for, tags_for_uni, EvcFlowSpec, EvcId, EvcMarker, FlowAction, FlowMatch, FlowMod,
    Priorities, TableGroup, TableGroupIds, VlanTag, COOKIE_PREFIX,
};

use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_flowbuilder", LevelFilter::INFO, &["flowbuilder"]);
