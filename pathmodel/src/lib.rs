// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Path validity, VLAN allocation and disjoint-path ranking for the EVC lifecycle engine (§4.1,
//! §4.2, §4.7).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub mod disjoint;
pub mod errors;
pub mod path;
pub mod vlan;

pub use disjoint::{disjoint_paths, shared_links, CandidatePath, RankedPath};
pub use errors::PathError;
pub use path::{Path, PathStatus};
pub use vlan::{mask_list, MaskEntry};

use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_pathmodel", LevelFilter::INFO, &["pathmodel"]);
