// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The narrow async trait boundary (§4.10) between the lifecycle engine and the services the
//! distilled spec treats as external collaborators: the path finder, the flow manager, the
//! data-plane trace service, the document store, and the event bus.
//!
//! `mefeline-core` depends only on these traits, never on `reqwest` or any transport detail, so
//! the full lifecycle engine can be exercised with in-memory fakes (see `crate::test_support` in
//! test builds). `mefeline-dispatcher` provides the retrying HTTP implementations used in
//! production.

use crate::errors::{FlowModError, PathFinderError, PersistError, TraceError};
use crate::events::EvcEvent;
use crate::evc::Evc;
use async_trait::async_trait;
use derive_builder::Builder;
use flowbuilder::FlowMod;
use id::Id;
use pathmodel::CandidatePath;
use std::collections::HashMap;
use topology::Switch;

/// The opaque cost/metric maps passed to the path finder (§3's `primary_constraints` /
/// `secondary_constraints`), plus the `spf_attribute` cost attribute they are requested under.
#[derive(Builder, Debug, Clone, Default, PartialEq)]
#[builder(default)]
pub struct PathConstraints {
    /// Cost attribute requested from the path finder (`spf_attribute`), if this constraint set
    /// overrides the process-wide default.
    pub spf_attribute: Option<String>,
    /// Link metrics the path finder must satisfy exactly.
    pub mandatory_metrics: HashMap<String, serde_json::Value>,
    /// Link metrics the path finder should prefer but may relax.
    pub flexible_metrics: HashMap<String, serde_json::Value>,
    /// `(link_id, s_vlan)` pairs recently freed by a redeploy, which the caller would prefer the
    /// path finder avoid reusing (§4.9's "wait for old path" rule).
    pub avoid_recently_used: Vec<(String, u16)>,
}

/// The map of switch-indexed flow mods a single install or delete call carries (§4.4, §6).
pub type FlowBatch = HashMap<Id<Switch>, Vec<FlowMod>>;

/// Finds candidate paths between two switches, subject to a constraint set (§6).
#[async_trait]
pub trait PathFinder: Send + Sync {
    /// Request up to `max_paths` candidates from `source` to `destination`.
    async fn find_paths(
        &self,
        source: &str,
        destination: &str,
        max_paths: u32,
        constraints: &PathConstraints,
    ) -> Result<Vec<CandidatePath>, PathFinderError>;
}

/// Installs and removes flow mods on the data plane (§4.4, §6).
#[async_trait]
pub trait FlowManager: Send + Sync {
    /// Install every flow in `batch` as a single request carrying the whole switch-indexed map
    /// (§4.4: "the dispatcher sends the whole batch in one request").
    async fn install(&self, batch: &FlowBatch) -> Result<(), FlowModError>;
    /// Delete every flow in `batch` matching its cookie/cookie_mask.
    async fn delete(&self, batch: &FlowBatch) -> Result<(), FlowModError>;
}

/// One step reported by the trace service for a single probe (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStepKind {
    Starting,
    Intermediary,
    Last,
    Loop,
}

/// The `out` field of a trace step, present when the trace service reports the egress
/// port/VLAN a frame would leave on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOut {
    pub port: u32,
    pub vlan: Option<u16>,
}

/// One hop reported back by the trace service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub dpid: String,
    pub port: u32,
    pub kind: TraceStepKind,
    pub vlan: Option<u16>,
    pub out: Option<TraceOut>,
}

/// A request to trace one `(dpid, in_port, vlan)` starting point (§6, §4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceProbe {
    pub dpid: String,
    pub in_port: u32,
    pub vlan: Option<u16>,
}

/// Runs data-plane traces used by the consistency loop to verify installed flows match intent
/// (§4.9, §6).
#[async_trait]
pub trait Tracer: Send + Sync {
    /// Trace every probe in one bulk call, returning one ordered step list per probe.
    async fn trace(&self, probes: &[TraceProbe]) -> Result<Vec<Vec<TraceStep>>, TraceError>;
}

/// Persists an EVC's current state, matching the idempotent upsert contract of §6
/// (`find_one_and_update`/`$set`/`$setOnInsert`).
#[async_trait]
pub trait Persist: Send + Sync {
    async fn upsert(&self, evc: &Evc) -> Result<(), PersistError>;
}

/// Publishes the outbound events named in §6.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: EvcEvent);
}
