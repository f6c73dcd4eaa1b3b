// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Outbound events published to the event bus collaborator (§6).

use flowbuilder::EvcId;
use topology::Uni;

/// A minimal snapshot of an EVC carried on every outbound event, per §6 ("each content object
/// including `evc_id, id, name, metadata, active, enabled, uni_a, uni_z`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvcSnapshot {
    pub evc_id: EvcId,
    pub name: String,
    pub active: bool,
    pub enabled: bool,
    pub uni_a: Uni,
    pub uni_z: Uni,
}

/// The outbound event names enumerated in §6, each carrying the EVC snapshot it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvcEvent {
    /// `mef_eline.deployed`
    Deployed(EvcSnapshot),
    /// `mef_eline.undeployed`
    Undeployed(EvcSnapshot),
    /// `mef_eline.failover_deployed`
    FailoverDeployed(EvcSnapshot),
    /// `mef_eline.failover_link_down`
    FailoverLinkDown(EvcSnapshot),
    /// `mef_eline.failover_old_path`
    FailoverOldPath(EvcSnapshot),
    /// `mef_eline.redeployed_link_down`
    RedeployedLinkDown(EvcSnapshot),
    /// `mef_eline.error_redeploy_link_down`
    ErrorRedeployLinkDown(EvcSnapshot),
    /// `mef_eline.need_redeploy`
    NeedRedeploy(EvcSnapshot),
    /// `mef_eline.evcs_loaded`, emitted once at boot with the number of EVCs loaded.
    EvcsLoaded(usize),
}
