// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The deploy / redeploy / undeploy / setup-failover primitives over a single EVC (§4.5),
//! grounded on the teacher crate's validate-then-build-then-apply pipeline shape
//! (`mgmt/src/processor/proc.rs`'s `new_gw_config`): each entry point acquires the EVC's
//! try-lock, validates it should run at all, builds the flow batch, dispatches it, and only
//! then mutates and persists state.

use crate::collaborators::{EventBus, FlowBatch, FlowManager, PathConstraints, PathFinder, Persist};
use crate::errors::{EvcError, EvcResult};
use crate::events::EvcEvent;
use crate::evc::{Evc, EvcMutable};
use chrono::Utc;
use flowbuilder::{EvcFlowSpec, Priorities, TableGroupIds};
use id::Id;
use pathmodel::Path;
use std::collections::HashMap;
use std::sync::Arc;
use topology::{Switch, Topology};
use tracectl::trace_target;
use tracing::{debug, info, warn};

trace_target!("mefeline_core_deploy", tracing::level_filters::LevelFilter::INFO, &["evccore"]);

/// Candidate paths considered per constraint set before giving up (§4.5 does not name an
/// explicit bound; this mirrors the disjoint-path cutoff used for failover discovery, §6).
const DEFAULT_MAX_PATHS: u32 = 10;

/// Drives a single EVC through deploy/redeploy/undeploy/failover-setup against the collaborator
/// traits in `crate::collaborators`.
pub struct Deployer {
    topology: Arc<Topology>,
    path_finder: Arc<dyn PathFinder>,
    flow_manager: Arc<dyn FlowManager>,
    event_bus: Arc<dyn EventBus>,
    persist: Arc<dyn Persist>,
    priorities: Priorities,
    /// `DISJOINT_PATH_CUTOFF` (§6): the number of candidates requested from the path finder when
    /// provisioning a failover path (§4.7). `0` means no candidates are ever requested, so
    /// `setup_failover_path` always yields an empty disjoint generator (§8).
    disjoint_path_cutoff: u32,
}

impl Deployer {
    #[must_use]
    pub fn new(
        topology: Arc<Topology>,
        path_finder: Arc<dyn PathFinder>,
        flow_manager: Arc<dyn FlowManager>,
        event_bus: Arc<dyn EventBus>,
        persist: Arc<dyn Persist>,
        priorities: Priorities,
        disjoint_path_cutoff: u32,
    ) -> Self {
        Self {
            topology,
            path_finder,
            flow_manager,
            event_bus,
            persist,
            priorities,
            disjoint_path_cutoff,
        }
    }

    fn flow_spec(&self, evc: &Evc, state: &EvcMutable, path: Path) -> EvcFlowSpec {
        EvcFlowSpec {
            evc_id: evc.id(),
            uni_a: evc.uni_a().clone(),
            uni_z: evc.uni_z().clone(),
            path,
            queue_id: state.queue_id,
            table_group: evc.table_group(),
            priorities: self.priorities,
            sb_priority: evc.sb_priority(),
        }
    }

    pub(crate) async fn persist_and_emit(
        &self,
        evc: &Evc,
        event: impl FnOnce(crate::events::EvcSnapshot) -> EvcEvent,
    ) {
        if let Err(err) = self.persist.upsert(evc).await {
            warn!(evc_id = %evc.id(), %err, "failed to persist evc after state transition");
        }
        if let Some(snapshot) = evc.snapshot_event() {
            self.event_bus.publish(event(snapshot));
        }
    }

    /// `deploy(evc)`: discover a path (or use `evc`'s pinned preferences) and deploy to it.
    pub async fn deploy(&self, evc: &Evc) -> EvcResult<bool> {
        self.deploy_to_path(evc, None).await
    }

    /// `deploy_to_path(path_hint?)` (§4.5).
    pub async fn deploy_to_path(&self, evc: &Evc, path_hint: Option<Path>) -> EvcResult<bool> {
        self.run_deploy(evc, path_hint, EvcEvent::Deployed).await
    }

    /// Re-attempts deploy for an EVC the link-down pipeline previously undeployed (§4.6: "so the
    /// redeployer can later find a fresh path"), grounded on the original `handle_link_down`'s
    /// true/false outcome (`handle_evc_affected_by_link_down`'s `redeployed_link_down`/
    /// `error_redeploy_link_down` split): a candidate found and installed is reported as
    /// `RedeployedLinkDown` rather than `Deployed`, so the two ways an EVC becomes active again
    /// are distinguishable on the event bus (§6); exhausting every candidate reports
    /// `ErrorRedeployLinkDown`, the failure counterpart, instead of silently returning `false`.
    pub async fn redeploy_after_link_down(&self, evc: &Evc) -> EvcResult<bool> {
        match self.run_deploy(evc, None, EvcEvent::RedeployedLinkDown).await {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.persist_and_emit(evc, EvcEvent::ErrorRedeployLinkDown).await;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn run_deploy(
        &self,
        evc: &Evc,
        path_hint: Option<Path>,
        event: impl FnOnce(crate::events::EvcSnapshot) -> EvcEvent,
    ) -> EvcResult<bool> {
        let mut guard = evc
            .try_lock()
            .ok_or_else(|| EvcError::Locked(evc.id().to_string()))?;

        if guard.flags.archived {
            return Err(EvcError::Archived(evc.id().to_string()));
        }
        self.check_uni_switches_enabled(evc)?;
        if !guard.should_deploy(path_hint.as_ref()) {
            return Ok(false);
        }

        if evc.is_intra_switch(&self.topology) {
            self.install_direct_uni_flows(evc, &mut guard).await?;
            self.try_activate(evc, &mut guard, true);
            drop(guard);
            self.persist_and_emit(evc, event).await;
            return Ok(true);
        }

        let candidates = self.candidate_paths(evc, path_hint).await?;
        if self.try_candidates(evc, &mut guard, candidates).await? {
            drop(guard);
            self.persist_and_emit(evc, event).await;
            return Ok(true);
        }
        Ok(false)
    }

    /// Like `deploy`, but queries the path finder with `avoid` folded into the primary
    /// constraints' `avoid_recently_used` list (§4.9's "wait for old path" rule: the consistency
    /// loop passes the `(link_id, s_vlan)` pairs a redeploy just released, so the path finder can
    /// be asked to prefer not reusing them). Used only by the consistency loop; ordinary deploys
    /// go through `deploy`/`deploy_to_path`.
    pub(crate) async fn deploy_avoiding(&self, evc: &Evc, avoid: &[(String, u16)]) -> EvcResult<bool> {
        let mut guard = evc
            .try_lock()
            .ok_or_else(|| EvcError::Locked(evc.id().to_string()))?;

        if guard.flags.archived {
            return Err(EvcError::Archived(evc.id().to_string()));
        }
        self.check_uni_switches_enabled(evc)?;
        if !guard.should_deploy(None) {
            return Ok(false);
        }

        if evc.is_intra_switch(&self.topology) {
            self.install_direct_uni_flows(evc, &mut guard).await?;
            self.try_activate(evc, &mut guard, true);
            drop(guard);
            self.persist_and_emit(evc, EvcEvent::Deployed).await;
            return Ok(true);
        }

        let mut constraints = evc.primary_constraints().clone();
        constraints.avoid_recently_used = avoid.to_vec();
        let switch_a = self.switch_a(evc)?;
        let switch_z = self.switch_z(evc)?;
        let source = self.dpid(switch_a)?;
        let destination = self.dpid(switch_z)?;
        let candidates = self.query_path_finder(&source, &destination, &constraints).await?;

        if self.try_candidates(evc, &mut guard, candidates).await? {
            drop(guard);
            self.persist_and_emit(evc, EvcEvent::Deployed).await;
            return Ok(true);
        }
        Ok(false)
    }

    /// Shared candidate-trial loop for `deploy_to_path` and `deploy_avoiding`: validates, chooses
    /// vlans, builds flows and dispatches an install for each candidate in turn, stopping at the
    /// first success. On `NoTagAvailable` or a validity failure it releases nothing (no tags were
    /// taken yet) and tries the next candidate; on a build or dispatch failure it releases the
    /// tags this candidate took and aborts entirely, matching §4.5's "on dispatch failure...
    /// abort" (no further candidates are tried once the dispatcher itself has rejected a batch).
    async fn try_candidates(&self, evc: &Evc, guard: &mut EvcMutable, candidates: Vec<Path>) -> EvcResult<bool> {
        let switch_a = self.switch_a(evc)?;
        let switch_z = self.switch_z(evc)?;

        for candidate in candidates {
            if candidate.is_valid(&self.topology, switch_a, switch_z, true).is_err() {
                continue;
            }

            if let Err(err) = candidate.choose_vlans(&self.topology) {
                debug!(evc_id = %evc.id(), %err, "candidate path exhausted its service vlans, trying next");
                continue;
            }

            let spec = self.flow_spec(evc, guard, candidate.clone());
            let batch = match flowbuilder::build_flows(&self.topology, &spec) {
                Ok(batch) => batch,
                Err(err) => {
                    candidate.make_vlans_available(&self.topology);
                    return Err(EvcError::FlowBuild(err));
                }
            };

            match self.flow_manager.install(&batch).await {
                Ok(()) => {
                    guard.current_path = candidate;
                    self.try_activate(evc, guard, false);
                    return Ok(true);
                }
                Err(err) => {
                    candidate.make_vlans_available(&self.topology);
                    warn!(evc_id = %evc.id(), %err, "dispatcher rejected deploy install, aborting");
                    return Err(EvcError::FlowMod(err));
                }
            }
        }

        Ok(false)
    }

    /// `setup_failover_path` (§4.5): eligible only for inter-switch EVCs that allow dynamic
    /// discovery and have neither pinned path set.
    pub async fn setup_failover_path(&self, evc: &Evc) -> EvcResult<bool> {
        let mut guard = evc
            .try_lock()
            .ok_or_else(|| EvcError::Locked(evc.id().to_string()))?;

        if guard.flags.archived {
            return Err(EvcError::Archived(evc.id().to_string()));
        }
        self.check_uni_switches_enabled(evc)?;
        if evc.is_intra_switch(&self.topology)
            || !evc.dynamic_backup_path()
            || !guard.primary_path.is_empty()
            || !guard.backup_path.is_empty()
            || !guard.failover_path.is_empty()
        {
            return Ok(false);
        }

        if self.disjoint_path_cutoff == 0 {
            return Ok(false);
        }

        let switch_a = self.switch_a(evc)?;
        let switch_z = self.switch_z(evc)?;
        let unwanted_hops = path_to_hops(&self.topology, &guard.current_path, switch_a).unwrap_or_default();

        let raw = self
            .path_finder
            .find_paths(
                &self.dpid(switch_a)?,
                &self.dpid(switch_z)?,
                self.disjoint_path_cutoff,
                evc.primary_constraints(),
            )
            .await?;

        for ranked in pathmodel::disjoint_paths(&self.topology, &unwanted_hops, &raw) {
            let candidate = ranked.path;
            if candidate.is_valid(&self.topology, switch_a, switch_z, true).is_err() {
                continue;
            }
            if candidate.choose_vlans(&self.topology).is_err() {
                continue;
            }

            let spec = self.flow_spec(evc, &guard, candidate.clone());
            let batch = match flowbuilder::build_flows(&self.topology, &spec) {
                Ok(batch) => nni_only(batch, switch_a, switch_z),
                Err(err) => {
                    candidate.make_vlans_available(&self.topology);
                    return Err(EvcError::FlowBuild(err));
                }
            };

            match self.flow_manager.install(&batch).await {
                Ok(()) => {
                    guard.failover_path = candidate;
                    drop(guard);
                    self.persist_and_emit(evc, EvcEvent::FailoverDeployed).await;
                    return Ok(true);
                }
                Err(err) => {
                    candidate.make_vlans_available(&self.topology);
                    debug!(evc_id = %evc.id(), %err, "failover candidate install rejected, trying next");
                }
            }
        }

        Ok(false)
    }

    /// `remove_current_flows` (§4.5): delete every installed flow for `evc`, release the
    /// service VLANs `current_path` held, and deactivate. Returns the released `(link, vlan)`
    /// pairs so a caller (e.g. the consistency loop's redeploy) can avoid reusing them.
    pub async fn remove_current_flows(
        &self,
        evc: &Evc,
        guard: &mut EvcMutable,
    ) -> EvcResult<HashMap<Id<topology::Link>, u16>> {
        let released = vlan_map(&self.topology, &guard.current_path);
        if !guard.current_path.is_empty() {
            let spec = self.flow_spec(evc, guard, guard.current_path.clone());
            let batch = flowbuilder::build_flows(&self.topology, &spec)?;
            self.flow_manager.delete(&batch).await?;
        }
        guard.current_path.make_vlans_available(&self.topology);
        guard.current_path = Path::empty();
        guard.deactivate(Utc::now());
        guard.last_flow_removal = Some(Utc::now());
        Ok(released)
    }

    /// `remove_failover_flows(exclude_uni_switches)` (§4.5). When `exclude_uni_switches` is
    /// true the two UNI switches are omitted from the delete batch (the failover never had UNI
    /// flows installed, per `setup_failover_path`'s "skip UNI ingress" rule); when false (used
    /// after a swap-to-failover promoted the old `current_path` into this slot) the full batch,
    /// UNI legs included, is deleted.
    pub async fn remove_failover_flows(
        &self,
        evc: &Evc,
        guard: &mut EvcMutable,
        exclude_uni_switches: bool,
    ) -> EvcResult<()> {
        if guard.failover_path.is_empty() {
            return Ok(());
        }
        let spec = self.flow_spec(evc, guard, guard.failover_path.clone());
        let mut batch = flowbuilder::build_flows(&self.topology, &spec)?;
        if exclude_uni_switches {
            let switch_a = self.switch_a(evc)?;
            let switch_z = self.switch_z(evc)?;
            batch.remove(&switch_a);
            batch.remove(&switch_z);
        }
        self.flow_manager.delete(&batch).await?;
        guard.failover_path.make_vlans_available(&self.topology);
        guard.failover_path = Path::empty();
        Ok(())
    }

    /// Promote `failover_path` into `current_path` (§4.6, case A): delete the old current's NNI
    /// flows (its UNI legs still carry traffic until this call returns), install the promoted
    /// path's full flow set — including the UNI-ingress pair that was deliberately skipped when
    /// the failover was first provisioned — and swap the two slots. The old `current_path` ends
    /// up sitting in `failover_path`, still holding its s_vlan allocations, for the link-down
    /// pipeline's next stage to clear.
    pub(crate) async fn swap_to_failover(&self, evc: &Evc, guard: &mut EvcMutable) -> EvcResult<()> {
        let switch_a = self.switch_a(evc)?;
        let switch_z = self.switch_z(evc)?;

        let delete_spec = self.flow_spec(evc, guard, guard.current_path.clone());
        let delete_batch = nni_only(flowbuilder::build_flows(&self.topology, &delete_spec)?, switch_a, switch_z);

        let install_spec = self.flow_spec(evc, guard, guard.failover_path.clone());
        let install_batch = flowbuilder::build_flows(&self.topology, &install_spec)?;

        if !delete_batch.is_empty() {
            self.flow_manager.delete(&delete_batch).await?;
        }
        self.flow_manager.install(&install_batch).await?;

        let old_current = std::mem::replace(&mut guard.current_path, guard.failover_path.clone());
        guard.failover_path = old_current;
        Ok(())
    }

    /// Re-checks activation preconditions without touching any flow (§4.8: "if the UNI interface
    /// itself came up, retry activation"). A no-op, not an error, if the EVC is archived, locked,
    /// or simply not yet ready to activate.
    pub async fn retry_activation(&self, evc: &Evc) -> EvcResult<()> {
        let Some(mut guard) = evc.try_lock() else {
            return Ok(());
        };
        if guard.flags.archived {
            return Ok(());
        }
        let intra_switch = evc.is_intra_switch(&self.topology);
        self.try_activate(evc, &mut guard, intra_switch);
        drop(guard);
        if let Err(err) = self.persist.upsert(evc).await {
            warn!(evc_id = %evc.id(), %err, "failed to persist evc after activation retry");
        }
        Ok(())
    }

    /// Persist `evc`'s current state without touching any flow or flag — used by the
    /// consistency loop after a check that leaves the EVC's lifecycle state unchanged (§4.9
    /// step 3's "either way persist").
    pub(crate) async fn persist_upsert(&self, evc: &Evc) -> Result<(), crate::errors::PersistError> {
        self.persist.upsert(evc).await
    }

    /// Archive: requires every path slot already empty (the caller must have undeployed and
    /// cleared failover first), per §3/§4.5.
    pub async fn archive(&self, evc: &Evc) -> EvcResult<()> {
        let mut guard = evc
            .try_lock()
            .ok_or_else(|| EvcError::Locked(evc.id().to_string()))?;
        guard.archive(Utc::now())?;
        drop(guard);
        self.persist_and_emit(evc, EvcEvent::Undeployed).await;
        Ok(())
    }

    async fn install_direct_uni_flows(&self, evc: &Evc, guard: &mut EvcMutable) -> EvcResult<()> {
        let spec = self.flow_spec(evc, guard, Path::empty());
        let batch = flowbuilder::build_flows(&self.topology, &spec)?;
        self.flow_manager
            .install(&batch)
            .await
            .map_err(EvcError::FlowMod)
    }

    fn try_activate(&self, evc: &Evc, guard: &mut EvcMutable, intra_switch: bool) {
        match guard.try_to_activate(&self.topology, evc.uni_a(), evc.uni_z(), intra_switch, Utc::now()) {
            Ok(()) => info!(evc_id = %evc.id(), "evc activated"),
            Err(EvcError::ActivationError(reason)) => {
                debug!(evc_id = %evc.id(), reason, "evc deployed but not yet activatable");
            }
            Err(err) => warn!(evc_id = %evc.id(), %err, "unexpected error trying to activate"),
        }
    }

    async fn candidate_paths(&self, evc: &Evc, path_hint: Option<Path>) -> EvcResult<Vec<Path>> {
        let switch_a = self.switch_a(evc)?;
        let switch_z = self.switch_z(evc)?;

        if let Some(hint) = path_hint {
            if hint.is_valid(&self.topology, switch_a, switch_z, true).is_ok() {
                return Ok(vec![hint]);
            }
        }

        let source = self.dpid(switch_a)?;
        let destination = self.dpid(switch_z)?;

        let primary = self
            .query_path_finder(&source, &destination, evc.primary_constraints())
            .await?;
        if !primary.is_empty() {
            return Ok(primary);
        }
        self.query_path_finder(&source, &destination, evc.secondary_constraints())
            .await
    }

    async fn query_path_finder(
        &self,
        source: &str,
        destination: &str,
        constraints: &PathConstraints,
    ) -> EvcResult<Vec<Path>> {
        let candidates = self
            .path_finder
            .find_paths(source, destination, DEFAULT_MAX_PATHS, constraints)
            .await?;
        Ok(candidates
            .iter()
            .filter_map(|c| Path::from_hops(&self.topology, &c.hops).ok())
            .collect())
    }

    /// The topology this deployer resolves switches, interfaces and links against; shared by the
    /// link-up handler and consistency loop, which need the same registries without duplicating
    /// the `Arc` clone.
    pub(crate) fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub(crate) fn switch_a(&self, evc: &Evc) -> EvcResult<Id<Switch>> {
        self.topology
            .switch_of(evc.uni_a().interface())
            .map(|s| s.id())
            .ok_or_else(|| EvcError::DisabledSwitch(evc.uni_a().interface().to_string()))
    }

    pub(crate) fn switch_z(&self, evc: &Evc) -> EvcResult<Id<Switch>> {
        self.topology
            .switch_of(evc.uni_z().interface())
            .map(|s| s.id())
            .ok_or_else(|| EvcError::DisabledSwitch(evc.uni_z().interface().to_string()))
    }

    fn dpid(&self, switch: Id<Switch>) -> EvcResult<String> {
        self.topology
            .switches
            .get(switch)
            .map(|s| s.dpid().to_string())
            .ok_or_else(|| EvcError::DisabledSwitch(switch.to_string()))
    }

    /// Blocks deploy while either UNI's switch has been administratively disabled (§7). Checked
    /// once up front, before any path discovery or flow install, so a disabled switch is
    /// surfaced to the operator rather than silently retried.
    fn check_uni_switches_enabled(&self, evc: &Evc) -> EvcResult<()> {
        for switch_id in [self.switch_a(evc)?, self.switch_z(evc)?] {
            let switch = self
                .topology
                .switches
                .get(switch_id)
                .ok_or_else(|| EvcError::DisabledSwitch(switch_id.to_string()))?;
            if !switch.is_enabled() {
                return Err(EvcError::DisabledSwitch(switch.dpid().to_string()));
            }
        }
        Ok(())
    }
}

/// Remove the two UNI switches' entries from a flow batch, leaving only NNI (transit) flows —
/// used when provisioning a failover path (§4.5: "skip UNI ingress").
fn nni_only(mut batch: FlowBatch, switch_a: Id<Switch>, switch_z: Id<Switch>) -> FlowBatch {
    batch.remove(&switch_a);
    batch.remove(&switch_z);
    batch
}

/// The `(link, s_vlan)` pairs a path currently holds, captured before release.
fn vlan_map(topology: &Topology, path: &Path) -> HashMap<Id<topology::Link>, u16> {
    path.links()
        .iter()
        .filter_map(|&link_id| {
            let link = topology.links.get(link_id)?;
            link.s_vlan().map(|vlan| (link_id, vlan))
        })
        .collect()
}

/// Reconstruct a raw path-finder-style hop list (interfaces and switch dpids alternating, per
/// §6) from an already-resolved `Path`, so `setup_failover_path` can feed it to
/// `pathmodel::disjoint_paths` as the "unwanted" path to avoid overlapping with.
pub(crate) fn path_to_hops(topology: &Topology, path: &Path, switch_a: Id<Switch>) -> Option<Vec<String>> {
    let mut hops = Vec::new();
    let mut current_switch = switch_a;
    for &link_id in path.links() {
        let link = topology.links.get(link_id)?;
        let endpoint_a = topology.interfaces.get(link.endpoint_a())?;
        let (near, far) = if endpoint_a.switch() == current_switch {
            (link.endpoint_a(), link.endpoint_b())
        } else {
            (link.endpoint_b(), link.endpoint_a())
        };
        let near_iface = topology.interfaces.get(near)?;
        let far_iface = topology.interfaces.get(far)?;
        let far_switch = topology.switches.get(far_iface.switch())?;

        hops.push(near_iface.interface_id().to_string());
        hops.push(far_switch.dpid().to_string());
        hops.push(far_iface.interface_id().to_string());
        current_switch = far_iface.switch();
    }
    Some(hops)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCollaborators, Fixture};

    #[tokio::test]
    async fn intra_switch_deploy_activates_without_path_finder() {
        let fixture = Fixture::intra_switch();
        let fakes = FakeCollaborators::new();
        let deployer = fixture.deployer(&fakes);

        let deployed = deployer.deploy(&fixture.evc).await.unwrap();
        assert!(deployed);
        assert_eq!(fakes.install_calls(), 1);
        assert!(fixture.evc.flags().unwrap().active);
    }

    #[tokio::test]
    async fn inter_switch_deploy_consumes_path_finder_candidate() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = fixture.deployer(&fakes);

        let deployed = deployer.deploy(&fixture.evc).await.unwrap();
        assert!(deployed);
        assert_eq!(fakes.install_calls(), 1);
        assert!(fixture.evc.flags().unwrap().active);
    }

    #[tokio::test]
    async fn second_deploy_call_is_a_no_op() {
        let fixture = Fixture::intra_switch();
        let fakes = FakeCollaborators::new();
        let deployer = fixture.deployer(&fakes);

        assert!(deployer.deploy(&fixture.evc).await.unwrap());
        assert!(!deployer.deploy(&fixture.evc).await.unwrap());
        assert_eq!(fakes.install_calls(), 1, "second deploy must not re-dispatch");
    }

    #[tokio::test]
    async fn zero_disjoint_path_cutoff_skips_failover_discovery() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = fixture.deployer_with_cutoff(&fakes, 0);

        assert!(deployer.deploy(&fixture.evc).await.unwrap());
        let before = fakes.find_paths_calls();
        let deployed = deployer.setup_failover_path(&fixture.evc).await.unwrap();
        assert!(!deployed, "a zero cutoff must never yield a failover candidate");
        assert_eq!(
            fakes.find_paths_calls(),
            before,
            "a zero cutoff must short-circuit before ever asking the path finder"
        );
    }

    #[tokio::test]
    async fn archived_evc_rejects_deploy() {
        let fixture = Fixture::intra_switch();
        let fakes = FakeCollaborators::new();
        let deployer = fixture.deployer(&fakes);

        {
            let mut guard = fixture.evc.try_lock().unwrap();
            guard.enable(Utc::now()).unwrap();
            guard.archive(Utc::now()).unwrap();
        }

        let err = deployer.deploy(&fixture.evc).await.unwrap_err();
        assert!(matches!(err, EvcError::Archived(_)));
    }

    #[tokio::test]
    async fn redeploy_after_link_down_emits_redeployed_link_down_on_success() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = fixture.deployer(&fakes);

        {
            let mut guard = fixture.evc.try_lock().unwrap();
            guard.deactivate(Utc::now());
        }

        let redeployed = deployer.redeploy_after_link_down(&fixture.evc).await.unwrap();
        assert!(redeployed);
        assert!(fixture.evc.flags().unwrap().active);
        assert!(matches!(
            fakes.published_events().last(),
            Some(EvcEvent::RedeployedLinkDown(_))
        ));
    }

    #[tokio::test]
    async fn redeploy_after_link_down_emits_error_event_when_no_candidate_found() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::new();
        let deployer = fixture.deployer(&fakes);

        {
            let mut guard = fixture.evc.try_lock().unwrap();
            guard.deactivate(Utc::now());
        }

        let redeployed = deployer.redeploy_after_link_down(&fixture.evc).await.unwrap();
        assert!(!redeployed);
        assert!(matches!(
            fakes.published_events().last(),
            Some(EvcEvent::ErrorRedeployLinkDown(_))
        ));
    }

    #[tokio::test]
    async fn disabled_uni_switch_blocks_deploy() {
        let fixture = Fixture::intra_switch();
        let fakes = FakeCollaborators::new();
        let deployer = fixture.deployer(&fakes);

        let switch_a = deployer.switch_a(&fixture.evc).unwrap();
        fixture.topology.switches.get(switch_a).unwrap().set_enabled(false);

        let err = deployer.deploy(&fixture.evc).await.unwrap_err();
        assert!(matches!(err, EvcError::DisabledSwitch(_)));
        assert_eq!(fakes.install_calls(), 0, "a disabled switch must block before any install");
    }
}
