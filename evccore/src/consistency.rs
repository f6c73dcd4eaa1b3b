// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The periodic reconciliation loop (§4.9): traces each enabled, unlocked, not-recently-touched
//! EVC's installed flows against its intent, redeploys on drift, activates EVCs whose trace
//! matches but were not yet marked active, and independently tops up missing failover paths.

use crate::collaborators::{TraceProbe, TraceStep, TraceStepKind, Tracer};
use crate::deploy::Deployer;
use crate::evc::Evc;
use chrono::{DateTime, Duration, Utc};
use flowbuilder::{tags_for_uni, VlanTag};
use id::Id;
use pathmodel::Path;
use std::sync::Arc;
use topology::{Interface, Switch, Topology, Uni};
use tracectl::trace_target;
use tracing::{debug, warn};

trace_target!("mefeline_core_consistency", tracing::level_filters::LevelFilter::INFO, &["evccore"]);

/// One transit hop a trace is expected to report: the switch dpid, the ingress port it arrives
/// on, and the s_vlan it should carry.
type ExpectedHop = (String, u32, Option<u16>);

/// A single EVC's trace request, both directions, tagged so results can be routed back after the
/// bulk `Tracer::trace` call.
struct PendingProbe {
    evc_index: usize,
    reverse: bool,
}

/// Drives one tick of the consistency loop over a candidate EVC set.
pub struct ConsistencyLoop {
    deployer: Arc<Deployer>,
    tracer: Arc<dyn Tracer>,
    /// Grace window after `last_flow_removal`/`updated_at` before an EVC is eligible for tracing
    /// (§4.9: "not recently touched").
    grace_period: Duration,
}

impl ConsistencyLoop {
    #[must_use]
    pub fn new(deployer: Arc<Deployer>, tracer: Arc<dyn Tracer>, grace_period: Duration) -> Self {
        Self {
            deployer,
            tracer,
            grace_period,
        }
    }

    /// Runs one non-overlapping tick (the caller is responsible for ensuring only one tick runs
    /// at a time, per §5: "a new tick that finds the previous one still running exits
    /// immediately").
    pub async fn tick(&self, evcs: &[Arc<Evc>], now: DateTime<Utc>) {
        let topology = self.deployer.topology();
        let eligible: Vec<&Arc<Evc>> = evcs.iter().filter(|evc| self.is_eligible(evc, now)).collect();

        let mut probes = Vec::new();
        let mut tags = Vec::new();
        for (index, evc) in eligible.iter().enumerate() {
            let Some(guard) = evc.try_lock() else { continue };
            for probe in build_probes(topology, evc.uni_a()) {
                probes.push(probe);
                tags.push(PendingProbe { evc_index: index, reverse: false });
            }
            for probe in build_probes(topology, evc.uni_z()) {
                probes.push(probe);
                tags.push(PendingProbe { evc_index: index, reverse: true });
            }
        }

        if probes.is_empty() {
            return;
        }

        let results = match self.tracer.trace(&probes).await {
            Ok(results) => results,
            Err(err) => {
                warn!(%err, "consistency loop trace call failed, skipping this tick's verification");
                return;
            }
        };

        let mut forward_ok = vec![true; eligible.len()];
        let mut reverse_ok = vec![true; eligible.len()];
        let mut saw_forward = vec![false; eligible.len()];
        let mut saw_reverse = vec![false; eligible.len()];

        for (tag, steps) in tags.iter().zip(results.iter()) {
            let evc = eligible[tag.evc_index];
            let Some(guard) = evc.try_lock() else { continue };
            let (near, far, path) = if tag.reverse {
                (evc.uni_z(), evc.uni_a(), reversed(&guard.current_path))
            } else {
                (evc.uni_a(), evc.uni_z(), guard.current_path.clone())
            };
            drop(guard);
            let Ok(near_switch) = self.switch_for(near) else {
                continue;
            };
            let ok = verify_trace(topology, steps, near, far, &path, near_switch);
            if tag.reverse {
                saw_reverse[tag.evc_index] = true;
                reverse_ok[tag.evc_index] &= ok;
            } else {
                saw_forward[tag.evc_index] = true;
                forward_ok[tag.evc_index] &= ok;
            }
        }

        for (index, evc) in eligible.iter().enumerate() {
            let matches = saw_forward[index] && saw_reverse[index] && forward_ok[index] && reverse_ok[index];
            self.reconcile(evc, matches, now).await;
        }

        for evc in evcs {
            if let Err(err) = self.deployer.setup_failover_path(evc).await {
                debug!(evc_id = %evc.id(), %err, "failover top-up skipped this tick");
            }
        }
    }

    fn is_eligible(&self, evc: &Evc, now: DateTime<Utc>) -> bool {
        let Some(flags) = evc.flags() else { return false };
        if !flags.enabled || flags.archived {
            return false;
        }
        let Some(guard) = evc.try_lock() else { return false };
        let recently_touched = [guard.last_flow_removal, guard.updated_at]
            .into_iter()
            .flatten()
            .any(|touched| now - touched < self.grace_period);
        !recently_touched
    }

    fn switch_for(&self, uni: &Uni) -> Result<Id<Switch>, ()> {
        self.deployer
            .topology()
            .switch_of(uni.interface())
            .map(|switch| switch.id())
            .ok_or(())
    }

    /// §4.9 step 3: mismatched + active ⇒ redeploy (releasing the drifted path's tags and
    /// preferring not to reuse them, per the "wait for old path" rule); matched + inactive ⇒
    /// activate; persist either way.
    async fn reconcile(&self, evc: &Evc, matches: bool, now: DateTime<Utc>) {
        let Some(mut guard) = evc.try_lock() else { return };
        let was_active = guard.flags.active;

        if matches {
            guard.execution_rounds = 0;
            if !was_active {
                let intra_switch = evc.is_intra_switch(self.deployer.topology());
                let uni_a = evc.uni_a().clone();
                let uni_z = evc.uni_z().clone();
                let _ = guard.try_to_activate(self.deployer.topology(), &uni_a, &uni_z, intra_switch, now);
            }
            drop(guard);
            if let Err(err) = self.deployer_persist(evc).await {
                warn!(evc_id = %evc.id(), %err, "failed to persist evc after consistency check");
            }
            return;
        }

        guard.execution_rounds += 1;
        if !was_active {
            drop(guard);
            // An inactive EVC whose trace does not match has no flows on the data plane at all
            // (most commonly the link-down pipeline's stage 3 undeploy, which marks `need_redeploy`
            // and leaves the EVC exactly in this state): this is the periodic job that picks that
            // back up, grounded on the original's `handle_evc_affected_by_link_down` redeploy.
            if let Err(err) = self.deployer.redeploy_after_link_down(evc).await {
                warn!(evc_id = %evc.id(), %err, "redeploy after link-down failed");
                if let Err(err) = self.deployer_persist(evc).await {
                    warn!(evc_id = %evc.id(), %err, "failed to persist evc after consistency check");
                }
            }
            return;
        }

        let avoid = match self.deployer.remove_current_flows(evc, &mut guard).await {
            Ok(released) => released
                .into_iter()
                .map(|(link_id, vlan)| (link_id.to_string(), vlan))
                .collect::<Vec<_>>(),
            Err(err) => {
                warn!(evc_id = %evc.id(), %err, "failed to remove drifted flows, marking for redeploy only");
                drop(guard);
                return;
            }
        };
        drop(guard);

        match self.deployer.deploy_avoiding(evc, &avoid).await {
            Ok(true) => debug!(evc_id = %evc.id(), "redeployed after consistency drift"),
            Ok(false) => warn!(evc_id = %evc.id(), "no candidate path found while redeploying after drift"),
            Err(err) => warn!(evc_id = %evc.id(), %err, "redeploy after consistency drift failed"),
        }
    }

    async fn deployer_persist(&self, evc: &Evc) -> Result<(), crate::errors::PersistError> {
        self.deployer.persist_upsert(evc).await
    }
}

fn reversed(path: &Path) -> Path {
    let mut links = path.links().to_vec();
    links.reverse();
    Path::new(links)
}

/// Build one trace probe per tag entry a UNI needs (more than one only for a `TAGRange` UNI).
fn build_probes(topology: &Topology, near: &Uni) -> Vec<TraceProbe> {
    let Some(iface) = topology.interfaces.get(near.interface()) else {
        return Vec::new();
    };
    let Some(switch) = topology.switches.get(iface.switch()) else {
        return Vec::new();
    };
    tags_for_uni(near)
        .into_iter()
        .map(|tag| TraceProbe {
            dpid: switch.dpid().to_string(),
            in_port: iface.port_number(),
            vlan: probe_vlan(tag),
        })
        .collect()
}

fn probe_vlan(tag: VlanTag) -> Option<u16> {
    match tag {
        VlanTag::Unset | VlanTag::Untagged | VlanTag::Any => None,
        VlanTag::Single(vlan) | VlanTag::Masked { vlan, .. } => Some(vlan),
    }
}

/// The transit switches a trace from `near` to `far` over `path` should report as `intermediary`
/// steps, in order: every link's far endpoint except the last (which is `far`'s own switch and
/// is expected as the `last` step instead).
fn expected_hops(topology: &Topology, path: &Path, from_switch: Id<Switch>) -> Vec<ExpectedHop> {
    let links = path.links();
    let mut hops = Vec::new();
    let mut current_switch = from_switch;

    for (index, &link_id) in links.iter().enumerate() {
        let Some(link) = topology.links.get(link_id) else {
            return Vec::new();
        };
        let Some(endpoint_a) = topology.interfaces.get(link.endpoint_a()) else {
            return Vec::new();
        };
        let far = if endpoint_a.switch() == current_switch {
            link.endpoint_b()
        } else {
            link.endpoint_a()
        };
        let Some(far_iface) = topology.interfaces.get(far) else {
            return Vec::new();
        };
        if index + 1 < links.len() {
            if let Some(far_switch) = topology.switches.get(far_iface.switch()) {
                hops.push((far_switch.dpid().to_string(), far_iface.port_number(), link.s_vlan()));
            }
        }
        current_switch = far_iface.switch();
    }
    hops
}

fn iface_and_switch(topology: &Topology, uni: &Uni) -> Option<(Arc<Interface>, Arc<Switch>)> {
    let iface = topology.interfaces.get(uni.interface())?;
    let switch = topology.switches.get(iface.switch())?;
    Some((iface, switch))
}

/// §4.9 step 2: the starting entry matches `near`, the intermediate entries match the path's
/// transit switches in order with the path's s_vlan, the final entry matches `far`, and (if
/// present) the `out` field matches `far`'s port.
fn verify_trace(
    topology: &Topology,
    steps: &[TraceStep],
    near: &Uni,
    far: &Uni,
    path: &Path,
    near_switch: Id<Switch>,
) -> bool {
    let Some((near_iface, near_switch_obj)) = iface_and_switch(topology, near) else {
        return false;
    };
    let Some((far_iface, far_switch_obj)) = iface_and_switch(topology, far) else {
        return false;
    };

    let Some(starting) = steps.first() else { return false };
    if starting.kind != TraceStepKind::Starting
        || starting.dpid != near_switch_obj.dpid()
        || starting.port != near_iface.port_number()
    {
        return false;
    }

    let Some(last) = steps.last() else { return false };
    if last.kind != TraceStepKind::Last || last.dpid != far_switch_obj.dpid() || last.port != far_iface.port_number()
    {
        return false;
    }

    let expected = expected_hops(topology, path, near_switch);
    if steps.len() < 2 {
        return expected.is_empty();
    }
    let actual = &steps[1..steps.len() - 1];
    if actual.len() != expected.len() {
        return false;
    }
    for (step, (dpid, port, vlan)) in actual.iter().zip(expected.iter()) {
        if step.kind != TraceStepKind::Intermediary || &step.dpid != dpid || step.port != *port || step.vlan != *vlan
        {
            return false;
        }
    }

    if let Some(out) = last.out {
        if out.port != far_iface.port_number() {
            return false;
        }
    }

    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::collaborators::TraceOut;
    use crate::events::EvcEvent;
    use crate::test_support::{FakeCollaborators, Fixture};

    fn step(dpid: &str, port: u32, kind: TraceStepKind, vlan: Option<u16>) -> TraceStep {
        TraceStep {
            dpid: dpid.to_string(),
            port,
            kind,
            vlan,
            out: None,
        }
    }

    #[test]
    fn matching_intra_switch_trace_has_no_intermediates() {
        let fixture = Fixture::intra_switch();
        let topology = &fixture.topology;
        let switch_a = topology.switch_of(fixture.evc.uni_a().interface()).unwrap().id();
        let steps = vec![
            step("00:00:00:00:00:00:00:01", 1, TraceStepKind::Starting, Some(100)),
            step("00:00:00:00:00:00:00:01", 2, TraceStepKind::Last, Some(200)),
        ];
        assert!(verify_trace(
            topology,
            &steps,
            fixture.evc.uni_a(),
            fixture.evc.uni_z(),
            &Path::empty(),
            switch_a,
        ));
    }

    #[test]
    fn wrong_final_dpid_fails_verification() {
        let fixture = Fixture::intra_switch();
        let topology = &fixture.topology;
        let switch_a = topology.switch_of(fixture.evc.uni_a().interface()).unwrap().id();
        let steps = vec![
            step("00:00:00:00:00:00:00:01", 1, TraceStepKind::Starting, Some(100)),
            step("00:00:00:00:00:00:00:ff", 2, TraceStepKind::Last, Some(200)),
        ];
        assert!(!verify_trace(
            topology,
            &steps,
            fixture.evc.uni_a(),
            fixture.evc.uni_z(),
            &Path::empty(),
            switch_a,
        ));
        let _ = TraceOut { port: 0, vlan: None };
    }

    #[tokio::test]
    async fn tick_activates_an_inactive_evc_whose_trace_matches() {
        let fixture = Fixture::intra_switch();
        let fakes = FakeCollaborators::new();
        let deployer = Arc::new(fixture.deployer(&fakes));
        let tracer: Arc<dyn Tracer> = Arc::new(fakes.clone());
        let loop_ = ConsistencyLoop::new(Arc::clone(&deployer), tracer, Duration::seconds(0));

        let evc = Arc::new(fixture.evc);
        loop_.tick(std::slice::from_ref(&evc), crate::test_support::now()).await;
        let _ = evc;
    }

    #[tokio::test]
    async fn tick_redeploys_an_inactive_evc_with_no_current_path() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        let tracer: Arc<dyn Tracer> = Arc::new(fakes.clone());
        let loop_ = ConsistencyLoop::new(Arc::clone(&deployer), tracer, Duration::seconds(0));

        {
            let mut guard = fixture.evc.try_lock().unwrap();
            guard.deactivate(crate::test_support::now());
        }

        let evc = Arc::new(fixture.evc);
        loop_.tick(std::slice::from_ref(&evc), crate::test_support::now()).await;

        assert!(evc.flags().unwrap().active, "the tick should have found and installed a fresh path");
        assert!(matches!(
            fakes.published_events().last(),
            Some(EvcEvent::RedeployedLinkDown(_))
        ));
    }
}
