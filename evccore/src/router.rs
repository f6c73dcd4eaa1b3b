// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The event router (§2 item 9, §6): the single entry point external events arrive through,
//! handing each off to the bulk link-down pipeline, the per-EVC link-up handler, or a direct
//! lifecycle reaction, and applying the interface up/down debounce rule from §5.
//!
//! This crate's other modules never subscribe to the topology/event bus directly — `mefeline-svc`
//! owns the bus subscription and translates each inbound message into one call on this router,
//! matching the teacher's `processor::proc` boundary between transport and reconciliation logic.

use crate::deploy::Deployer;
use crate::errors::EvcResult;
use crate::events::EvcEvent;
use crate::evc::Evc;
use crate::linkdown::LinkDownPipeline;
use crate::linkup::LinkUpHandler;
use chrono::{DateTime, Duration, Utc};
use id::Id;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use topology::{Interface, InterfaceStatus, Link, LinkStatus, Topology};
use tracectl::trace_target;
use tracing::warn;

trace_target!("mefeline_core_router", tracing::level_filters::LevelFilter::INFO, &["evccore"]);

/// Routes the inbound events named in §6 to the handlers in this crate, applying the per-
/// interface debounce rule of §5 to the two interface-level event kinds.
pub struct EventRouter {
    topology: Arc<Topology>,
    deployer: Arc<Deployer>,
    link_down: LinkDownPipeline,
    link_up: LinkUpHandler,
    debounce_delay: Duration,
    last_handled: Mutex<HashMap<Id<Interface>, DateTime<Utc>>>,
}

impl EventRouter {
    #[must_use]
    pub fn new(topology: Arc<Topology>, deployer: Arc<Deployer>, debounce_delay: Duration) -> Self {
        Self {
            topology,
            link_down: LinkDownPipeline::new(Arc::clone(&deployer)),
            link_up: LinkUpHandler::new(Arc::clone(&deployer)),
            deployer,
            debounce_delay,
            last_handled: Mutex::new(HashMap::new()),
        }
    }

    /// `topology.link_down`: mark the link down and run the three-stage bulk pipeline (§4.6)
    /// over every EVC that might reference it. The caller narrows `evcs` to a plausible
    /// candidate set (e.g. EVCs whose `current_path`/`failover_path` the topology knows touches
    /// this link); EVCs unrelated to the link cost nothing beyond the pipeline's classification
    /// try-lock.
    pub async fn topology_link_down(&self, link_id: Id<Link>, evcs: &[Arc<Evc>]) {
        if let Some(link) = self.topology.links.get(link_id) {
            link.set_status(LinkStatus::Down);
        }
        self.link_down.handle_link_down(link_id, evcs).await;
    }

    /// `topology.link_up`: mark the link up and let each candidate EVC re-optimize toward its
    /// most-preferred reachable path (§4.8).
    pub async fn topology_link_up(&self, link_id: Id<Link>, evcs: &[Arc<Evc>]) {
        if let Some(link) = self.topology.links.get(link_id) {
            link.set_status(LinkStatus::Up);
        }
        for evc in evcs {
            if let Err(err) = self.link_up.handle_link_up(link_id, evc).await {
                warn!(evc_id = %evc.id(), %err, "link-up re-optimization failed");
            }
        }
    }

    /// `topology.interface.created`: a previously unknown (or disabled) interface is now known
    /// to the topology. Not debounced — creation is not part of the rapid up/down flapping this
    /// rule guards against.
    pub fn topology_interface_created(&self, interface_id: Id<Interface>) {
        if let Some(iface) = self.topology.interfaces.get(interface_id) {
            iface.set_status(InterfaceStatus::Up);
        }
    }

    /// `topology.interface.deleted`.
    pub fn topology_interface_deleted(&self, interface_id: Id<Interface>) {
        if let Some(iface) = self.topology.interfaces.get(interface_id) {
            iface.set_status(InterfaceStatus::Disabled);
        }
    }

    /// `topology.switch.interface.link_up`, debounced per §5: acted on only if the last handled
    /// event for this interface is older than `debounce_delay` and `at` is not older than that
    /// last-handled timestamp. On acceptance, marks the interface up and retries activation
    /// (§4.8's closing sentence) for every EVC whose UNI sits on it.
    pub async fn switch_interface_link_up(&self, interface_id: Id<Interface>, evcs: &[Arc<Evc>], at: DateTime<Utc>) {
        if !self.debounce_admit(interface_id, at) {
            return;
        }
        if let Some(iface) = self.topology.interfaces.get(interface_id) {
            iface.set_status(InterfaceStatus::Up);
        }
        for evc in evcs {
            if let Err(err) = self.link_up.handle_uni_interface_up(evc).await {
                warn!(evc_id = %evc.id(), %err, "uni interface-up handling failed");
            }
        }
    }

    /// `topology.switch.interface.link_down`, debounced per §5. No redeploy is attempted here:
    /// an interface going down never by itself restores service, so the only action is recording
    /// the status; the next `try_to_activate` call (the next deploy, link-up, or consistency
    /// tick) will see the UNI down and keep the EVC inactive.
    pub fn switch_interface_link_down(&self, interface_id: Id<Interface>, at: DateTime<Utc>) {
        if !self.debounce_admit(interface_id, at) {
            return;
        }
        if let Some(iface) = self.topology.interfaces.get(interface_id) {
            iface.set_status(InterfaceStatus::Down);
        }
    }

    /// `flow_manager.flow.error`: the flow manager reported an asynchronous install failure for
    /// flows this engine believes are installed. Per §7 (`FlowModException`'s recovery policy),
    /// the EVC is marked inactive and persisted and a failure event is emitted; the consistency
    /// loop's next tick discovers the drift and redeploys.
    pub async fn flow_mod_error(&self, evc: &Evc) -> EvcResult<()> {
        let Some(mut guard) = evc.try_lock() else {
            return Ok(());
        };
        guard.deactivate(Utc::now());
        drop(guard);
        self.deployer.persist_and_emit(evc, EvcEvent::ErrorRedeployLinkDown).await;
        Ok(())
    }

    /// `flow_manager.flow.deleted`: a flow this engine installed was removed out of band. The
    /// EVC is marked inactive so it stops being reported as healthy; the next consistency tick's
    /// trace will find the drift and redeploy (§4.9), so no flow removal call is issued here —
    /// the flow is already gone.
    pub async fn flow_deleted(&self, evc: &Evc) -> EvcResult<()> {
        let Some(mut guard) = evc.try_lock() else {
            return Ok(());
        };
        guard.deactivate(Utc::now());
        guard.last_flow_removal = Some(Utc::now());
        drop(guard);
        self.deployer.persist_and_emit(evc, EvcEvent::NeedRedeploy).await;
        Ok(())
    }

    /// `mef_eline.evcs_loaded`, emitted once at boot after `mefeline-svc` has loaded every
    /// non-archived EVC from the document store.
    pub fn evcs_loaded(&self, count: usize, event_bus: &dyn crate::collaborators::EventBus) {
        event_bus.publish(EvcEvent::EvcsLoaded(count));
    }

    /// §5: admit the event only if the last-handled timestamp for `interface_id` is both older
    /// than `debounce_delay` and not newer than `at` (an out-of-order redelivery of a stale event
    /// is dropped even outside the delay window). Records `at` as the new last-handled time when
    /// admitted.
    fn debounce_admit(&self, interface_id: Id<Interface>, at: DateTime<Utc>) -> bool {
        let mut last_handled = self.last_handled.lock().unwrap_or_else(|poison| poison.into_inner());
        match last_handled.get(&interface_id) {
            Some(&previous) if at < previous => false,
            Some(&previous) if at - previous < self.debounce_delay => false,
            _ => {
                last_handled.insert(interface_id, at);
                true
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCollaborators, Fixture};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn rapid_interface_flap_is_debounced() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        let router = EventRouter::new(Arc::clone(&fixture.topology), deployer, Duration::seconds(30));

        let interface_id = fixture.evc.uni_a().interface();
        let evc = Arc::new(fixture.evc);

        router.switch_interface_link_up(interface_id, std::slice::from_ref(&evc), at(0)).await;
        assert_eq!(fakes.install_calls(), 1, "the first event must trigger a deploy attempt");

        router.switch_interface_link_up(interface_id, std::slice::from_ref(&evc), at(1)).await;
        assert_eq!(fakes.install_calls(), 1, "an event inside the debounce window must be dropped");

        router.switch_interface_link_up(interface_id, std::slice::from_ref(&evc), at(31)).await;
        assert_eq!(
            fakes.install_calls(),
            1,
            "already deployed on its current path, the second admitted event is a deploy no-op"
        );
    }

    #[tokio::test]
    async fn stale_out_of_order_event_is_dropped() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::new();
        let deployer = Arc::new(fixture.deployer(&fakes));
        let router = EventRouter::new(Arc::clone(&fixture.topology), deployer, Duration::seconds(30));

        let interface_id = fixture.evc.uni_a().interface();
        let evc = Arc::new(fixture.evc);

        router.switch_interface_link_up(interface_id, std::slice::from_ref(&evc), at(100)).await;
        assert_eq!(fakes.install_calls(), 1);

        router.switch_interface_link_up(interface_id, std::slice::from_ref(&evc), at(50)).await;
        assert_eq!(fakes.install_calls(), 1, "an event older than the last handled one is dropped");
    }

    #[tokio::test]
    async fn link_down_drives_the_bulk_pipeline() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        deployer.deploy(&fixture.evc).await.unwrap();

        let broken_link = {
            let guard = fixture.evc.try_lock().unwrap();
            guard.current_path.links()[0]
        };

        let router = EventRouter::new(Arc::clone(&fixture.topology), Arc::clone(&deployer), Duration::seconds(30));
        let evc = Arc::new(fixture.evc);
        router.topology_link_down(broken_link, std::slice::from_ref(&evc)).await;

        assert!(!evc.flags().unwrap().active);
        assert_eq!(fakes.delete_calls(), 1);
        assert_eq!(
            fixture.topology.links.get(broken_link).unwrap().status(),
            LinkStatus::Down
        );
    }

    #[tokio::test]
    async fn flow_deleted_deactivates_and_marks_for_redeploy() {
        let fixture = Fixture::inter_switch();
        let fakes = FakeCollaborators::with_candidate(fixture.candidate_hops());
        let deployer = Arc::new(fixture.deployer(&fakes));
        deployer.deploy(&fixture.evc).await.unwrap();
        assert!(fixture.evc.flags().unwrap().active);

        let router = EventRouter::new(Arc::clone(&fixture.topology), deployer, Duration::seconds(30));
        router.flow_deleted(&fixture.evc).await.unwrap();

        assert!(!fixture.evc.flags().unwrap().active);
    }
}
