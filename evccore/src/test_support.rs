// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory fakes of the five collaborator traits (§4.10) plus small topology fixtures shared
//! across this crate's unit tests, so the lifecycle engine can be exercised without a dispatcher.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::collaborators::{
    EventBus, FlowBatch, FlowManager, PathConstraints, PathFinder, Persist, TraceProbe, TraceStep,
    Tracer,
};
use crate::deploy::Deployer;
use crate::errors::{FlowModError, PathFinderError, PersistError, TraceError};
use crate::events::EvcEvent;
use crate::evc::Evc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowbuilder::{Priorities, TableGroupIds};
use parking_lot::Mutex;
use pathmodel::CandidatePath;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use topology::{Interface, Link, Switch, Topology, Uni, UserTag};

pub(crate) fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).expect("epoch is a valid timestamp")
}

/// A fake of all five collaborator traits, sharing its call counters and canned responses
/// through `Arc` so every clone handed out to a `Deployer`'s trait-object slots observes the
/// same state the test asserts on.
#[derive(Clone, Default)]
pub(crate) struct FakeCollaborators {
    install_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
    find_paths_calls: Arc<AtomicUsize>,
    candidates: Arc<Mutex<Vec<CandidatePath>>>,
    fail_install: Arc<AtomicBool>,
    published: Arc<Mutex<Vec<EvcEvent>>>,
}

impl FakeCollaborators {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_candidate(hops: Vec<String>) -> Self {
        let fakes = Self::new();
        fakes.candidates.lock().push(CandidatePath { hops, cost: 1.0 });
        fakes
    }

    pub(crate) fn fail_next_install(&self) {
        self.fail_install.store(true, Ordering::SeqCst);
    }

    pub(crate) fn install_calls(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn find_paths_calls(&self) -> usize {
        self.find_paths_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn published_events(&self) -> Vec<EvcEvent> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl PathFinder for FakeCollaborators {
    async fn find_paths(
        &self,
        _source: &str,
        _destination: &str,
        _max_paths: u32,
        _constraints: &PathConstraints,
    ) -> Result<Vec<CandidatePath>, PathFinderError> {
        self.find_paths_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.lock().clone())
    }
}

#[async_trait]
impl FlowManager for FakeCollaborators {
    async fn install(&self, _batch: &FlowBatch) -> Result<(), FlowModError> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_install.swap(false, Ordering::SeqCst) {
            return Err(FlowModError::Response("fake flow manager rejected the batch".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, _batch: &FlowBatch) -> Result<(), FlowModError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Tracer for FakeCollaborators {
    async fn trace(&self, probes: &[TraceProbe]) -> Result<Vec<Vec<TraceStep>>, TraceError> {
        Ok(probes.iter().map(|_| Vec::new()).collect())
    }
}

#[async_trait]
impl Persist for FakeCollaborators {
    async fn upsert(&self, _evc: &Evc) -> Result<(), PersistError> {
        Ok(())
    }
}

impl EventBus for FakeCollaborators {
    fn publish(&self, event: EvcEvent) {
        self.published.lock().push(event);
    }
}

/// A small registered topology plus one `Evc` already enabled, for deploy/link tests.
pub(crate) struct Fixture {
    pub(crate) topology: Arc<Topology>,
    pub(crate) evc: Evc,
}

impl Fixture {
    /// Both UNIs on a single switch; `deploy` never needs the path finder.
    pub(crate) fn intra_switch() -> Self {
        let topology = Topology::new();
        let switch = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:01"));
        let if_a = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:01:1", switch, 1));
        let if_z = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:01:2", switch, 2));

        let evc = new_evc("evc-intra", if_a, if_z, false);
        Self {
            topology: Arc::new(topology),
            evc,
        }
    }

    /// `uni_a` on `switch_a`, `uni_z` on `switch_z`, connected through one transit switch.
    pub(crate) fn inter_switch() -> Self {
        let topology = Topology::new();
        let switch_a = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:0a"));
        let switch_b = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:0b"));
        let switch_z = topology.switches.insert(Switch::new("00:00:00:00:00:00:00:0c"));

        let if_a = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:0a:1", switch_a, 1));
        let if_a_nni = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:0a:2", switch_a, 2));
        let if_b1 = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:0b:1", switch_b, 1));
        let if_b2 = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:0b:2", switch_b, 2));
        let if_z_nni = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:0c:1", switch_z, 1));
        let if_z = topology
            .interfaces
            .insert(Interface::new("00:00:00:00:00:00:00:0c:2", switch_z, 2));

        let link_ab = topology.links.insert(Link::new(if_a_nni, if_b1));
        let link_bz = topology.links.insert(Link::new(if_b2, if_z_nni));
        for (iface, link) in [
            (if_a_nni, link_ab),
            (if_b1, link_ab),
            (if_b2, link_bz),
            (if_z_nni, link_bz),
        ] {
            topology.interfaces.get(iface).unwrap().set_current_link(Some(link));
        }

        let evc = new_evc("evc-inter", if_a, if_z, true);
        Self {
            topology: Arc::new(topology),
            evc,
        }
    }

    /// The raw path-finder hop list for `inter_switch`'s only route, for
    /// `FakeCollaborators::with_candidate`.
    pub(crate) fn candidate_hops(&self) -> Vec<String> {
        vec![
            "00:00:00:00:00:00:00:0a:2".to_string(),
            "00:00:00:00:00:00:00:0b".to_string(),
            "00:00:00:00:00:00:00:0b:1".to_string(),
            "00:00:00:00:00:00:00:0b:2".to_string(),
            "00:00:00:00:00:00:00:0c".to_string(),
            "00:00:00:00:00:00:00:0c:1".to_string(),
        ]
    }

    pub(crate) fn deployer(&self, fakes: &FakeCollaborators) -> Deployer {
        self.deployer_with_cutoff(fakes, 10)
    }

    pub(crate) fn deployer_with_cutoff(&self, fakes: &FakeCollaborators, disjoint_path_cutoff: u32) -> Deployer {
        Deployer::new(
            Arc::clone(&self.topology),
            Arc::new(fakes.clone()) as Arc<dyn PathFinder>,
            Arc::new(fakes.clone()) as Arc<dyn FlowManager>,
            Arc::new(fakes.clone()) as Arc<dyn EventBus>,
            Arc::new(fakes.clone()) as Arc<dyn Persist>,
            test_priorities(),
            disjoint_path_cutoff,
        )
    }
}

fn new_evc(name: &str, if_a: id::Id<Interface>, if_z: id::Id<Interface>, dynamic_backup_path: bool) -> Evc {
    let uni_a = Uni::new(if_a, Some(UserTag::Tagged(100)));
    let uni_z = Uni::new(if_z, Some(UserTag::Tagged(200)));
    let evc = Evc::new(
        name,
        uni_a,
        uni_z,
        dynamic_backup_path,
        PathConstraints::default(),
        PathConstraints::default(),
        TableGroupIds { evpl: 2, epl: 0 },
        now(),
    );
    evc.try_lock().expect("freshly built evc is never locked").enable(now()).unwrap();
    evc
}

pub(crate) fn test_priorities() -> Priorities {
    Priorities {
        epl: 1,
        untagged: 100,
        any: 50,
        evpl: 1000,
    }
}
