// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The two collaborators this workspace's Non-goals put out of scope entirely — the document
//! store's query engine and the event bus transport — still need *some* implementation of the
//! `Persist`/`EventBus` trait boundary for the process to run at all. These are that
//! implementation: an in-memory EVC table standing in for the document store, and a
//! structured-log sink standing in for the bus. Replacing either with a real backend never
//! touches `mefeline-core`.

use evccore::collaborators::EventBus;
use evccore::errors::PersistError;
use evccore::{Evc, EvcEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The in-memory analogue of the document store's collection of EVCs, keyed by id. `upsert`
/// never actually serializes `evc` (there is no wire format to serialize it to — the real
/// document store's schema is explicitly out of scope) and instead tracks liveness by snapshot,
/// which is all the process needs to reload EVCs after a restart within the same run.
#[derive(Default)]
pub struct EvcStore {
    snapshots: RwLock<HashMap<flowbuilder::EvcId, evccore::EvcSnapshot>>,
}

impl EvcStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[async_trait::async_trait]
impl evccore::Persist for EvcStore {
    async fn upsert(&self, evc: &Evc) -> Result<(), PersistError> {
        if let Some(snapshot) = evc.snapshot_event() {
            self.snapshots.write().insert(snapshot.evc_id, snapshot);
        }
        Ok(())
    }
}

/// Publishes every outbound event at `info` level under the `mefeline_svc` trace target. A real
/// deployment would fan this out to the NATS/Kafka topic the distilled spec's `mef_eline.*`
/// event names assume; logging is the whole of what this workspace needs to demonstrate the
/// lifecycle engine is driving its collaborators correctly.
pub struct LoggingEventBus;

impl EventBus for LoggingEventBus {
    fn publish(&self, event: EvcEvent) {
        info!(?event, "published evc event");
    }
}

/// The live registry of EVCs the event router and consistency loop operate over, built once at
/// boot from whatever `Persist` returns (today, nothing — load-on-boot is out of scope along
/// with the document store's query engine) and mutated as EVCs are created through whatever
/// front-end a deployment wires in front of this process.
#[derive(Default)]
pub struct EvcRegistry {
    evcs: RwLock<Vec<Arc<Evc>>>,
}

impl EvcRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, evc: Arc<Evc>) {
        self.evcs.write().push(evc);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Evc>> {
        self.evcs.read().clone()
    }
}
