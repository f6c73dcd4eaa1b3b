// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Process entrypoint for the EVC lifecycle and path protection engine.
//!
//! Wires `mefeline-config`'s environment-loaded settings to `mefeline-dispatcher`'s HTTP
//! collaborators and `mefeline-core`'s engine, then runs the consistency-loop ticker. Inbound
//! topology and flow-manager notifications are out of scope (the topology/event bus transport is
//! an external collaborator per the distilled spec's §1), so the event router built here is
//! ready to receive them but nothing in this binary feeds it yet; `EventRouter`'s public methods
//! are the integration seam a transport adapter calls into.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

mod collaborators;

use collaborators::{EvcRegistry, EvcStore, LoggingEventBus};
use config::Settings;
use dispatcher::{HttpFlowManager, HttpPathFinder, HttpTracer};
use evccore::{ConsistencyLoop, Deployer, EventRouter};
use flowbuilder::Priorities;
use std::process::ExitCode;
use std::sync::Arc;
use topology::Topology;
use tracectl::TracingControl;
use tracing::{error, info};

fn priorities_from(settings: &Settings) -> Priorities {
    Priorities {
        epl: settings.priority.epl,
        untagged: settings.priority.untagged,
        any: settings.priority.any,
        evpl: settings.priority.evpl,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    TracingControl::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(%err, "failed to load settings from environment");
            return ExitCode::FAILURE;
        }
    };

    let topology = Arc::new(Topology::new());

    let path_finder = match HttpPathFinder::new(&settings) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!(%err, "failed to build path finder client");
            return ExitCode::FAILURE;
        }
    };
    let flow_manager = match HttpFlowManager::new(&settings, Arc::clone(&topology)) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!(%err, "failed to build flow manager client");
            return ExitCode::FAILURE;
        }
    };
    let tracer = match HttpTracer::new(&settings) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            error!(%err, "failed to build trace client");
            return ExitCode::FAILURE;
        }
    };

    let persist = Arc::new(EvcStore::new());
    let event_bus = Arc::new(LoggingEventBus);

    let deployer = Arc::new(Deployer::new(
        Arc::clone(&topology),
        path_finder,
        flow_manager,
        Arc::clone(&event_bus) as Arc<dyn evccore::EventBus>,
        Arc::clone(&persist) as Arc<dyn evccore::Persist>,
        priorities_from(&settings),
        settings.disjoint_path_cutoff,
    ));

    let router = Arc::new(EventRouter::new(
        Arc::clone(&topology),
        Arc::clone(&deployer),
        chrono::Duration::from_std(settings.interface_debounce_delay)
            .unwrap_or_else(|_| chrono::Duration::seconds(1)),
    ));
    let registry = Arc::new(EvcRegistry::new());

    router.evcs_loaded(registry.snapshot().len(), event_bus.as_ref());
    info!(
        pathfinder_url = %settings.pathfinder_url,
        manager_url = %settings.manager_url,
        sdn_trace_cp_url = %settings.sdn_trace_cp_url,
        "started mefeline-svc"
    );

    let consistency_loop = ConsistencyLoop::new(
        deployer,
        tracer as Arc<dyn evccore::collaborators::Tracer>,
        chrono::Duration::from_std(settings.wait_for_old_path_high_priority)
            .unwrap_or_else(|_| chrono::Duration::seconds(60)),
    );

    run_consistency_loop(consistency_loop, registry, settings.consistency_loop_period).await;

    ExitCode::SUCCESS
}

/// Ticks `consistency_loop` every `period` over the EVCs `registry` currently knows about,
/// forever. Per §5, ticks never overlap: `tick` itself is the only caller, driven by a fixed
/// interval rather than a free-running loop, so a slow tick simply delays the next one instead
/// of running concurrently with it.
async fn run_consistency_loop(consistency_loop: ConsistencyLoop, registry: Arc<EvcRegistry>, period: std::time::Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let evcs = registry.snapshot();
        consistency_loop.tick(&evcs, chrono::Utc::now()).await;
    }
}
