// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! HTTP implementation of [`evccore::FlowManager`] (§4.4, §6).

use crate::retry::with_retry;
use crate::wire::{FlowDeleteWire, FlowsDeleteWire, FlowsWire};
use async_trait::async_trait;
use config::{RetryPolicy, Settings};
use evccore::collaborators::FlowBatch;
use evccore::errors::FlowModError;
use id::Id;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use topology::{Switch, Topology};
use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_dispatcher_flowmanager", LevelFilter::INFO, &["dispatcher", "flowmanager"]);

/// Calls the flow manager service's `flows_by_switch` endpoint, resolving each batch's
/// `Id<Switch>` keys to wire-format dpids via the shared [`Topology`] (§4.4, §6).
///
/// Every install/delete is issued with `force=true`: the flow manager is the single writer this
/// engine's cookie namespace (`0xaa00…`, §3) ever targets, so there is never a legitimate
/// pending change for it to preempt. Resolved as an Open Question decision — see Design Notes.
pub struct HttpFlowManager {
    client: Client,
    base_url: String,
    topology: Arc<Topology>,
    retry: RetryPolicy,
}

/// Always pass `force=true` (see struct docs).
const FORCE: &str = "true";

impl HttpFlowManager {
    /// Build a client from process settings and the shared topology used to resolve dpids.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(settings: &Settings, topology: Arc<Topology>) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(settings.timeouts.flow_manager).build()?;
        Ok(Self {
            client,
            base_url: settings.manager_url.clone(),
            topology,
            retry: settings.retry.clone(),
        })
    }

    fn dpid_of(&self, switch_id: Id<Switch>) -> Result<String, FlowModError> {
        self.topology
            .switches
            .get(switch_id)
            .map(|switch| switch.dpid().to_string())
            .ok_or_else(|| FlowModError::Response(format!("unknown switch {switch_id:?} in flow batch")))
    }

    /// Posts (or deletes) the whole `flows_by_switch` body in a single request, retrying per
    /// `RetryPolicy` (§4.4: "the dispatcher sends the whole batch in one request").
    async fn send_flows_by_switch(
        &self,
        method: reqwest::Method,
        body: &impl Serialize,
        label: &'static str,
    ) -> Result<(), FlowModError> {
        let url = format!("{}/flows_by_switch/?force={FORCE}", self.base_url.trim_end_matches('/'));
        with_retry(&self.retry, label, || async {
            let response = self
                .client
                .request(method.clone(), &url)
                .json(body)
                .send()
                .await
                .map_err(|err| FlowModError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(FlowModError::Response(format!("{status}: {text}")));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl evccore::collaborators::FlowManager for HttpFlowManager {
    async fn install(&self, batch: &FlowBatch) -> Result<(), FlowModError> {
        let mut by_dpid: HashMap<String, FlowsWire<'_>> = HashMap::with_capacity(batch.len());
        for (switch_id, flows) in batch {
            by_dpid.insert(self.dpid_of(*switch_id)?, FlowsWire { flows: flows.as_slice() });
        }
        self.send_flows_by_switch(reqwest::Method::POST, &by_dpid, "flowmanager.install").await
    }

    async fn delete(&self, batch: &FlowBatch) -> Result<(), FlowModError> {
        let mut by_dpid: HashMap<String, FlowsDeleteWire> = HashMap::with_capacity(batch.len());
        for (switch_id, flows) in batch {
            let deletes = flows.iter().map(FlowDeleteWire::from).collect();
            by_dpid.insert(self.dpid_of(*switch_id)?, FlowsDeleteWire { flows: deletes });
        }
        self.send_flows_by_switch(reqwest::Method::DELETE, &by_dpid, "flowmanager.delete").await
    }
}
