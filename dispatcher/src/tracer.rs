// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! HTTP implementation of [`evccore::Tracer`] (§4.9, §6).

use crate::wire::{TraceRequestEntry, TraceResponse};
use async_trait::async_trait;
use config::Settings;
use evccore::collaborators::{TraceProbe, TraceStep};
use evccore::errors::TraceError;
use reqwest::Client;

/// Calls the data-plane trace service in one bulk request per [`evccore::collaborators::Tracer::trace`]
/// call. Unlike the path finder and flow manager clients, trace results only feed the
/// consistency loop's best-effort drift detection (§4.9), so a failed trace call is not retried:
/// the next consistency-loop tick tries again on its own schedule.
pub struct HttpTracer {
    client: Client,
    base_url: String,
}

impl HttpTracer {
    /// Build a client from process settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(settings: &Settings) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(settings.timeouts.trace).build()?;
        Ok(Self {
            client,
            base_url: settings.sdn_trace_cp_url.clone(),
        })
    }
}

#[async_trait]
impl evccore::collaborators::Tracer for HttpTracer {
    async fn trace(&self, probes: &[TraceProbe]) -> Result<Vec<Vec<TraceStep>>, TraceError> {
        if probes.is_empty() {
            return Ok(Vec::new());
        }

        let body: Vec<TraceRequestEntry> = probes.iter().map(TraceRequestEntry::from).collect();
        let response = self
            .client
            .post(self.base_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| TraceError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TraceError::Response(format!("{status}: {text}")));
        }

        let parsed: TraceResponse = response
            .json()
            .await
            .map_err(|err| TraceError::Response(err.to_string()))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|steps| steps.into_iter().filter_map(crate::wire::TraceStepWire::into_step).collect())
            .collect())
    }
}
