// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! HTTP implementation of [`evccore::PathFinder`] (§6).

use crate::retry::with_retry;
use crate::wire::{PathFinderRequest, PathFinderResponse};
use async_trait::async_trait;
use config::{RetryPolicy, Settings};
use evccore::collaborators::PathConstraints;
use evccore::errors::PathFinderError;
use pathmodel::CandidatePath;
use reqwest::Client;
use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_dispatcher_pathfinder", LevelFilter::INFO, &["dispatcher", "pathfinder"]);

/// Calls the path finder service, retrying transient failures per [`RetryPolicy`] (§4.4, §6).
pub struct HttpPathFinder {
    client: Client,
    base_url: String,
    default_spf_attribute: String,
    retry: RetryPolicy,
}

impl HttpPathFinder {
    /// Build a client from process settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest::Client` cannot be built (e.g. the platform's
    /// TLS backend failed to initialize).
    pub fn new(settings: &Settings) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(settings.timeouts.pathfinder).build()?;
        Ok(Self {
            client,
            base_url: settings.pathfinder_url.clone(),
            default_spf_attribute: settings.spf_attribute.clone(),
            retry: settings.retry.clone(),
        })
    }
}

#[async_trait]
impl evccore::collaborators::PathFinder for HttpPathFinder {
    async fn find_paths(
        &self,
        source: &str,
        destination: &str,
        max_paths: u32,
        constraints: &PathConstraints,
    ) -> Result<Vec<CandidatePath>, PathFinderError> {
        with_retry(&self.retry, "pathfinder.find_paths", || async {
            let body = PathFinderRequest::new(
                source,
                destination,
                max_paths,
                Some(self.default_spf_attribute.as_str()),
                constraints,
            );
            let response = self
                .client
                .post(self.base_url.clone())
                .json(&body)
                .send()
                .await
                .map_err(|err| PathFinderError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(PathFinderError::Response(format!("{status}: {text}")));
            }

            let parsed: PathFinderResponse = response
                .json()
                .await
                .map_err(|err| PathFinderError::Response(err.to_string()))?;
            Ok(parsed.paths.into_iter().map(CandidatePath::from).collect())
        })
        .await
    }
}
