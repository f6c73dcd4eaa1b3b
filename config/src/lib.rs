// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Settings for the EVC lifecycle and path protection engine, loaded from the process
//! environment. Every variable is optional; a missing variable falls back to the default
//! documented on its field. Loading only fails ([`ConfigError::InvalidValue`]) when a variable is
//! present but cannot be parsed into the type the setting requires.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::env;
use std::time::Duration;
use tracectl::trace_target;
use tracing::filter::LevelFilter;

trace_target!("mefeline_config", LevelFilter::INFO, &["config"]);

/// Retry policy for the dispatcher's calls to the flow manager and the path finder (§4.4, §4.11).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u8,
    /// Fixed wait applied between attempts.
    pub fixed_wait: Duration,
    /// Lower bound of the random jitter added on top of `fixed_wait`.
    pub jitter_min: Duration,
    /// Upper bound of the random jitter added on top of `fixed_wait`.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            fixed_wait: Duration::from_secs(3),
            jitter_min: Duration::from_secs(2),
            jitter_max: Duration::from_secs(7),
        }
    }
}

/// Per-collaborator HTTP timeouts (§5: "every external HTTP call carries a finite timeout").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Timeout for path finder requests.
    pub pathfinder: Duration,
    /// Timeout for flow manager install/delete requests.
    pub flow_manager: Duration,
    /// Timeout for data-plane trace requests.
    pub trace: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            pathfinder: Duration::from_secs(10),
            flow_manager: Duration::from_secs(30),
            trace: Duration::from_secs(30),
        }
    }
}

/// Priority constants used by the flow builder's `get_priority` table (§4.3), overridable per EVC
/// via `sb_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySettings {
    /// Priority for EPL (port-based, no `dl_vlan` match) flows.
    pub epl: u16,
    /// Priority for EVPL (tag-based) flows.
    pub evpl: u16,
    /// Priority for `any` (`4096/4096`) UNI flows.
    pub any: u16,
    /// Priority for `untagged` (vlan 0) UNI flows.
    pub untagged: u16,
}

impl Default for PrioritySettings {
    fn default() -> Self {
        Self {
            epl: 1,
            untagged: 100,
            any: 50,
            evpl: 1000,
        }
    }
}

/// Process-wide settings for the EVC lifecycle and path protection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the path finder service.
    pub pathfinder_url: String,
    /// Base URL of the flow manager service.
    pub manager_url: String,
    /// Base URL of the data-plane trace service.
    pub sdn_trace_cp_url: String,
    /// Cost attribute requested from the path finder (`spf_attribute`).
    pub spf_attribute: String,
    /// Maximum number of candidate paths requested when searching for a disjoint path (§4.7).
    /// `0` disables disjoint-path discovery entirely.
    pub disjoint_path_cutoff: u32,
    /// Grace window, for high-priority EVCs, before a just-touched path is reused by the
    /// consistency loop's redeploy (§4.9).
    pub wait_for_old_path_high_priority: Duration,
    /// Period of the consistency-loop ticker (§4.9).
    pub consistency_loop_period: Duration,
    /// Delay below which a repeated `switch.interface.link_up`/`link_down` event for the same
    /// interface is dropped by the event router's debounce rule (§5).
    pub interface_debounce_delay: Duration,
    /// Retry policy applied by the dispatcher and path-finder clients.
    pub retry: RetryPolicy,
    /// Per-collaborator HTTP timeouts.
    pub timeouts: HttpTimeouts,
    /// Priority constants for the flow builder.
    pub priority: PrioritySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pathfinder_url: "http://localhost:8181/api/kytos/pathfinder/v3/".to_string(),
            manager_url: "http://localhost:8181/api/kytos/flow_manager/v2".to_string(),
            sdn_trace_cp_url: "http://localhost:8181/api/amlight/sdntrace_cp/v1/traces"
                .to_string(),
            spf_attribute: "hop".to_string(),
            disjoint_path_cutoff: 10,
            wait_for_old_path_high_priority: Duration::from_secs(60),
            consistency_loop_period: Duration::from_secs(60),
            interface_debounce_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            timeouts: HttpTimeouts::default(),
            priority: PrioritySettings::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> ConfigResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw, "could not parse value")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Ok(None),
    }
}

fn env_string(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Settings {
    /// Load settings from the process environment, applying defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is present but cannot be parsed.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        let disjoint_path_cutoff = parse_env::<u32>("DISJOINT_PATH_CUTOFF")?
            .unwrap_or(defaults.disjoint_path_cutoff);
        let wait_for_old_path_high_priority =
            parse_env::<u64>("WAIT_FOR_OLD_PATH_HIGH_PRIORITY")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.wait_for_old_path_high_priority);
        let consistency_loop_period = parse_env::<u64>("CONSISTENCY_LOOP_PERIOD")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.consistency_loop_period);

        let interface_debounce_delay = parse_env::<u64>("INTERFACE_DEBOUNCE_DELAY_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.interface_debounce_delay);

        let retry = RetryPolicy {
            max_attempts: parse_env::<u8>("DISPATCHER_MAX_ATTEMPTS")?
                .unwrap_or(defaults.retry.max_attempts),
            fixed_wait: parse_env::<u64>("DISPATCHER_FIXED_WAIT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.fixed_wait),
            jitter_min: parse_env::<u64>("DISPATCHER_JITTER_MIN_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.jitter_min),
            jitter_max: parse_env::<u64>("DISPATCHER_JITTER_MAX_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.jitter_max),
        };

        let timeouts = HttpTimeouts {
            pathfinder: parse_env::<u64>("PATHFINDER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeouts.pathfinder),
            flow_manager: parse_env::<u64>("MANAGER_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeouts.flow_manager),
            trace: parse_env::<u64>("SDN_TRACE_CP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeouts.trace),
        };

        let priority = PrioritySettings {
            epl: parse_env::<u16>("EPL_SB_PRIORITY")?.unwrap_or(defaults.priority.epl),
            evpl: parse_env::<u16>("EVPL_SB_PRIORITY")?.unwrap_or(defaults.priority.evpl),
            any: parse_env::<u16>("ANY_SB_PRIORITY")?.unwrap_or(defaults.priority.any),
            untagged: parse_env::<u16>("UNTAGGED_SB_PRIORITY")?
                .unwrap_or(defaults.priority.untagged),
        };

        let settings = Self {
            pathfinder_url: env_string("PATHFINDER_URL", &defaults.pathfinder_url),
            manager_url: env_string("MANAGER_URL", &defaults.manager_url),
            sdn_trace_cp_url: env_string("SDN_TRACE_CP_URL", &defaults.sdn_trace_cp_url),
            spf_attribute: env_string("SPF_ATTRIBUTE", &defaults.spf_attribute),
            disjoint_path_cutoff,
            wait_for_old_path_high_priority,
            consistency_loop_period,
            interface_debounce_delay,
            retry,
            timeouts,
            priority,
        };

        tracing::debug!(?settings, "loaded settings from environment");
        Ok(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        // SAFETY: tests run single-threaded per-process here; no other test in this crate
        // touches this variable.
        unsafe {
            env::remove_var("DISJOINT_PATH_CUTOFF");
        }
        let settings = Settings::from_env().expect("defaults must load");
        assert_eq!(settings.disjoint_path_cutoff, 10);
        assert_eq!(settings.priority.evpl, 1000);
    }

    #[test]
    fn rejects_unparsable_value() {
        // SAFETY: see above.
        unsafe {
            env::set_var("DISJOINT_PATH_CUTOFF", "not-a-number");
        }
        let err = Settings::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue(
                "DISJOINT_PATH_CUTOFF",
                "not-a-number".to_string(),
                "could not parse value"
            )
        );
        // SAFETY: see above.
        unsafe {
            env::remove_var("DISJOINT_PATH_CUTOFF");
        }
    }

    #[test]
    fn zero_cutoff_is_accepted() {
        // SAFETY: see above.
        unsafe {
            env::set_var("DISJOINT_PATH_CUTOFF", "0");
        }
        let settings = Settings::from_env().expect("zero is a valid cutoff");
        assert_eq!(settings.disjoint_path_cutoff, 0);
        // SAFETY: see above.
        unsafe {
            env::remove_var("DISJOINT_PATH_CUTOFF");
        }
    }
}
