// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures.
//!
//! Loading is infallible for variables that are simply absent (the default applies); it fails
//! only when a variable is present but cannot be parsed into the type the setting requires.

use thiserror::Error;

/// The reasons why loading [`crate::Settings`] from the environment may fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} has an invalid value '{1}': {2}")]
    InvalidValue(&'static str, String, &'static str),
}

/// Result-like type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
