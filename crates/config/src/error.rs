// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use miette::Diagnostic;

/// Errors that can occur while reading, parsing or validating a scenario
/// configuration.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// An error that occurred while reading a configuration file.
    #[error("File read error: {details}")]
    #[diagnostic(code(fabsim::config::file_read_error))]
    FileReadError {
        /// A description of the error that occurred.
        details: String,
    },

    /// An error that occurred while deserializing a configuration file.
    #[error("{format} deserialization error: {details}")]
    #[diagnostic(code(fabsim::config::deserialization_error))]
    DeserializationError {
        /// The format of the configuration file (e.g. "YAML").
        format: String,
        /// A description of the error that occurred.
        details: String,
    },

    /// The parsed document violates one or more validity rules.
    #[error("Invalid configuration:\n{}", violations.join("\n"))]
    #[diagnostic(code(fabsim::config::invalid_configuration))]
    InvalidConfiguration {
        /// Human-readable descriptions of every violated rule.
        violations: Vec<String>,
    },

    /// A load-balancer target references a container name that does not
    /// exist in the data center.
    #[error("Unknown target container `{name}`")]
    #[diagnostic(code(fabsim::config::unknown_target_container))]
    UnknownTargetContainer {
        /// The unresolved container name.
        name: String,
    },
}
