// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for debug-target resolution and attachment.
//!
//! Every failure the attach flow can end in is a variant of [`SquashError`]:
//! - Configuration problems that cannot be resolved without prompting
//! - Ambiguous or empty candidate lists during target selection
//! - Missing in-cluster prerequisites for secure mode
//! - Kubernetes API failures, with the failing operation named
//! - An explicit decline at the confirmation prompt
//! - Local port conflicts
//!
//! Errors are surfaced to the caller unmodified; nothing in the library
//! recovers from them silently.

use crate::prompt::SelectionKind;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by a Kubernetes API call or another collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while resolving a debug target or attaching a debugger.
#[derive(Error, Debug)]
pub enum SquashError {
    /// Options are unset or contradictory and interactivity is not allowed
    ///
    /// Returned in machine mode when a value would have to be chosen by the user.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Zero or several candidates where exactly one was required
    ///
    /// The count is carried so callers can tell "nothing to choose from" apart
    /// from "too many to choose from".
    #[error("{}", ambiguous_message(*kind, *count))]
    AmbiguousSelection {
        /// What was being selected
        kind: SelectionKind,
        /// Number of candidates that were available
        count: usize,
    },

    /// An explicitly requested or chosen value is not among the candidates
    #[error("selected {kind} not found: {name}")]
    SelectionNotFound {
        /// What was being selected
        kind: SelectionKind,
        /// The value that did not match
        name: String,
    },

    /// A hard prerequisite for the requested mode is missing
    #[error("{0}")]
    Precondition(String),

    /// A Kubernetes API call failed
    #[error("{operation}: {source}")]
    ClusterApi {
        /// Human-readable name of the failing operation (e.g. "listing namespaces")
        operation: String,
        /// Underlying client error
        #[source]
        source: BoxError,
    },

    /// The user declined the confirmation prompt
    #[error("user aborted")]
    UserAborted,

    /// The requested local port is already bound
    #[error(
        "Port {port} already in use. Please choose a different --localport value \
         or remove the --localport flag for a free port to be chosen automatically."
    )]
    PortInUse {
        /// The conflicting port
        port: u16,
    },

    /// The set of newly created debug pods did not contain exactly one pod
    #[error("expected to find one newly created squash debug pod, found {count}")]
    PodSetMismatch {
        /// Number of new pods that were found
        count: usize,
    },

    /// A bounded wait elapsed before its condition was met
    #[error("timed out after {waited:?} waiting for {what}")]
    WaitTimeout {
        /// What was being waited for
        what: String,
        /// How long the wait lasted
        waited: Duration,
    },

    /// The terminal prompt itself failed (closed stdin, no tty, ...)
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Local I/O or output encoding failed
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted
        context: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl SquashError {
    /// Wrap a collaborator error as a [`SquashError::ClusterApi`] naming the operation.
    pub fn cluster(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SquashError::ClusterApi {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Whether this error is an intentional stop rather than a failure.
    #[must_use]
    pub fn is_user_abort(&self) -> bool {
        matches!(self, SquashError::UserAborted)
    }
}

fn ambiguous_message(kind: SelectionKind, count: usize) -> String {
    if count == 0 {
        format!("no {}s available", kind)
    } else {
        format!(
            "expected exactly one {} candidate, found {}; prompting is disabled, set {}",
            kind,
            count,
            kind.flag()
        )
    }
}

/// Convenience alias used across the library.
pub type Result<T, E = SquashError> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
