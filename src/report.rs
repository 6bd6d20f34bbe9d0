// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reporting the debugger pod once an attachment succeeds.
//!
//! Editor integrations run squashctl in machine mode and read one JSON object
//! from stdout to know which pod and port to connect to. Humans get a short
//! summary with the `kubectl port-forward` command to reach the debugger.

use crate::errors::{Result, SquashError};
use serde::Serialize;
use std::fmt;

/// How the debugger pod came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachMode {
    /// squashctl created the debugger pod itself
    Direct,
    /// The squash agent created it from a `DebugAttachment`
    Secure,
}

impl fmt::Display for AttachMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachMode::Direct => f.write_str("direct"),
            AttachMode::Secure => f.write_str("secure"),
        }
    }
}

/// A connected debug session, as handed to the reporter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSession {
    pub mode: AttachMode,
    pub namespace: String,
    pub debugger_pod: String,
    pub target_pod: String,
    pub target_container: String,
    pub debugger: String,
    pub local_port: u16,
    pub remote_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_name: Option<String>,
}

impl DebugSession {
    /// Command that forwards the local port to the debugger.
    #[must_use]
    pub fn port_forward_command(&self) -> String {
        format!(
            "kubectl port-forward --namespace {} {} {}:{}",
            self.namespace, self.debugger_pod, self.local_port, self.remote_port
        )
    }
}

/// Receives the debugger pod once exactly one has been identified.
pub trait DebugPodReporter: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the session cannot be reported.
    fn report(&self, session: &DebugSession) -> Result<()>;
}

/// Prints the session to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleReporter {
    /// Emit one JSON object instead of prose
    pub json: bool,
}

impl ConsoleReporter {
    /// Text that [`DebugPodReporter::report`] prints.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render(&self, session: &DebugSession) -> Result<String> {
        if self.json {
            return serde_json::to_string(session).map_err(|e| SquashError::Io {
                context: "encoding session as JSON".to_string(),
                source: e.into(),
            });
        }

        Ok(format!(
            "Debugger {} attached to {}/{} (container {}) via debug pod {} [{} mode]\n\
             Connect with: {}",
            session.debugger,
            session.namespace,
            session.target_pod,
            session.target_container,
            session.debugger_pod,
            session.mode,
            session.port_forward_command()
        ))
    }
}

impl DebugPodReporter for ConsoleReporter {
    fn report(&self, session: &DebugSession) -> Result<()> {
        println!("{}", self.render(session)?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
