// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Explicitly constructed context for one squashctl invocation.
//!
//! Every collaborator the attach flow needs is held here behind a trait
//! object, so the flow has no global state and can run against fakes:
//! - Cluster listings and the agent deployment check
//! - `DebugAttachment` submission (secure mode)
//! - Debugger pod creation (direct mode)
//! - Reporting of the connected debugger pod
//! - User prompts and debugger detection

use crate::backoff::WaitPolicy;
use crate::cluster::debug_container::{DebugContainerStarter, KubeDebugContainerStarter};
use crate::cluster::intents::{AttachmentIntents, KubeAttachmentIntents};
use crate::cluster::{ClusterApi, KubeCluster};
use crate::config::MergedOptions;
use crate::constants::AVAILABLE_DEBUGGERS;
use crate::detect::{DebuggerDetector, NoDetection};
use crate::prompt::{NonInteractivePrompter, Prompter, TerminalPrompter};
use crate::report::{ConsoleReporter, DebugPodReporter};
use kube::Client;
use std::sync::Arc;

/// Collaborators shared by target resolution and attachment.
#[derive(Clone)]
pub struct Context {
    /// Read-only cluster listings
    pub cluster: Arc<dyn ClusterApi>,

    /// Creates `DebugAttachment` intents
    pub intents: Arc<dyn AttachmentIntents>,

    /// Creates debugger pods in direct mode
    pub starter: Arc<dyn DebugContainerStarter>,

    /// Receives the connected debugger pod
    pub reporter: Arc<dyn DebugPodReporter>,

    /// Asks the user to choose or confirm
    pub prompter: Arc<dyn Prompter>,

    /// Guesses the debugger for a container
    pub detector: Arc<dyn DebuggerDetector>,

    /// Debuggers offered when none is given or detected
    pub debuggers: Vec<String>,

    /// How long and how often to look for an agent-created pod
    pub wait_policy: WaitPolicy,
}

impl Context {
    /// Context talking to a real cluster through `client`.
    ///
    /// Machine mode gets the non-interactive prompter; JSON output is used
    /// when either machine mode or `--json` is set.
    #[must_use]
    pub fn from_client(client: Client, options: &MergedOptions) -> Self {
        let prompter: Arc<dyn Prompter> = if options.machine {
            Arc::new(NonInteractivePrompter)
        } else {
            Arc::new(TerminalPrompter)
        };

        Self {
            cluster: Arc::new(KubeCluster::new(client.clone())),
            intents: Arc::new(KubeAttachmentIntents::new(client.clone())),
            starter: Arc::new(KubeDebugContainerStarter::new(client)),
            reporter: Arc::new(ConsoleReporter {
                json: options.json || options.machine,
            }),
            prompter,
            detector: Arc::new(NoDetection),
            debuggers: default_debuggers(),
            wait_policy: WaitPolicy::with_timeout(options.timeout),
        }
    }
}

/// The debuggers squashctl publishes images for.
#[must_use]
pub fn default_debuggers() -> Vec<String> {
    AVAILABLE_DEBUGGERS.iter().map(ToString::to_string).collect()
}
