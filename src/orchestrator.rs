// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Attachment orchestration.
//!
//! A small state machine drives one attachment:
//!
//! ```text
//! Idle -> Validated -> DirectAttach -> Connected
//!                   \-> SecureAttach -/         \
//!   (any step) ----------------------------------> Failed
//! ```
//!
//! **Direct mode** hands the resolved target to the debug-container starter
//! and reports the pod it returns. No `DebugAttachment` is created.
//!
//! **Secure mode** requires the squash agent to be deployed somewhere in the
//! cluster; without it the attachment fails before anything is submitted and
//! is never downgraded to direct mode. The debug-session pods of the target
//! namespace are snapshotted, the `DebugAttachment` is submitted, and after a
//! grace period the pods are polled until exactly one new pod shows up. More
//! than one new pod fails immediately; none by the deadline is a timeout.

use crate::cluster::debug_container::DebugContainerOptions;
use crate::cluster::intents::AttachRequest;
use crate::cluster::ClusterApi;
use crate::config::MergedOptions;
use crate::constants::DEBUGGER_REMOTE_PORT;
use crate::context::Context;
use crate::crd::debug_attachment_name;
use crate::errors::{Result, SquashError};
use crate::labels::{AGENT_DEPLOYMENT_SELECTOR, DEBUG_SESSION_SELECTOR};
use crate::report::{AttachMode, DebugSession};
use crate::snapshot::{single_new_pod, PodSnapshot};
use crate::target::DebugTarget;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::fmt;
use tracing::{debug, error, info};

/// States of one attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachState {
    Idle,
    Validated,
    DirectAttach,
    SecureAttach,
    Connected,
    Failed,
}

impl fmt::Display for AttachState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Drives one attachment through [`AttachState`].
pub struct Orchestrator<'a> {
    context: &'a Context,
    history: Vec<AttachState>,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(context: &'a Context) -> Self {
        Self {
            context,
            history: vec![AttachState::Idle],
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AttachState {
        self.history
            .last()
            .copied()
            .unwrap_or(AttachState::Idle)
    }

    /// Every state entered so far, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[AttachState] {
        &self.history
    }

    fn transition(&mut self, next: AttachState) {
        debug!(from = %self.state(), to = %next, "Attachment state transition");
        self.history.push(next);
    }

    /// Attach the target's debugger, ending in `Connected` or `Failed`.
    ///
    /// # Errors
    ///
    /// Any error ends the attachment in [`AttachState::Failed`] and is returned
    /// unchanged.
    pub async fn attach(
        &mut self,
        options: &MergedOptions,
        target: &DebugTarget,
        local_port: u16,
    ) -> Result<DebugSession> {
        match self.run(options, target, local_port).await {
            Ok(session) => Ok(session),
            Err(e) => {
                error!(error = %e, state = %self.state(), "Attachment failed");
                self.transition(AttachState::Failed);
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        options: &MergedOptions,
        target: &DebugTarget,
        local_port: u16,
    ) -> Result<DebugSession> {
        self.validate(options, target, local_port).await?;
        self.transition(AttachState::Validated);

        let session = if options.secure_mode {
            self.transition(AttachState::SecureAttach);
            info!("Creating a DebugAttachment; the squash agent will create the debugger pod");
            self.secure_attach(target, local_port).await?
        } else {
            self.transition(AttachState::DirectAttach);
            info!("Creating a debugger pod in the target pod's namespace");
            self.direct_attach(options, target, local_port).await?
        };

        self.context.reporter.report(&session)?;
        self.transition(AttachState::Connected);
        Ok(session)
    }

    async fn validate(
        &self,
        options: &MergedOptions,
        target: &DebugTarget,
        local_port: u16,
    ) -> Result<()> {
        let missing = [
            ("namespace", target.namespace.is_empty()),
            ("pod", target.pod_name().is_empty()),
            ("container", target.container.name.is_empty()),
            ("debugger", target.debugger.is_empty()),
            ("local port", local_port == 0),
        ]
        .into_iter()
        .filter_map(|(field, is_missing)| is_missing.then_some(field))
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(SquashError::Configuration(format!(
                "cannot attach with unresolved {}",
                missing.join(", ")
            )));
        }

        if options.secure_mode {
            ensure_agent_deployed(self.context.cluster.as_ref()).await?;
        }
        Ok(())
    }

    async fn direct_attach(
        &self,
        options: &MergedOptions,
        target: &DebugTarget,
        local_port: u16,
    ) -> Result<DebugSession> {
        let container_options = DebugContainerOptions::new(options, &target.debugger, local_port);
        let debug_pod = self.context.starter.start(&container_options, target).await?;

        Ok(session_for(AttachMode::Direct, target, &debug_pod, local_port, None))
    }

    async fn secure_attach(&self, target: &DebugTarget, local_port: u16) -> Result<DebugSession> {
        let pod_name = target.pod_name();
        let intent_name = debug_attachment_name(&pod_name, &target.container.name);

        let before = self.snapshot(&target.namespace).await?;
        debug!(
            namespace = %target.namespace,
            existing = before.len(),
            "Captured debug pods before submitting DebugAttachment"
        );

        let request = AttachRequest {
            intent_name: intent_name.clone(),
            namespace: target.namespace.clone(),
            target_image: target.image().to_string(),
            pod: pod_name,
            container: target.container.name.clone(),
            process_name: None,
            debugger: target.debugger.clone(),
        };
        self.context.intents.attach(&request).await?;

        let debug_pod = self.wait_for_new_pod(&before, &intent_name).await?;
        info!(
            "Squash agent created debug pod {}/{}",
            target.namespace,
            debug_pod.name_any()
        );

        Ok(session_for(
            AttachMode::Secure,
            target,
            &debug_pod,
            local_port,
            Some(intent_name),
        ))
    }

    async fn wait_for_new_pod(&self, before: &PodSnapshot, intent_name: &str) -> Result<Pod> {
        let mut deadline = self.context.wait_policy.start().await;

        loop {
            let current = self.snapshot(before.namespace()).await?;
            match single_new_pod(before, &current) {
                Err(SquashError::PodSetMismatch { count: 0 }) => {
                    debug!(elapsed = ?deadline.elapsed(), "No new debug pod yet");
                    if !deadline.wait_next().await {
                        return Err(SquashError::WaitTimeout {
                            what: format!(
                                "the squash agent to create a debug pod for DebugAttachment {intent_name}"
                            ),
                            waited: deadline.elapsed(),
                        });
                    }
                }
                other => return other,
            }
        }
    }

    async fn snapshot(&self, namespace: &str) -> Result<PodSnapshot> {
        let pods = self
            .context
            .cluster
            .list_pods(namespace, Some(DEBUG_SESSION_SELECTOR))
            .await?;
        Ok(PodSnapshot::new(namespace, DEBUG_SESSION_SELECTOR, pods))
    }
}

/// Fail unless a squash agent deployment exists in some namespace.
///
/// # Errors
///
/// Returns [`SquashError::Precondition`] when no deployment matches, or the
/// cluster error if listing fails.
pub async fn ensure_agent_deployed(cluster: &dyn ClusterApi) -> Result<()> {
    for namespace in cluster.list_namespaces().await? {
        let deployments = cluster
            .list_deployments(&namespace, AGENT_DEPLOYMENT_SELECTOR)
            .await?;
        if let Some(deployment) = deployments.first() {
            debug!(
                namespace = %namespace,
                deployment = %deployment.name_any(),
                "Found squash agent deployment"
            );
            return Ok(());
        }
    }

    Err(SquashError::Precondition(
        "Squash must be deployed to the cluster to use secure mode. Either disable secure mode \
         in your squash config file or deploy Squash to your cluster."
            .to_string(),
    ))
}

fn session_for(
    mode: AttachMode,
    target: &DebugTarget,
    debug_pod: &Pod,
    local_port: u16,
    intent_name: Option<String>,
) -> DebugSession {
    DebugSession {
        mode,
        namespace: debug_pod
            .namespace()
            .unwrap_or_else(|| target.namespace.clone()),
        debugger_pod: debug_pod.name_any(),
        target_pod: target.pod_name(),
        target_container: target.container.name.clone(),
        debugger: target.debugger.clone(),
        local_port,
        remote_port: DEBUGGER_REMOTE_PORT,
        intent_name,
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;
