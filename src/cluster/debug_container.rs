// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Direct-mode debugger pods.
//!
//! In direct mode squashctl itself creates a privileged debugger pod on the
//! same node as the target, with the host PID namespace and the CRI socket
//! available, so the debugger can find and attach to the target process.
//! The pod carries the debug-session label like agent-created pods do.

use crate::backoff::WaitPolicy;
use crate::config::MergedOptions;
use crate::constants::{DEBUGGER_REMOTE_PORT, DEBUG_IMAGE_PREFIX};
use crate::errors::{Result, SquashError};
use crate::labels::{
    DEBUG_SESSION_LABEL, DEBUG_SESSION_VALUE, K8S_MANAGED_BY, MANAGED_BY_SQUASHCTL,
    TARGET_CONTAINER_ANNOTATION, TARGET_POD_ANNOTATION,
};
use crate::target::DebugTarget;
use super::post_params;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HostPathVolumeSource, Pod, PodSpec, SecurityContext,
    Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DeleteParams;
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the debugger container inside the debug pod
const DEBUG_CONTAINER_NAME: &str = "plank";

/// Name of the volume holding the CRI socket
const CRI_SOCK_VOLUME: &str = "crisock";

/// Settings for starting a debugger pod.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugContainerOptions {
    pub debugger: String,
    pub container_repo: String,
    pub container_version: String,
    pub local_port: u16,
    pub timeout: Duration,
    pub no_clean: bool,
    pub cri_sock: String,
}

impl DebugContainerOptions {
    /// Options for `debugger`, using the local port chosen by the port allocator.
    #[must_use]
    pub fn new(options: &MergedOptions, debugger: &str, local_port: u16) -> Self {
        Self {
            debugger: debugger.to_string(),
            container_repo: options.container_repo.clone(),
            container_version: options.container_version.clone(),
            local_port,
            timeout: options.timeout,
            no_clean: options.no_clean,
            cri_sock: options.cri_sock.clone(),
        }
    }

    /// Image of the debugger container: `<repo>/plank-<debugger>:<version>`.
    #[must_use]
    pub fn image(&self) -> String {
        format!(
            "{}/{}{}:{}",
            self.container_repo.trim_end_matches('/'),
            DEBUG_IMAGE_PREFIX,
            self.debugger,
            self.container_version
        )
    }
}

/// Starts a debugger pod next to a target (direct mode).
#[async_trait]
pub trait DebugContainerStarter: Send + Sync {
    /// Start the debugger pod and return it once it is running.
    ///
    /// # Errors
    ///
    /// Errors from the cluster are returned verbatim.
    async fn start(&self, options: &DebugContainerOptions, target: &DebugTarget) -> Result<Pod>;
}

/// Build the debugger pod for `target`.
#[must_use]
pub fn build_debug_pod(options: &DebugContainerOptions, target: &DebugTarget) -> Pod {
    let labels = BTreeMap::from([
        (DEBUG_SESSION_LABEL.to_string(), DEBUG_SESSION_VALUE.to_string()),
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_SQUASHCTL.to_string()),
    ]);
    let annotations = BTreeMap::from([
        (TARGET_POD_ANNOTATION.to_string(), target.pod_name()),
        (
            TARGET_CONTAINER_ANNOTATION.to_string(),
            target.container.name.clone(),
        ),
    ]);

    let env = [
        ("SQUASH_NAMESPACE", target.namespace.clone()),
        ("SQUASH_POD", target.pod_name()),
        ("SQUASH_CONTAINER", target.container.name.clone()),
        ("SQUASH_TIMEOUT", options.timeout.as_secs().to_string()),
        ("DEBUGGER", options.debugger.clone()),
    ]
    .into_iter()
    .map(|(name, value)| EnvVar {
        name: name.to_string(),
        value: Some(value),
        ..Default::default()
    })
    .collect();

    Pod {
        metadata: ObjectMeta {
            generate_name: Some(DEBUG_IMAGE_PREFIX.to_string()),
            namespace: Some(target.namespace.clone()),
            labels: Some(labels),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: target.pod.spec.as_ref().and_then(|s| s.node_name.clone()),
            host_pid: Some(true),
            restart_policy: Some("Never".to_string()),
            containers: vec![Container {
                name: DEBUG_CONTAINER_NAME.to_string(),
                image: Some(options.image()),
                image_pull_policy: Some("IfNotPresent".to_string()),
                stdin: Some(true),
                tty: Some(true),
                env: Some(env),
                ports: Some(vec![ContainerPort {
                    container_port: i32::from(DEBUGGER_REMOTE_PORT),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                security_context: Some(SecurityContext {
                    privileged: Some(true),
                    ..Default::default()
                }),
                volume_mounts: Some(vec![VolumeMount {
                    name: CRI_SOCK_VOLUME.to_string(),
                    mount_path: options.cri_sock.clone(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: CRI_SOCK_VOLUME.to_string(),
                host_path: Some(HostPathVolumeSource {
                    path: options.cri_sock.clone(),
                    type_: Some("Socket".to_string()),
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

/// Pod phase, or `""` when the status is not populated yet.
#[must_use]
pub fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("")
}

/// [`DebugContainerStarter`] creating the debugger pod with a `kube` client.
#[derive(Clone)]
pub struct KubeDebugContainerStarter {
    client: Client,
}

impl KubeDebugContainerStarter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn wait_until_running(
        &self,
        api: &Api<Pod>,
        name: &str,
        timeout: Duration,
    ) -> Result<Pod> {
        let policy = WaitPolicy {
            grace_period: Duration::ZERO,
            ..WaitPolicy::with_timeout(timeout)
        };
        let mut deadline = policy.start().await;

        loop {
            let pod = api
                .get(name)
                .await
                .map_err(|e| SquashError::cluster(format!("reading debug pod {name}"), e))?;

            match pod_phase(&pod) {
                "Running" => return Ok(pod),
                phase @ ("Failed" | "Succeeded") => {
                    return Err(SquashError::Precondition(format!(
                        "debug pod {name} terminated before attaching (phase {phase})"
                    )));
                }
                phase => debug!(pod = %name, phase, "Debug pod not running yet"),
            }

            if !deadline.wait_next().await {
                return Err(SquashError::WaitTimeout {
                    what: format!("debug pod {name} to start"),
                    waited: deadline.elapsed(),
                });
            }
        }
    }
}

#[async_trait]
impl DebugContainerStarter for KubeDebugContainerStarter {
    async fn start(&self, options: &DebugContainerOptions, target: &DebugTarget) -> Result<Pod> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &target.namespace);
        let pod = build_debug_pod(options, target);

        let created = api
            .create(&post_params(), &pod)
            .await
            .map_err(|e| SquashError::cluster("creating debug pod", e))?;
        let name = created.name_any();
        info!(
            "Created debug pod {}/{} with image {}",
            target.namespace,
            name,
            options.image()
        );

        match self.wait_until_running(&api, &name, options.timeout).await {
            Ok(running) => Ok(running),
            Err(e) => {
                if options.no_clean {
                    warn!(pod = %name, "Leaving failed debug pod in place (--no-clean)");
                } else if let Err(delete_err) = api.delete(&name, &DeleteParams::default()).await {
                    warn!(pod = %name, error = %delete_err, "Failed to delete debug pod");
                } else {
                    debug!(pod = %name, "Deleted debug pod after failed start");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "debug_container_tests.rs"]
mod debug_container_tests;
