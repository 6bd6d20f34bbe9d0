// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Submission of `DebugAttachment` intents.
//!
//! In secure mode squashctl never creates a debugger pod itself. It records
//! the intent as a [`DebugAttachment`] and the squash agent, running with the
//! privileges the user lacks, does the rest.

use crate::crd::{DebugAttachment, DebugAttachmentSpec};
use crate::errors::{Result, SquashError};
use crate::labels::{K8S_MANAGED_BY, MANAGED_BY_SQUASHCTL};
use super::post_params;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Everything needed to submit one attachment intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachRequest {
    /// Deterministic intent name (see [`crate::crd::debug_attachment_name`])
    pub intent_name: String,
    /// Namespace of the target pod; the intent is created there
    pub namespace: String,
    /// Image of the target container, for agent-side validation
    pub target_image: String,
    /// Target pod name
    pub pod: String,
    /// Target container name
    pub container: String,
    /// Process to attach to inside the container, if not the main process
    pub process_name: Option<String>,
    /// Debugger to attach
    pub debugger: String,
}

impl AttachRequest {
    /// The `DebugAttachment` object this request describes.
    #[must_use]
    pub fn to_resource(&self) -> DebugAttachment {
        let labels = BTreeMap::from([(
            K8S_MANAGED_BY.to_string(),
            MANAGED_BY_SQUASHCTL.to_string(),
        )]);

        DebugAttachment {
            metadata: ObjectMeta {
                name: Some(self.intent_name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: DebugAttachmentSpec {
                debugger: self.debugger.clone(),
                image: self.target_image.clone(),
                pod: self.pod.clone(),
                container: self.container.clone(),
                debug_namespace: None,
                process_name: self.process_name.clone(),
            },
            status: None,
        }
    }
}

/// Owner of attachment-intent creation.
#[async_trait]
pub trait AttachmentIntents: Send + Sync {
    /// Submit an intent. Submitting the same intent name twice must not
    /// create a second object.
    ///
    /// # Errors
    ///
    /// Returns [`SquashError::ClusterApi`] if the intent cannot be created.
    async fn attach(&self, request: &AttachRequest) -> Result<DebugAttachment>;
}

/// [`AttachmentIntents`] backed by the `DebugAttachment` CRD.
#[derive(Clone)]
pub struct KubeAttachmentIntents {
    client: Client,
}

impl KubeAttachmentIntents {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttachmentIntents for KubeAttachmentIntents {
    async fn attach(&self, request: &AttachRequest) -> Result<DebugAttachment> {
        let api: Api<DebugAttachment> = Api::namespaced(self.client.clone(), &request.namespace);
        let resource = request.to_resource();

        debug!(
            namespace = %request.namespace,
            name = %request.intent_name,
            pod = %request.pod,
            container = %request.container,
            debugger = %request.debugger,
            "Creating DebugAttachment"
        );

        match api.create(&post_params(), &resource).await {
            Ok(created) => {
                info!(
                    "Created DebugAttachment {}/{}",
                    request.namespace, request.intent_name
                );
                Ok(created)
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                info!(
                    "DebugAttachment {}/{} already exists, reusing it",
                    request.namespace, request.intent_name
                );
                api.get(&request.intent_name).await.map_err(|e| {
                    SquashError::cluster(
                        format!("reading DebugAttachment {}", request.intent_name),
                        e,
                    )
                })
            }
            Err(e) => Err(SquashError::cluster(
                format!("creating DebugAttachment {}", request.intent_name),
                e,
            )),
        }
    }
}

#[cfg(test)]
#[path = "intents_tests.rs"]
mod intents_tests;
