// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster collaborators.
//!
//! The attach flow only sees the cluster through the traits in this module and
//! its submodules, so it can be driven by in-memory fakes in tests and by the
//! `kube`-backed implementations at runtime:
//!
//! - [`ClusterApi`] - read-only listings of namespaces, pods and deployments
//! - [`intents::AttachmentIntents`] - creation of `DebugAttachment` intents (secure mode)
//! - [`debug_container::DebugContainerStarter`] - creation of debugger pods (direct mode)

pub mod debug_container;
pub mod intents;
pub mod pagination;

use crate::constants::FIELD_MANAGER;
use crate::errors::{Result, SquashError};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use pagination::list_all_paginated;
use tracing::debug;

/// Create parameters attributing writes to squashctl.
pub(crate) fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Read-only view of the cluster used by target resolution and attachment.
///
/// Every listing tolerates an empty result; an empty cluster is not an error
/// at this level.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Names of all namespaces.
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Pods in `namespace`, optionally restricted by a label selector.
    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>>;

    /// A single pod by name.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// Deployments in `namespace` matching a label selector.
    async fn list_deployments(&self, namespace: &str, label_selector: &str)
        -> Result<Vec<Deployment>>;
}

/// [`ClusterApi`] backed by a `kube` client.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|e| SquashError::cluster("listing namespaces", e))?;

        Ok(namespaces.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let pods = list_all_paginated(&api, params)
            .await
            .map_err(|e| SquashError::cluster(format!("listing pods in {namespace}"), e))?;

        debug!(
            namespace = %namespace,
            selector = label_selector.unwrap_or(""),
            count = pods.len(),
            "Listed pods"
        );
        Ok(pods)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| SquashError::cluster(format!("reading pod {namespace}/{name}"), e))
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        list_all_paginated(&api, ListParams::default().labels(label_selector))
            .await
            .map_err(|e| SquashError::cluster(format!("listing deployments in {namespace}"), e))
    }
}
