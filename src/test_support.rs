// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory collaborators for unit tests.
//!
//! [`Harness`] wires fakes for every trait in [`Context`] and keeps handles to
//! them so tests can inspect what the code under test did.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::backoff::WaitPolicy;
use crate::cluster::debug_container::{DebugContainerOptions, DebugContainerStarter};
use crate::cluster::intents::{AttachRequest, AttachmentIntents};
use crate::cluster::ClusterApi;
use crate::config::MergedOptions;
use crate::context::{default_debuggers, Context};
use crate::crd::DebugAttachment;
use crate::detect::{DebuggerDetector, NoDetection};
use crate::errors::{Result, SquashError};
use crate::labels::{AGENT_APP_LABEL, AGENT_APP_VALUE, DEBUG_SESSION_LABEL, DEBUG_SESSION_VALUE};
use crate::prompt::{Prompter, SelectionKind};
use crate::report::{DebugPodReporter, DebugSession};
use crate::target::DebugTarget;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

/// A pod in `namespace` with `(name, image)` containers.
pub fn pod(namespace: &str, name: &str, containers: &[(&str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some("node-1".to_string()),
            containers: containers
                .iter()
                .map(|(cname, image)| Container {
                    name: (*cname).to_string(),
                    image: Some((*image).to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        status: None,
    }
}

/// A debug-session pod, as the squash agent would create it.
pub fn debug_pod(namespace: &str, name: &str) -> Pod {
    let mut p = pod(namespace, name, &[("plank", "quay.io/solo-io/plank-dlv:0.5.0")]);
    p.metadata.labels = Some(BTreeMap::from([(
        DEBUG_SESSION_LABEL.to_string(),
        DEBUG_SESSION_VALUE.to_string(),
    )]));
    p
}

/// The squash agent deployment.
pub fn agent_deployment(namespace: &str) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some("squash".to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                AGENT_APP_LABEL.to_string(),
                AGENT_APP_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A fully resolved target for orchestration tests.
pub fn target(namespace: &str, pod_name: &str, container: &str, debugger: &str) -> DebugTarget {
    let p = pod(namespace, pod_name, &[(container, "example/app:1.0")]);
    let c = p.spec.as_ref().unwrap().containers[0].clone();
    DebugTarget {
        namespace: namespace.to_string(),
        pod: p,
        container: c,
        debugger: debugger.to_string(),
    }
}

/// Options with machine mode on, so no prompt is ever expected.
pub fn machine_options() -> MergedOptions {
    MergedOptions {
        machine: true,
        ..MergedOptions::default()
    }
}

fn selector_matches(selector: &str, labels: &BTreeMap<String, String>) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.get(k).is_some_and(|actual| actual == v),
            None => labels.contains_key(term),
        })
}

// ============================================================================
// Cluster
// ============================================================================

/// In-memory cluster. Scheduled pods appear after a number of labelled listings.
#[derive(Default)]
pub struct FakeCluster {
    namespaces: Mutex<Vec<String>>,
    pods: Mutex<Vec<Pod>>,
    deployments: Mutex<Vec<Deployment>>,
    scheduled: Mutex<Vec<(usize, Pod)>>,
    labelled_listings: Mutex<usize>,
    calls: Mutex<Vec<String>>,
    fail_pod_listing: Mutex<bool>,
}

impl FakeCluster {
    pub fn with_namespaces(namespaces: &[&str]) -> Self {
        let cluster = Self::default();
        *cluster.namespaces.lock().unwrap() = namespaces.iter().map(ToString::to_string).collect();
        cluster
    }

    pub fn add_pod(&self, pod: Pod) {
        self.pods.lock().unwrap().push(pod);
    }

    pub fn add_deployment(&self, deployment: Deployment) {
        self.deployments.lock().unwrap().push(deployment);
    }

    /// Make `pod` visible once `after` more labelled listings have happened.
    pub fn schedule_pod(&self, pod: Pod, after: usize) {
        let due = *self.labelled_listings.lock().unwrap() + after;
        self.scheduled.lock().unwrap().push((due, pod));
    }

    pub fn fail_pod_listing(&self) {
        *self.fail_pod_listing.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.record("list_namespaces".to_string());
        Ok(self.namespaces.lock().unwrap().clone())
    }

    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>> {
        self.record(format!(
            "list_pods {namespace} {}",
            label_selector.unwrap_or("")
        ));
        if *self.fail_pod_listing.lock().unwrap() {
            return Err(SquashError::cluster(
                format!("listing pods in {namespace}"),
                std::io::Error::other("connection refused"),
            ));
        }

        if label_selector.is_some() {
            let mut count = self.labelled_listings.lock().unwrap();
            let mut scheduled = self.scheduled.lock().unwrap();
            let (due, later): (Vec<_>, Vec<_>) =
                scheduled.drain(..).partition(|(when, _)| *when <= *count);
            *scheduled = later;
            self.pods
                .lock()
                .unwrap()
                .extend(due.into_iter().map(|(_, p)| p));
            *count += 1;
        }

        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.namespace().as_deref() == Some(namespace))
            .filter(|p| label_selector.is_none_or(|s| selector_matches(s, p.labels())))
            .cloned()
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.record(format!("get_pod {namespace} {name}"));
        self.pods
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.namespace().as_deref() == Some(namespace) && p.name_any() == name)
            .cloned()
            .ok_or_else(|| {
                SquashError::cluster(
                    format!("reading pod {namespace}/{name}"),
                    std::io::Error::other("pods not found"),
                )
            })
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Deployment>> {
        self.record(format!("list_deployments {namespace} {label_selector}"));
        Ok(self
            .deployments
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.namespace().as_deref() == Some(namespace))
            .filter(|d| selector_matches(label_selector, d.labels()))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Intents
// ============================================================================

/// Records submitted intents and plays the squash agent by scheduling pods.
pub struct FakeAgent {
    cluster: Arc<FakeCluster>,
    creates: Mutex<Vec<(Pod, usize)>>,
    requests: Mutex<Vec<AttachRequest>>,
}

impl FakeAgent {
    pub fn new(cluster: Arc<FakeCluster>) -> Self {
        Self {
            cluster,
            creates: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// On the next submission, create `pod` visible after `after` labelled listings.
    pub fn will_create(&self, pod: Pod, after: usize) {
        self.creates.lock().unwrap().push((pod, after));
    }

    pub fn requests(&self) -> Vec<AttachRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentIntents for FakeAgent {
    async fn attach(&self, request: &AttachRequest) -> Result<DebugAttachment> {
        self.requests.lock().unwrap().push(request.clone());
        for (pod, after) in self.creates.lock().unwrap().drain(..) {
            self.cluster.schedule_pod(pod, after);
        }
        Ok(request.to_resource())
    }
}

// ============================================================================
// Debug container starter
// ============================================================================

/// Returns a fixed debug pod and records what it was asked to start.
#[derive(Default)]
pub struct FakeStarter {
    calls: Mutex<Vec<(DebugContainerOptions, DebugTarget)>>,
    fail_with: Mutex<Option<String>>,
}

impl FakeStarter {
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<(DebugContainerOptions, DebugTarget)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DebugContainerStarter for FakeStarter {
    async fn start(&self, options: &DebugContainerOptions, target: &DebugTarget) -> Result<Pod> {
        self.calls
            .lock()
            .unwrap()
            .push((options.clone(), target.clone()));
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(SquashError::cluster(
                "creating debug pod",
                std::io::Error::other(message),
            ));
        }
        Ok(debug_pod(&target.namespace, "plank-direct"))
    }
}

// ============================================================================
// Reporter
// ============================================================================

#[derive(Default)]
pub struct RecordingReporter {
    sessions: Mutex<Vec<DebugSession>>,
    broken: Mutex<bool>,
}

impl RecordingReporter {
    pub fn sessions(&self) -> Vec<DebugSession> {
        self.sessions.lock().unwrap().clone()
    }

    /// Make every later report fail as if stdout were closed.
    pub fn break_output(&self) {
        *self.broken.lock().unwrap() = true;
    }
}

impl DebugPodReporter for RecordingReporter {
    fn report(&self, session: &DebugSession) -> Result<()> {
        if *self.broken.lock().unwrap() {
            return Err(SquashError::Io {
                context: "writing debug session".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
            });
        }
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }
}

// ============================================================================
// Prompter
// ============================================================================

/// Answers selections from a script and records every question.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    confirm_answer: bool,
    selections: Mutex<Vec<(SelectionKind, Vec<String>)>>,
    confirmations: Mutex<Vec<String>>,
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self::answering(&[])
    }
}

impl ScriptedPrompter {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(ToString::to_string).collect()),
            confirm_answer: true,
            selections: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
        }
    }

    pub fn declining(mut self) -> Self {
        self.confirm_answer = false;
        self
    }

    pub fn selections(&self) -> Vec<(SelectionKind, Vec<String>)> {
        self.selections.lock().unwrap().clone()
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.selections.lock().unwrap().len() + self.confirmations.lock().unwrap().len()
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&self, kind: SelectionKind, options: &[String]) -> Result<String> {
        self.selections
            .lock()
            .unwrap()
            .push((kind, options.to_vec()));
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SquashError::Prompt(format!("no scripted answer for {kind}")))
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        self.confirmations.lock().unwrap().push(message.to_string());
        Ok(self.confirm_answer)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Every fake, plus a [`Context`] built from them.
pub struct Harness {
    pub cluster: Arc<FakeCluster>,
    pub agent: Arc<FakeAgent>,
    pub starter: Arc<FakeStarter>,
    pub reporter: Arc<RecordingReporter>,
    pub prompter: Arc<dyn Prompter>,
    pub detector: Arc<dyn DebuggerDetector>,
    pub debuggers: Vec<String>,
}

impl Harness {
    pub fn new(cluster: FakeCluster) -> Self {
        let cluster = Arc::new(cluster);
        Self {
            agent: Arc::new(FakeAgent::new(cluster.clone())),
            cluster,
            starter: Arc::new(FakeStarter::default()),
            reporter: Arc::new(RecordingReporter::default()),
            prompter: Arc::new(ScriptedPrompter::default()),
            detector: Arc::new(NoDetection),
            debuggers: default_debuggers(),
        }
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn DebuggerDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_debuggers(mut self, debuggers: &[&str]) -> Self {
        self.debuggers = debuggers.iter().map(ToString::to_string).collect();
        self
    }

    pub fn context(&self) -> Context {
        Context {
            cluster: self.cluster.clone(),
            intents: self.agent.clone(),
            starter: self.starter.clone(),
            reporter: self.reporter.clone(),
            prompter: self.prompter.clone(),
            detector: self.detector.clone(),
            debuggers: self.debuggers.clone(),
            wait_policy: fast_wait_policy(),
        }
    }
}

/// Millisecond-scale wait policy so polling tests finish quickly.
pub fn fast_wait_policy() -> WaitPolicy {
    WaitPolicy {
        grace_period: Duration::from_millis(1),
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        timeout: Duration::from_millis(200),
    }
}
