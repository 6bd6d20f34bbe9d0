// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants used to find squash-owned resources.
//!
//! Debug pods created by squashctl or by the in-cluster agent carry the
//! debug-session label, so pod snapshots never include unrelated workloads.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on resources created by squashctl
pub const MANAGED_BY_SQUASHCTL: &str = "squashctl";

// ============================================================================
// Debug Session Labels
// ============================================================================

/// Label key marking pods created for a debug session
pub const DEBUG_SESSION_LABEL: &str = "squash";

/// Label value marking pods created for a debug session
pub const DEBUG_SESSION_VALUE: &str = "squash-debugger";

/// Label selector matching debug-session pods
pub const DEBUG_SESSION_SELECTOR: &str = "squash=squash-debugger";

// ============================================================================
// Agent Deployment Labels
// ============================================================================

/// Label key identifying the squash agent deployment
pub const AGENT_APP_LABEL: &str = "app";

/// Label value identifying the squash agent deployment
pub const AGENT_APP_VALUE: &str = "squash";

/// Label selector matching the squash agent deployment
pub const AGENT_DEPLOYMENT_SELECTOR: &str = "app=squash";

// ============================================================================
// Debug Pod Annotations
// ============================================================================

/// Annotation naming the pod being debugged
pub const TARGET_POD_ANNOTATION: &str = "squash.solo.io/target-pod";

/// Annotation naming the container being debugged
pub const TARGET_CONTAINER_ANNOTATION: &str = "squash.solo.io/target-container";
