// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for squashctl.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `DebugAttachment` CRD
pub const API_GROUP: &str = "squash.solo.io";

/// API version for the `DebugAttachment` CRD
pub const API_VERSION: &str = "v1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "squash.solo.io/v1";

/// Kind name for `DebugAttachment` resource
pub const KIND_DEBUG_ATTACHMENT: &str = "DebugAttachment";

/// Page size used when listing resources from the Kubernetes API
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Namespace Selection Constants
// ============================================================================

/// Namespace the squash agent itself is deployed into
pub const SQUASH_NAMESPACE: &str = "squash";

/// Prefix of namespaces reserved for Kubernetes system components
pub const RESERVED_NAMESPACE_PREFIX: &str = "kube-";

// ============================================================================
// Debugger Constants
// ============================================================================

/// Debuggers the debug container image is published for
pub const AVAILABLE_DEBUGGERS: &[&str] = &[
    "dlv", "gdb", "java", "java-port", "nodejs", "nodejs8", "python",
];

/// Default repository of the debug container images
pub const DEFAULT_CONTAINER_REPO: &str = "quay.io/solo-io";

/// Default tag of the debug container images
pub const DEFAULT_CONTAINER_VERSION: &str = "0.5.0";

/// Prefix of the debug container image name (`<repo>/plank-<debugger>:<version>`)
pub const DEBUG_IMAGE_PREFIX: &str = "plank-";

/// Port the debugger listens on inside the debug container
pub const DEBUGGER_REMOTE_PORT: u16 = 1235;

/// Default CRI socket mounted into the debug container
pub const DEFAULT_CRI_SOCK: &str = "/var/run/dockershim.sock";

// ============================================================================
// Timing Constants
// ============================================================================

/// Default timeout for a debug pod to become ready (5 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Grace period before the first look for an agent-created debug pod
pub const SECURE_MODE_GRACE_PERIOD_SECS: u64 = 3;

/// Initial poll interval while waiting for a debug pod
pub const POD_POLL_INITIAL_INTERVAL_MILLIS: u64 = 500;

/// Maximum poll interval while waiting for a debug pod
pub const POD_POLL_MAX_INTERVAL_SECS: u64 = 5;

/// Poll interval growth factor
pub const POD_POLL_MULTIPLIER: u32 = 2;

// ============================================================================
// Local Port Constants
// ============================================================================

/// First port of the IANA dynamic/ephemeral range
pub const EPHEMERAL_PORT_START: u16 = 49152;

/// Last port of the IANA dynamic/ephemeral range
pub const EPHEMERAL_PORT_END: u16 = 65535;

/// Address local ports are probed on
pub const LOCAL_BIND_ADDRESS: &str = "127.0.0.1";

// ============================================================================
// Configuration Constants
// ============================================================================

/// Directory under `$HOME` holding the squash config file
pub const CONFIG_DIR_NAME: &str = ".squash";

/// Name of the squash config file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Prefix of environment variables read by the configuration resolver
pub const ENV_PREFIX: &str = "SQUASH_";

/// Field manager name used for Kubernetes writes
pub const FIELD_MANAGER: &str = "squashctl";
