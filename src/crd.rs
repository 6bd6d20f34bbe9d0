// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for debug attachment intents.
//!
//! A [`DebugAttachment`] is the declarative record "attach debugger X to
//! container Y in pod Z". squashctl creates it in secure mode; the in-cluster
//! squash agent reconciles it into a debugger pod and owns its status and
//! cleanup.
//!
//! # Example
//!
//! ```rust
//! use squashctl::crd::{debug_attachment_name, DebugAttachmentSpec};
//!
//! let spec = DebugAttachmentSpec {
//!     debugger: "dlv".to_string(),
//!     image: "registry.example.com/shop/cart:1.4.2".to_string(),
//!     pod: "cart-7d9c5b6f4-x2k8q".to_string(),
//!     container: "cart".to_string(),
//!     debug_namespace: None,
//!     process_name: None,
//! };
//!
//! let name = debug_attachment_name(&spec.pod, &spec.container);
//! assert!(name.starts_with("cart-7d9c5b6f4-x2k8q-cart-"));
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum length of a Kubernetes object name (DNS-1123 subdomain)
const MAX_NAME_LEN: usize = 253;

/// Number of hex digits of the (pod, container) digest appended to names
const NAME_HASH_LEN: usize = 8;

/// `DebugAttachment` asks the squash agent to attach a debugger to a container.
///
/// # Example
///
/// ```yaml
/// apiVersion: squash.solo.io/v1
/// kind: DebugAttachment
/// metadata:
///   name: cart-7d9c5b6f4-x2k8q-cart-1f0c9a3e
///   namespace: shop
/// spec:
///   debugger: dlv
///   image: registry.example.com/shop/cart:1.4.2
///   pod: cart-7d9c5b6f4-x2k8q
///   container: cart
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "squash.solo.io",
    version = "v1",
    kind = "DebugAttachment",
    namespaced,
    shortname = "da",
    doc = "DebugAttachment records the intent to attach a debugger to a container of a running pod. The squash agent reconciles it into a privileged debugger pod on the target's node."
)]
#[kube(status = "DebugAttachmentStatus")]
#[kube(printcolumn = r#"{"name":"Pod","type":"string","jsonPath":".spec.pod"}"#)]
#[kube(printcolumn = r#"{"name":"Container","type":"string","jsonPath":".spec.container"}"#)]
#[kube(printcolumn = r#"{"name":"Debugger","type":"string","jsonPath":".spec.debugger"}"#)]
#[kube(printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#)]
#[serde(rename_all = "camelCase")]
pub struct DebugAttachmentSpec {
    /// Debugger to attach (e.g. "dlv", "gdb").
    pub debugger: String,

    /// Image of the target container, used by the agent to validate the target.
    pub image: String,

    /// Name of the pod to debug.
    pub pod: String,

    /// Name of the container to debug.
    pub container: String,

    /// Namespace the debugger pod should be created in, when not the target's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_namespace: Option<String>,

    /// Process to attach to inside the container, when not its main process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
}

/// Status written by the squash agent.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebugAttachmentStatus {
    /// Lifecycle state reported by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<AttachmentState>,

    /// Name of the debugger pod the agent created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debugger_pod: Option<String>,

    /// Human-readable detail for the current state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Lifecycle of a [`DebugAttachment`] as reconciled by the agent.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum AttachmentState {
    PendingAttachment,
    Attaching,
    Attached,
    PendingDelete,
    Error,
}

/// Deterministic `DebugAttachment` name for a (pod, container) pair.
///
/// The readable part is `<pod>-<container>` sanitised to DNS-1123; the suffix
/// is the first eight hex digits of `sha256("<pod>/<container>")`, so pairs
/// whose readable parts collide (`a-b`/`c` and `a`/`b-c`) still get
/// different names. Repeated calls with the same pair return the same name.
#[must_use]
pub fn debug_attachment_name(pod: &str, container: &str) -> String {
    let digest = Sha256::digest(format!("{pod}/{container}").as_bytes());
    let hash = format!("{digest:x}");
    let hash = &hash[..NAME_HASH_LEN];

    let mut readable = sanitize_name(&format!("{pod}-{container}"));
    let max_readable = MAX_NAME_LEN - NAME_HASH_LEN - 1;
    if readable.len() > max_readable {
        readable.truncate(max_readable);
        readable = readable.trim_end_matches('-').to_string();
    }

    if readable.is_empty() {
        hash.to_string()
    } else {
        format!("{readable}-{hash}")
    }
}

/// Lower-case `raw` and replace anything outside `[a-z0-9-]` with `-`.
fn sanitize_name(raw: &str) -> String {
    let mapped: String = raw
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect();
    mapped.trim_matches('-').to_string()
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
