// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Debugger auto-detection.

use k8s_openapi::api::core::v1::{Container, Pod};

/// Guesses which debugger suits a container.
///
/// `None` means "unknown" and is not an error: the resolver falls back to
/// asking the user.
pub trait DebuggerDetector: Send + Sync {
    fn detect(&self, pod: &Pod, container: &Container) -> Option<String>;
}

/// Detector with no heuristics; always answers "unknown".
#[derive(Debug, Default)]
pub struct NoDetection;

impl DebuggerDetector for NoDetection {
    fn detect(&self, _pod: &Pod, _container: &Container) -> Option<String> {
        None
    }
}
