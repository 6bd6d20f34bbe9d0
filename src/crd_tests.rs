// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::constants::{API_GROUP, API_GROUP_VERSION, API_VERSION, KIND_DEBUG_ATTACHMENT};
    use crate::crd::*;
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn test_debug_attachment_name_is_deterministic() {
        let first = debug_attachment_name("cart-7d9c5b6f4-x2k8q", "cart");
        let second = debug_attachment_name("cart-7d9c5b6f4-x2k8q", "cart");

        assert_eq!(first, second, "Same pair must always map to the same name");
        assert!(first.starts_with("cart-7d9c5b6f4-x2k8q-cart-"));
        assert_eq!(first.len(), "cart-7d9c5b6f4-x2k8q-cart-".len() + 8);
    }

    #[test]
    fn test_debug_attachment_name_differs_per_container() {
        assert_ne!(
            debug_attachment_name("svc-1", "app"),
            debug_attachment_name("svc-1", "sidecar")
        );
    }

    #[test]
    fn test_debug_attachment_name_separates_colliding_readable_parts() {
        let a = debug_attachment_name("a-b", "c");
        let b = debug_attachment_name("a", "b-c");

        assert!(a.starts_with("a-b-c-") && b.starts_with("a-b-c-"));
        assert_ne!(a, b, "Hash suffix must tell the pairs apart");
    }

    #[test]
    fn test_debug_attachment_name_is_dns_safe() {
        let name = debug_attachment_name("My_Pod.1", "App");

        assert!(name.starts_with("my-pod-1-app-"));
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_debug_attachment_name_truncates_long_names() {
        let pod = "p".repeat(300);
        let name = debug_attachment_name(&pod, "app");

        assert!(name.len() <= 253, "name has {} characters", name.len());
        assert!(!name.contains("--"));
    }

    #[test]
    fn test_debug_attachment_name_without_readable_part() {
        let name = debug_attachment_name("", "");
        assert_eq!(name.len(), 8);
    }

    #[test]
    fn test_debug_attachment_resource_identity() {
        assert_eq!(DebugAttachment::group(&()), API_GROUP);
        assert_eq!(DebugAttachment::version(&()), API_VERSION);
        assert_eq!(DebugAttachment::api_version(&()), API_GROUP_VERSION);
        assert_eq!(DebugAttachment::kind(&()), KIND_DEBUG_ATTACHMENT);

        let crd = DebugAttachment::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("debugattachments.squash.solo.io")
        );
    }

    #[test]
    fn test_spec_serializes_camel_case_and_skips_unset() {
        let spec = DebugAttachmentSpec {
            debugger: "dlv".to_string(),
            image: "example/app:1.0".to_string(),
            pod: "svc-1".to_string(),
            container: "app".to_string(),
            debug_namespace: None,
            process_name: Some("server".to_string()),
        };

        let value = serde_json::to_value(&spec).expect("spec serializes");
        assert_eq!(value["processName"], "server");
        assert!(value.get("debugNamespace").is_none());
    }

    #[test]
    fn test_status_state_round_trips_from_agent() {
        let status: DebugAttachmentStatus = serde_json::from_str(
            r#"{"state":"Attached","debuggerPod":"plank-x7k2p"}"#,
        )
        .expect("status deserializes");

        assert_eq!(status.state, Some(AttachmentState::Attached));
        assert_eq!(status.debugger_pod.as_deref(), Some("plank-x7k2p"));
        assert_eq!(status.message, None);
    }
}
