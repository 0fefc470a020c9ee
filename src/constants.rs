// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Identity of the RocketMQ Console custom resource
pub mod console {
    pub const GROUP: &str = "rocketmq.apache.org";
    pub const VERSION: &str = "v1alpha1";
    pub const KIND: &str = "Console";
    pub const PLURAL: &str = "consoles";
}

/// Prefix of every resource and data source type name exposed by the provider
pub const TYPE_NAME_PREFIX: &str = "k8s";

/// Suffix of the offline manifest data source type names
pub const MANIFEST_SUFFIX: &str = "_manifest";

/// The field manager used for server-side apply when none is configured
pub const DEFAULT_FIELD_MANAGER: &str = "console-provider";

/// Polling configuration for wait_for_upsert and wait_for_delete
pub mod wait {
    /// Default overall timeout in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default maximum polling interval in seconds (exponential backoff cap)
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
    /// First polling interval in milliseconds
    pub const INITIAL_POLL_MILLIS: u64 = 250;
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Environment variables read by the provider configuration
pub mod env {
    pub const KUBECONFIG: &str = "KUBECONFIG";
    pub const CONTEXT: &str = "KUBE_CONTEXT";
    pub const OFFLINE: &str = "CONSOLE_PROVIDER_OFFLINE";
    pub const FIELD_MANAGER: &str = "CONSOLE_PROVIDER_FIELD_MANAGER";
}
