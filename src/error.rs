// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::schema::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to parse kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid configuration: {}", format_diagnostics(.0))]
    Validation(Vec<Diagnostic>),

    #[error("Expected import identifier with format: `namespace/name`, got: {0}")]
    InvalidImportId(String),

    #[error("Attribute {0} cannot be updated in place, the resource must be replaced")]
    ReplacementRequired(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Whether this is a 404 from the Kubernetes API
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::KubeError(kube::Error::Api(err)) if err.code == 404)
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
