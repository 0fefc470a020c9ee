// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{env as vars, DEFAULT_FIELD_MANAGER};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Provider configuration, loaded from environment variables or a provider block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Path to a kubeconfig file. Falls back to in-cluster or default kubeconfig discovery.
    pub kubeconfig: Option<PathBuf>,
    /// Context to select from the kubeconfig
    pub context: Option<String>,
    /// Skip building a Kubernetes client. Only manifest data sources work in this mode.
    pub offline: bool,
    /// Field manager applied to resources that don't set their own
    pub field_manager: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            offline: false,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let kubeconfig = env::var(vars::KUBECONFIG)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let context = env::var(vars::CONTEXT).ok().filter(|v| !v.is_empty());
        let offline = match env::var(vars::OFFLINE) {
            Ok(v) => v
                .parse()
                .with_context(|| format!("{} must be 'true' or 'false', got '{}'", vars::OFFLINE, v))?,
            Err(_) => false,
        };
        let field_manager = env::var(vars::FIELD_MANAGER)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FIELD_MANAGER.to_string());

        Ok(ProviderConfig {
            kubeconfig,
            context,
            offline,
            field_manager,
        })
    }

    /// Load configuration from a JSON provider block
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).context("Invalid provider configuration")
    }
}
