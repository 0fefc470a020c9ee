// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation from provider configuration

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Create a Kubernetes client for the configured cluster
#[instrument(skip(config), fields(kubeconfig = ?config.kubeconfig, context = ?config.context))]
pub async fn create_client(config: &ProviderConfig) -> Result<Client> {
    let options = kubeconfig_options(config);

    let client_config = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = read_kubeconfig(path).await?;
            KConfig::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| {
                    ProviderError::KubeconfigError(format!("Failed to create config: {}", e))
                })?
        }
        None if options.context.is_some() => KConfig::from_kubeconfig(&options)
            .await
            .map_err(|e| ProviderError::KubeconfigError(format!("Failed to create config: {}", e)))?,
        None => KConfig::infer()
            .await
            .map_err(|e| ProviderError::KubeconfigError(format!("Failed to infer config: {}", e)))?,
    };

    info!("Using Kubernetes API server {}", client_config.cluster_url);

    Client::try_from(client_config)
        .map_err(|e| ProviderError::KubeconfigError(format!("Failed to create client: {}", e)))
}

fn kubeconfig_options(config: &ProviderConfig) -> KubeConfigOptions {
    KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    }
}

/// Read and parse a kubeconfig file
async fn read_kubeconfig(path: &Path) -> Result<Kubeconfig> {
    debug!("Reading kubeconfig from {}", path.display());

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ProviderError::KubeconfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_kubeconfig(&content)
}

/// Parse a kubeconfig document
pub fn parse_kubeconfig(content: &str) -> Result<Kubeconfig> {
    serde_yaml::from_str(content)
        .map_err(|e| ProviderError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
  - name: dev
    cluster:
      server: https://127.0.0.1:6443
contexts:
  - name: dev
    context:
      cluster: dev
      user: dev
      namespace: rocketmq
current-context: dev
users:
  - name: dev
    user:
      token: abc
"#;

    #[test]
    fn test_parse_kubeconfig() {
        let kubeconfig = parse_kubeconfig(KUBECONFIG).unwrap();
        assert_eq!(kubeconfig.current_context.as_deref(), Some("dev"));
        assert_eq!(kubeconfig.clusters.len(), 1);
    }

    #[test]
    fn test_parse_kubeconfig_invalid() {
        let err = parse_kubeconfig("clusters: [").unwrap_err();
        assert!(matches!(err, ProviderError::KubeconfigError(_)));
    }

    #[test]
    fn test_kubeconfig_options_context() {
        let config = ProviderConfig {
            context: Some("dev".to_string()),
            ..Default::default()
        };
        assert_eq!(kubeconfig_options(&config).context.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_create_client_from_file() {
        let path = std::env::temp_dir().join(format!("console-provider-{}.yaml", std::process::id()));
        tokio::fs::write(&path, KUBECONFIG).await.unwrap();

        let config = ProviderConfig {
            kubeconfig: Some(path.clone()),
            ..Default::default()
        };
        let client = create_client(&config).await;
        tokio::fs::remove_file(&path).await.unwrap();

        let client = client.unwrap();
        assert_eq!(client.default_namespace(), "rocketmq");
    }

    #[tokio::test]
    async fn test_create_client_missing_file() {
        let config = ProviderConfig {
            kubeconfig: Some("/nonexistent/kubeconfig".into()),
            ..Default::default()
        };
        let Err(err) = create_client(&config).await else {
            panic!("expected an error for a missing kubeconfig");
        };
        assert!(err.to_string().contains("Failed to read /nonexistent/kubeconfig"));
    }
}
