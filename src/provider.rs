// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The provider: configuration, schema and dispatch of operations by type name.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::kubernetes::{create_client, crd_served};
use crate::resource::{
    CustomResourceDataSource, CustomResourceKind, CustomResourceManifest, CustomResourceType,
    DataSourceService, PlanResult, ResourceContext, ResourceService,
};
use crate::schema::{Attribute, AttributeType, ProviderSchema, Schema};
use crate::types::Console;
use kube::api::ApiResource;
use kube::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Provider {
    config: ProviderConfig,
    context: Option<ResourceContext>,
    kinds: Vec<ApiResource>,
    resources: BTreeMap<String, Arc<dyn ResourceService>>,
    data_sources: BTreeMap<String, Arc<dyn DataSourceService>>,
}

impl Provider {
    /// A provider exposing the RocketMQ Console
    pub fn new() -> Self {
        let mut provider = Self::empty();
        provider.register::<Console>();
        provider
    }

    /// A provider exposing nothing
    pub fn empty() -> Self {
        Self {
            config: ProviderConfig::default(),
            context: None,
            kinds: Vec::new(),
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    /// Expose a custom resource type as a resource, a data source and a manifest data source
    pub fn register<K: CustomResourceKind>(&mut self) {
        let resource = CustomResourceType::<K>::new();
        let data_source = CustomResourceDataSource::<K>::new();
        let manifest = CustomResourceManifest::<K>::new();

        debug!("Registering {}", resource.type_name());
        self.kinds.push(ApiResource::erase::<K>(&()));
        self.resources
            .insert(resource.type_name().to_string(), Arc::new(resource));
        self.data_sources
            .insert(data_source.type_name().to_string(), Arc::new(data_source));
        self.data_sources
            .insert(manifest.type_name().to_string(), Arc::new(manifest));
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: provider_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (name.clone(), r.schema().clone()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (name.clone(), d.schema().clone()))
                .collect(),
        }
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }

    /// Build the Kubernetes client, unless the provider is offline
    #[instrument(skip(self, config), fields(offline = config.offline))]
    pub async fn configure(&mut self, config: ProviderConfig) -> Result<()> {
        if config.offline {
            info!("Provider is offline, only manifest data sources are available");
            self.config = config;
            self.context = None;
            return Ok(());
        }

        let client = create_client(&config).await?;
        self.unserved_kinds(&client).await;

        self.configure_with_client(client, config);
        Ok(())
    }

    /// Kinds the cluster does not serve, or that could not be checked. Each one is logged as a warning.
    pub async fn unserved_kinds(&self, client: &Client) -> Vec<String> {
        let mut unserved = Vec::new();
        for ar in &self.kinds {
            match crd_served(client, ar).await {
                Ok(true) => {
                    debug!("{} ({}) is served", ar.kind, ar.api_version);
                    continue;
                }
                Ok(false) => warn!(
                    "{} ({}) is not served by the cluster, is the CRD installed?",
                    ar.kind, ar.api_version
                ),
                Err(e) => warn!("Could not check whether {} is served: {}", ar.kind, e),
            }
            unserved.push(ar.kind.clone());
        }
        unserved
    }

    /// Configure with an existing client
    pub fn configure_with_client(&mut self, client: Client, config: ProviderConfig) {
        self.context = Some(ResourceContext {
            client,
            field_manager: config.field_manager.clone(),
        });
        self.config = config;
    }

    fn resource(&self, type_name: &str) -> Result<&Arc<dyn ResourceService>> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownType(format!("resource {}", type_name)))
    }

    fn data_source(&self, type_name: &str) -> Result<&Arc<dyn DataSourceService>> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownType(format!("data source {}", type_name)))
    }

    fn context(&self) -> Result<&ResourceContext> {
        self.context.as_ref().ok_or_else(|| {
            if self.config.offline {
                ProviderError::NotConfigured("the provider is offline".to_string())
            } else {
                ProviderError::NotConfigured("configure the provider first".to_string())
            }
        })
    }

    pub fn plan(&self, type_name: &str, prior: Option<Value>, proposed: Value) -> Result<PlanResult> {
        self.resource(type_name)?
            .plan(prior, proposed, &self.config.field_manager)
    }

    pub async fn create(&self, type_name: &str, planned: Value) -> Result<Value> {
        let resource = self.resource(type_name)?;
        resource.create(self.context()?, planned).await
    }

    pub async fn read(&self, type_name: &str, current: Value) -> Result<Option<Value>> {
        let resource = self.resource(type_name)?;
        resource.read(self.context()?, current).await
    }

    pub async fn update(&self, type_name: &str, prior: Value, planned: Value) -> Result<Value> {
        let resource = self.resource(type_name)?;
        resource.update(self.context()?, prior, planned).await
    }

    pub async fn delete(&self, type_name: &str, current: Value) -> Result<()> {
        let resource = self.resource(type_name)?;
        resource.delete(self.context()?, current).await
    }

    pub async fn import_state(&self, type_name: &str, id: &str) -> Result<Value> {
        let resource = self.resource(type_name)?;
        resource.import_state(self.context()?, id).await
    }

    pub async fn read_data_source(&self, type_name: &str, config: Value) -> Result<Value> {
        let data_source = self.data_source(type_name)?;
        let ctx = if data_source.requires_client() {
            Some(self.context()?)
        } else {
            self.context.as_ref()
        };
        data_source.read(ctx, config).await
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_schema() -> Schema {
    Schema::new(
        "Manages Kubernetes custom resources with server-side apply",
        vec![
            Attribute::optional("kubeconfig", AttributeType::String)
                .with_description("Path to the kubeconfig file"),
            Attribute::optional("context", AttributeType::String)
                .with_description("Context to use from the kubeconfig"),
            Attribute::optional("offline", AttributeType::Bool)
                .with_description("Don't connect to a cluster, only render manifests"),
            Attribute::optional("field_manager", AttributeType::String)
                .with_description("Default field manager for server-side apply"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{console_json, console_path, MockService};
    use serde_json::json;

    const CONSOLE: &str = "k8s_rocketmq_apache_org_console_v1alpha1";
    const CONSOLE_MANIFEST: &str = "k8s_rocketmq_apache_org_console_v1alpha1_manifest";

    fn config() -> Value {
        json!({
            "metadata": { "name": "console", "namespace": "rocketmq" },
            "spec": {
                "console_deployment": {
                    "spec": {
                        "selector": { "match_labels": { "app": "console" } },
                        "template": {
                            "spec": { "containers": [{ "name": "console", "image": "console:2.0.0" }] }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_registered_types() {
        let provider = Provider::new();
        assert_eq!(provider.resource_types().collect::<Vec<_>>(), vec![CONSOLE]);
        assert_eq!(
            provider.data_source_types().collect::<Vec<_>>(),
            vec![CONSOLE, CONSOLE_MANIFEST]
        );
    }

    #[test]
    fn test_schema() {
        let schema = Provider::new().schema();
        assert!(schema.provider.attribute("offline").is_some());
        assert!(schema.resources[CONSOLE].attribute("spec").is_some());
        assert!(schema.data_sources[CONSOLE_MANIFEST].attribute("yaml").is_some());
    }

    #[test]
    fn test_unknown_type() {
        let err = Provider::new().plan("k8s_unknown", None, config()).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownType(_)));
    }

    #[tokio::test]
    async fn test_plan_uses_configured_field_manager() {
        let mut provider = Provider::new();
        provider.configure_with_client(
            MockService::new().into_client(),
            ProviderConfig {
                field_manager: "platform-team".to_string(),
                ..Default::default()
            },
        );
        let plan = provider.plan(CONSOLE, None, config()).unwrap();
        assert_eq!(plan.planned_state["field_manager"], "platform-team");
    }

    #[tokio::test]
    async fn test_unserved_kinds_when_crd_missing() {
        let client = MockService::new()
            .on_get("/apis", 200, &json!({ "kind": "APIGroupList", "apiVersion": "v1", "groups": [] }).to_string())
            .into_client();

        assert_eq!(Provider::new().unserved_kinds(&client).await, vec!["Console"]);
    }

    #[tokio::test]
    async fn test_unserved_kinds_when_discovery_fails() {
        let client = MockService::new()
            .on_get("/apis", 500, &json!({ "kind": "Status", "apiVersion": "v1", "status": "Failure", "code": 500 }).to_string())
            .into_client();

        assert_eq!(Provider::new().unserved_kinds(&client).await, vec!["Console"]);
    }

    #[tokio::test]
    async fn test_unserved_kinds_when_served() {
        let group_version = json!({ "groupVersion": "rocketmq.apache.org/v1alpha1", "version": "v1alpha1" });
        let groups = json!({
            "kind": "APIGroupList",
            "apiVersion": "v1",
            "groups": [{
                "name": "rocketmq.apache.org",
                "versions": [group_version],
                "preferredVersion": group_version
            }]
        });
        let resources = json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "rocketmq.apache.org/v1alpha1",
            "resources": [{
                "name": "consoles",
                "singularName": "console",
                "namespaced": true,
                "kind": "Console",
                "verbs": ["get", "patch", "delete"]
            }]
        });
        let client = MockService::new()
            .on_get("/apis", 200, &groups.to_string())
            .on_get("/apis/rocketmq.apache.org/v1alpha1", 200, &resources.to_string())
            .into_client();

        assert!(Provider::new().unserved_kinds(&client).await.is_empty());
    }

    #[tokio::test]
    async fn test_configure_fails_on_unreadable_kubeconfig() {
        let mut provider = Provider::new();
        let err = provider
            .configure(ProviderConfig {
                kubeconfig: Some("/nonexistent/kubeconfig".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::KubeconfigError(_)));
        assert!(provider.context.is_none());
    }

    #[tokio::test]
    async fn test_create_requires_configuration() {
        let provider = Provider::new();
        let planned = provider.plan(CONSOLE, None, config()).unwrap().planned_state;

        let err = provider.create(CONSOLE, planned).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_offline_provider_renders_manifests_only() {
        let mut provider = Provider::new();
        provider
            .configure(ProviderConfig {
                offline: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let manifest = provider.read_data_source(CONSOLE_MANIFEST, config()).await.unwrap();
        assert!(manifest["yaml"].as_str().unwrap().contains("kind: Console"));

        let err = provider
            .read_data_source(CONSOLE, json!({ "metadata": { "name": "console", "namespace": "rocketmq" } }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("offline"));
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let path = console_path("rocketmq", "console");
        let spec = json!({
            "consoleDeployment": {
                "spec": {
                    "selector": { "matchLabels": { "app": "console" } },
                    "template": { "spec": { "containers": [{ "name": "console", "image": "console:2.0.0" }] } }
                }
            }
        });
        let mock = MockService::new()
            .on_patch(&path, 200, &console_json("rocketmq", "console", spec.clone()))
            .on_get(&path, 200, &console_json("rocketmq", "console", spec));

        let mut provider = Provider::new();
        provider.configure_with_client(mock.clone().into_client(), ProviderConfig::default());

        let planned = provider.plan(CONSOLE, None, config()).unwrap().planned_state;
        let created = provider.create(CONSOLE, planned).await.unwrap();
        let read = provider.read(CONSOLE, created.clone()).await.unwrap().unwrap();

        assert_eq!(created, read);
        assert_eq!(read["id"], "rocketmq/console");
        assert_eq!(mock.requests().len(), 2);
    }
}
