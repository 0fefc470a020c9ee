// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Managed custom resources: create and update through server-side apply, read, delete and import.

use super::{check_typed, decode, spec_attribute, type_name_for, CustomResourceKind};
use super::{PlanResult, ResourceContext, ResourceService};
use crate::error::{ProviderError, Result};
use crate::kubernetes::{apply_object, delete_object, get_object, wait_for_conditions, wait_for_deletion};
use crate::model::{parse_import_id, resource_attributes, ResourceData};
use crate::schema::validate::Mode;
use crate::schema::{Attribute, AttributeKind, Schema};
use async_trait::async_trait;
use kube::api::ApiResource;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{info, instrument, warn};

/// A namespaced custom resource of type `K`, managed with server-side apply
pub struct CustomResourceType<K> {
    type_name: String,
    ar: ApiResource,
    schema: Schema,
    spec_attributes: Vec<Attribute>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: CustomResourceKind> CustomResourceType<K> {
    pub fn new() -> Self {
        let ar = ApiResource::erase::<K>(&());
        let spec = spec_attribute::<K>();
        let spec_attributes = match &spec.kind {
            AttributeKind::Nested { attributes, .. } => attributes.clone(),
            AttributeKind::Primitive(_) => Vec::new(),
        };
        let schema = Schema::new(
            &format!("{} ({}) managed with server-side apply", ar.kind, ar.api_version),
            resource_attributes(spec),
        );

        Self {
            type_name: type_name_for(&ar),
            ar,
            schema,
            spec_attributes,
            _kind: PhantomData,
        }
    }

    /// Apply the planned state and return the resulting state
    async fn apply(&self, ctx: &ResourceContext, data: ResourceData) -> Result<Value> {
        let mut data = data.with_defaults(&self.ar, &ctx.field_manager);
        let object = data.to_object(&self.ar, &self.spec_attributes);
        check_typed::<K>(&object)?;

        let applied = apply_object(
            &ctx.client,
            &self.ar,
            &object,
            data.field_manager_or(&ctx.field_manager),
            data.force_conflicts.unwrap_or(false),
        )
        .await?;
        data.apply_response(&applied, &self.spec_attributes);

        if let Some(conditions) = data.wait_for_upsert.as_deref().filter(|c| !c.is_empty()) {
            wait_for_conditions(
                &ctx.client,
                &self.ar,
                &data.metadata.namespace,
                &data.metadata.name,
                conditions,
            )
            .await?;
        }

        Ok(serde_json::to_value(data)?)
    }
}

impl<K: CustomResourceKind> Default for CustomResourceType<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: CustomResourceKind> ResourceService for CustomResourceType<K> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn plan(&self, prior: Option<Value>, proposed: Value, field_manager: &str) -> Result<PlanResult> {
        if proposed.is_null() {
            return Ok(PlanResult {
                planned_state: Value::Null,
                requires_replace: Vec::new(),
            });
        }

        let proposed: ResourceData = decode(&self.schema, proposed, Mode::Config)?;
        let planned = proposed.with_defaults(&self.ar, field_manager);

        let mut requires_replace = Vec::new();
        if let Some(prior) = prior.filter(|p| !p.is_null()) {
            let prior: ResourceData = decode(&self.schema, prior, Mode::State)?;
            if prior.metadata.name != planned.metadata.name {
                requires_replace.push("metadata.name".to_string());
            }
            if prior.metadata.namespace != planned.metadata.namespace {
                requires_replace.push("metadata.namespace".to_string());
            }
        }

        Ok(PlanResult {
            planned_state: serde_json::to_value(planned)?,
            requires_replace,
        })
    }

    #[instrument(skip(self, ctx, planned), fields(type_name = %self.type_name))]
    async fn create(&self, ctx: &ResourceContext, planned: Value) -> Result<Value> {
        let data: ResourceData = decode(&self.schema, planned, Mode::State)?;
        info!("Creating {}", data.resource_id());
        self.apply(ctx, data).await
    }

    #[instrument(skip(self, ctx, current), fields(type_name = %self.type_name))]
    async fn read(&self, ctx: &ResourceContext, current: Value) -> Result<Option<Value>> {
        let mut data: ResourceData = decode(&self.schema, current, Mode::State)?;

        let Some(object) = get_object(
            &ctx.client,
            &self.ar,
            &data.metadata.namespace,
            &data.metadata.name,
        )
        .await?
        else {
            warn!("{} no longer exists, removing it from state", data.resource_id());
            return Ok(None);
        };

        data.apply_response(&object, &self.spec_attributes);
        Ok(Some(serde_json::to_value(data)?))
    }

    #[instrument(skip(self, ctx, prior, planned), fields(type_name = %self.type_name))]
    async fn update(&self, ctx: &ResourceContext, prior: Value, planned: Value) -> Result<Value> {
        let prior: ResourceData = decode(&self.schema, prior, Mode::State)?;
        let planned: ResourceData = decode(&self.schema, planned, Mode::State)?;

        if prior.metadata.name != planned.metadata.name {
            return Err(ProviderError::ReplacementRequired("metadata.name".to_string()));
        }
        if prior.metadata.namespace != planned.metadata.namespace {
            return Err(ProviderError::ReplacementRequired("metadata.namespace".to_string()));
        }

        info!("Updating {}", planned.resource_id());
        self.apply(ctx, planned).await
    }

    #[instrument(skip(self, ctx, current), fields(type_name = %self.type_name))]
    async fn delete(&self, ctx: &ResourceContext, current: Value) -> Result<()> {
        let data: ResourceData = decode(&self.schema, current, Mode::State)?;
        let namespace = &data.metadata.namespace;
        let name = &data.metadata.name;

        let propagation = data.deletion_propagation.unwrap_or_default();
        let deleted = delete_object(&ctx.client, &self.ar, namespace, name, propagation.into()).await?;

        if let (true, Some(settings)) = (deleted, &data.wait_for_delete) {
            wait_for_deletion(&ctx.client, &self.ar, namespace, name, settings).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, ctx), fields(type_name = %self.type_name))]
    async fn import_state(&self, ctx: &ResourceContext, id: &str) -> Result<Value> {
        let (namespace, name) = parse_import_id(id)?;

        let object = get_object(&ctx.client, &self.ar, &namespace, &name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}", self.ar.kind, id)))?;

        info!("Importing {}", id);
        let data = ResourceData::from_object(&object, &self.ar, &self.spec_attributes, &ctx.field_manager);
        Ok(serde_json::to_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{console_json, console_path, not_found_json, MockService};
    use crate::types::Console;
    use serde_json::json;

    fn resource() -> CustomResourceType<Console> {
        CustomResourceType::new()
    }

    fn context(mock: &MockService) -> ResourceContext {
        ResourceContext {
            client: mock.clone().into_client(),
            field_manager: "console-provider".to_string(),
        }
    }

    fn config() -> Value {
        json!({
            "metadata": {
                "name": "console",
                "namespace": "rocketmq",
                "labels": { "app": "rocketmq-console" }
            },
            "spec": {
                "name_servers": "name-server-0:9876",
                "console_deployment": {
                    "spec": {
                        "replicas": 1,
                        "selector": { "match_labels": { "app": "rocketmq-console" } },
                        "template": {
                            "metadata": { "labels": { "app": "rocketmq-console" } },
                            "spec": {
                                "containers": [{
                                    "name": "console",
                                    "image": "apacherocketmq/rocketmq-console:2.0.0",
                                    "image_pull_policy": "IfNotPresent",
                                    "ports": [{ "container_port": 8080 }]
                                }]
                            }
                        }
                    }
                }
            }
        })
    }

    fn applied_spec() -> Value {
        json!({
            "nameServers": "name-server-0:9876",
            "consoleDeployment": {
                "spec": {
                    "replicas": 1,
                    "selector": { "matchLabels": { "app": "rocketmq-console" } },
                    "template": {
                        "metadata": { "labels": { "app": "rocketmq-console" } },
                        "spec": {
                            "containers": [{
                                "name": "console",
                                "image": "apacherocketmq/rocketmq-console:2.0.0",
                                "imagePullPolicy": "IfNotPresent",
                                "ports": [{ "containerPort": 8080, "protocol": "TCP" }]
                            }]
                        }
                    }
                }
            }
        })
    }

    fn planned() -> Value {
        resource()
            .plan(None, config(), "console-provider")
            .unwrap()
            .planned_state
    }

    #[test]
    fn test_schema_layout() {
        let resource = resource();
        assert_eq!(resource.type_name(), "k8s_rocketmq_apache_org_console_v1alpha1");

        let names: Vec<_> = resource
            .schema()
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "id",
                "field_manager",
                "force_conflicts",
                "deletion_propagation",
                "wait_for_upsert",
                "wait_for_delete",
                "api_version",
                "kind",
                "metadata",
                "spec"
            ]
        );
    }

    #[test]
    fn test_plan_fills_computed_attributes() {
        let plan = resource().plan(None, config(), "ops").unwrap();

        assert_eq!(plan.planned_state["id"], "rocketmq/console");
        assert_eq!(plan.planned_state["field_manager"], "ops");
        assert_eq!(plan.planned_state["force_conflicts"], false);
        assert_eq!(plan.planned_state["deletion_propagation"], "Background");
        assert_eq!(plan.planned_state["api_version"], "rocketmq.apache.org/v1alpha1");
        assert_eq!(plan.planned_state["kind"], "Console");
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn test_plan_detects_replacement() {
        let prior = planned();
        let mut proposed = config();
        proposed["metadata"]["name"] = json!("console-2");

        let plan = resource().plan(Some(prior), proposed, "console-provider").unwrap();
        assert_eq!(plan.requires_replace, vec!["metadata.name"]);
    }

    #[test]
    fn test_plan_detects_namespace_replacement() {
        let prior = planned();
        let mut proposed = config();
        proposed["metadata"]["namespace"] = json!("rocketmq-2");

        let plan = resource().plan(Some(prior), proposed, "console-provider").unwrap();
        assert_eq!(plan.requires_replace, vec!["metadata.namespace"]);
        assert_eq!(plan.planned_state["id"], "rocketmq-2/console");
    }

    #[test]
    fn test_plan_without_deployment_metadata() {
        let proposed = config();
        assert!(proposed["spec"]["console_deployment"].get("metadata").is_none());

        let plan = resource().plan(None, proposed, "console-provider").unwrap();
        assert!(plan.planned_state["spec"]["console_deployment"].get("metadata").is_none());
    }

    #[test]
    fn test_plan_rejects_negative_wait_settings() {
        let mut proposed = config();
        proposed["wait_for_delete"] = json!({ "timeout": -1 });
        proposed["wait_for_upsert"] = json!([{ "jsonpath": ".status.phase", "value": "Ready", "poll_interval": -5 }]);

        let err = resource().plan(None, proposed, "console-provider").unwrap_err();
        let ProviderError::Validation(diagnostics) = err else {
            panic!("expected validation error");
        };
        let attributes: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attributes, vec!["wait_for_upsert[0].poll_interval", "wait_for_delete.timeout"]);
        assert_eq!(diagnostics[1].detail.as_deref(), Some("must be at least 0"));
    }

    #[test]
    fn test_plan_destroy() {
        let plan = resource().plan(Some(planned()), Value::Null, "console-provider").unwrap();
        assert!(plan.planned_state.is_null());
    }

    #[test]
    fn test_plan_rejects_invalid_config() {
        let mut proposed = config();
        proposed["metadata"]["name"] = json!("Console");
        proposed["spec"]["console_deployment"]["spec"]["replicas"] = json!("one");
        proposed["id"] = json!("rocketmq/console");

        let err = resource().plan(None, proposed, "console-provider").unwrap_err();
        let ProviderError::Validation(diagnostics) = err else {
            panic!("expected validation error");
        };
        let attributes: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert!(attributes.contains(&"id"));
        assert!(attributes.contains(&"metadata.name"));
        assert!(attributes.contains(&"spec.console_deployment.spec.replicas"));
    }

    #[test]
    fn test_plan_requires_console_deployment() {
        let mut proposed = config();
        proposed["spec"] = json!({ "name_servers": "ns:9876" });

        let err = resource().plan(None, proposed, "console-provider").unwrap_err();
        assert!(err.to_string().contains("spec.console_deployment: Missing required attribute"));
    }

    #[tokio::test]
    async fn test_create_applies_and_stores_response() {
        let mock = MockService::new().on_patch(
            &console_path("rocketmq", "console"),
            200,
            &console_json("rocketmq", "console", applied_spec()),
        );

        let state = resource().create(&context(&mock), planned()).await.unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.method, "PATCH");
        assert!(request.query.contains("fieldManager=console-provider"));
        assert!(!request.query.contains("force=true"));
        assert_eq!(request.body["metadata"]["labels"]["app"], "rocketmq-console");
        assert_eq!(request.body["spec"]["nameServers"], "name-server-0:9876");
        assert_eq!(
            request.body["spec"]["consoleDeployment"]["spec"]["template"]["spec"]["containers"][0]
                ["imagePullPolicy"],
            "IfNotPresent"
        );
        assert!(request.body["spec"].get("name_servers").is_none());

        assert_eq!(state["id"], "rocketmq/console");
        assert_eq!(state["kind"], "Console");
        assert_eq!(
            state["spec"]["console_deployment"]["spec"]["template"]["spec"]["containers"][0]["ports"]
                [0],
            json!({ "container_port": 8080, "protocol": "TCP" })
        );
    }

    #[tokio::test]
    async fn test_create_with_force_conflicts() {
        let mock = MockService::new().on_patch(
            &console_path("rocketmq", "console"),
            200,
            &console_json("rocketmq", "console", applied_spec()),
        );
        let mut planned = planned();
        planned["force_conflicts"] = json!(true);
        planned["field_manager"] = json!("ops");

        resource().create(&context(&mock), planned).await.unwrap();

        let query = &mock.requests()[0].query;
        assert!(query.contains("force=true"));
        assert!(query.contains("fieldManager=ops"));
    }

    #[tokio::test]
    async fn test_create_waits_for_upsert_conditions() {
        let path = console_path("rocketmq", "console");
        let mut ready = serde_json::from_str::<Value>(&console_json("rocketmq", "console", applied_spec())).unwrap();
        ready["status"] = json!({ "phase": "Ready" });
        let mock = MockService::new()
            .on_patch(&path, 200, &console_json("rocketmq", "console", applied_spec()))
            .on_get(&path, 200, &ready.to_string());

        let mut planned = planned();
        planned["wait_for_upsert"] = json!([{ "jsonpath": ".status.phase", "value": "Ready" }]);

        resource().create(&context(&mock), planned).await.unwrap();

        let methods: Vec<_> = mock.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, vec!["PATCH", "GET"]);
    }

    #[tokio::test]
    async fn test_read_refreshes_state() {
        let mut spec = applied_spec();
        spec["nameServers"] = json!("name-server-1:9876");
        let mock = MockService::new().on_get(
            &console_path("rocketmq", "console"),
            200,
            &console_json("rocketmq", "console", spec),
        );

        let state = resource().read(&context(&mock), planned()).await.unwrap().unwrap();
        assert_eq!(state["spec"]["name_servers"], "name-server-1:9876");
        assert_eq!(state["field_manager"], "console-provider");
    }

    #[tokio::test]
    async fn test_read_removes_missing_object() {
        let mock = MockService::new();
        let state = resource().read(&context(&mock), planned()).await.unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_rename() {
        let mock = MockService::new();
        let mut renamed = planned();
        renamed["metadata"]["namespace"] = json!("other");

        let err = resource()
            .update(&context(&mock), planned(), renamed)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ReplacementRequired(ref a) if a == "metadata.namespace"));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_applies() {
        let mock = MockService::new().on_patch(
            &console_path("rocketmq", "console"),
            200,
            &console_json("rocketmq", "console", applied_spec()),
        );
        let mut changed = planned();
        changed["spec"]["console_deployment"]["spec"]["replicas"] = json!(2);

        resource().update(&context(&mock), planned(), changed).await.unwrap();

        assert_eq!(mock.requests()[0].body["spec"]["consoleDeployment"]["spec"]["replicas"], 2);
    }

    #[tokio::test]
    async fn test_update_with_force_conflicts() {
        let mock = MockService::new().on_patch(
            &console_path("rocketmq", "console"),
            200,
            &console_json("rocketmq", "console", applied_spec()),
        );
        let mut changed = planned();
        changed["force_conflicts"] = json!(true);

        let state = resource().update(&context(&mock), planned(), changed).await.unwrap();

        let request = &mock.requests()[0];
        assert_eq!(request.method, "PATCH");
        assert!(request.query.contains("force=true"));
        assert!(request.query.contains("fieldManager=console-provider"));
        assert_eq!(state["force_conflicts"], true);
    }

    #[tokio::test]
    async fn test_delete_uses_propagation_policy() {
        let status = json!({ "kind": "Status", "apiVersion": "v1", "status": "Success", "code": 200 });
        let mock = MockService::new().on_delete(
            &console_path("rocketmq", "console"),
            200,
            &status.to_string(),
        );
        let mut state = planned();
        state["deletion_propagation"] = json!("Foreground");

        resource().delete(&context(&mock), state).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body["propagationPolicy"], "Foreground");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_for_deletion() {
        let path = console_path("rocketmq", "console");
        let status = json!({ "kind": "Status", "apiVersion": "v1", "status": "Success", "code": 200 });
        let mock = MockService::new()
            .on_delete(&path, 200, &status.to_string())
            .on_get(&path, 200, &console_json("rocketmq", "console", applied_spec()))
            .on_get(&path, 404, &not_found_json("consoles", "console"));
        let mut state = planned();
        state["wait_for_delete"] = json!({ "timeout": 10 });

        resource().delete(&context(&mock), state).await.unwrap();

        let methods: Vec<_> = mock.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, vec!["DELETE", "GET", "GET"]);
    }

    #[tokio::test]
    async fn test_delete_already_gone() {
        let mock = MockService::new();
        let mut state = planned();
        state["wait_for_delete"] = json!({});

        resource().delete(&context(&mock), state).await.unwrap();
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_import_state() {
        let mock = MockService::new().on_get(
            &console_path("rocketmq", "console"),
            200,
            &console_json("rocketmq", "console", applied_spec()),
        );

        let state = resource()
            .import_state(&context(&mock), "rocketmq/console")
            .await
            .unwrap();

        assert_eq!(state["id"], "rocketmq/console");
        assert_eq!(state["metadata"]["name"], "console");
        assert_eq!(state["field_manager"], "console-provider");
        assert_eq!(state["deletion_propagation"], "Background");
        assert_eq!(state["spec"]["name_servers"], "name-server-0:9876");
    }

    #[tokio::test]
    async fn test_import_state_invalid_id() {
        let mock = MockService::new();
        let err = resource().import_state(&context(&mock), "console").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidImportId(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_import_state_missing_object() {
        let mock = MockService::new();
        let err = resource()
            .import_state(&context(&mock), "rocketmq/console")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
