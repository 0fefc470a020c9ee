// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Managed resources and data sources exposed by the provider.

pub mod data_source;
pub mod managed;
pub mod manifest;

pub use data_source::CustomResourceDataSource;
pub use managed::CustomResourceType;
pub use manifest::CustomResourceManifest;

use crate::constants::TYPE_NAME_PREFIX;
use crate::error::{ProviderError, Result};
use crate::schema::openapi::{compile_property, crd_schema};
use crate::schema::validate::{validate, Mode};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject};
use kube::{Client, CustomResourceExt, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// What a configured provider hands to resources and data sources
#[derive(Clone)]
pub struct ResourceContext {
    pub client: Client,
    /// Field manager for resources that don't set their own
    pub field_manager: String,
}

/// Outcome of planning a change to a managed resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub planned_state: Value,
    /// Attribute paths whose change forces the resource to be replaced
    pub requires_replace: Vec<String>,
}

#[async_trait]
pub trait ResourceService: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Fill computed and defaulted attributes of the proposed state. A null proposal plans a destroy.
    fn plan(&self, prior: Option<Value>, proposed: Value, field_manager: &str) -> Result<PlanResult>;

    async fn create(&self, ctx: &ResourceContext, planned: Value) -> Result<Value>;

    /// Returns None when the object is gone and should be removed from state
    async fn read(&self, ctx: &ResourceContext, current: Value) -> Result<Option<Value>>;

    async fn update(&self, ctx: &ResourceContext, prior: Value, planned: Value) -> Result<Value>;

    async fn delete(&self, ctx: &ResourceContext, current: Value) -> Result<()>;

    /// Build full state for an existing object from a `namespace/name` identifier
    async fn import_state(&self, ctx: &ResourceContext, id: &str) -> Result<Value>;
}

#[async_trait]
pub trait DataSourceService: Send + Sync {
    fn type_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Whether reading needs a Kubernetes client
    fn requires_client(&self) -> bool {
        true
    }

    async fn read(&self, ctx: Option<&ResourceContext>, config: Value) -> Result<Value>;
}

/// Bounds of custom resource types the provider can expose
pub trait CustomResourceKind:
    Resource<DynamicType = ()> + CustomResourceExt + DeserializeOwned + Send + Sync + 'static
{
}

impl<K> CustomResourceKind for K where
    K: Resource<DynamicType = ()> + CustomResourceExt + DeserializeOwned + Send + Sync + 'static
{
}

/// `k8s_<group>_<kind>_<version>`, e.g. `k8s_rocketmq_apache_org_console_v1alpha1`
pub fn type_name_for(ar: &ApiResource) -> String {
    format!(
        "{}_{}_{}_{}",
        TYPE_NAME_PREFIX,
        ar.group.replace(['.', '-'], "_"),
        ar.kind.to_lowercase(),
        ar.version
    )
}

/// The `spec` attribute compiled from the CRD schema of `K`
pub fn spec_attribute<K: CustomResourceKind>() -> Attribute {
    let schema = crd_schema::<K>(&K::version(&()));
    let spec = schema.as_ref().and_then(|s| {
        let required = s.required.as_deref().unwrap_or_default();
        s.properties
            .as_ref()
            .and_then(|p| p.get("spec"))
            .map(|spec| compile_property("spec", spec, required.iter().any(|r| r == "spec")))
    });
    spec.unwrap_or_else(|| Attribute::optional("spec", AttributeType::Dynamic))
        .with_description(&format!("Specification of the desired behavior of the {}", K::kind(&())))
}

/// Validate a JSON value against a schema and deserialize it
pub fn decode<T: DeserializeOwned>(schema: &Schema, value: Value, mode: Mode) -> Result<T> {
    let Value::Object(map) = &value else {
        return Err(ProviderError::Validation(vec![Diagnostic::error(
            "",
            "Expected an object",
        )]));
    };

    let diagnostics: Vec<_> = validate(&schema.attributes, map, "", mode)
        .into_iter()
        .filter(Diagnostic::is_error)
        .collect();
    if !diagnostics.is_empty() {
        return Err(ProviderError::Validation(diagnostics));
    }

    Ok(serde_json::from_value(value)?)
}

/// Check that an object decodes as the typed custom resource
pub fn check_typed<K: CustomResourceKind>(object: &DynamicObject) -> Result<()> {
    let value = serde_json::to_value(object)?;
    serde_json::from_value::<K>(value).map(|_| ()).map_err(|e| {
        ProviderError::Validation(vec![Diagnostic::error(
            "spec",
            format!("Invalid {}", K::kind(&())),
        )
        .with_detail(e.to_string())])
    })
}
