// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Provider state of a managed custom resource and its conversion to API objects.

use crate::error::{ProviderError, Result};
use crate::schema::convert::{from_wire, to_wire};
use crate::schema::{Attribute, AttributeType, NestingMode, Requirement, Validator};
use kube::api::{ApiResource, DynamicObject, PropagationPolicy};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeletionPropagation {
    Orphan,
    #[default]
    Background,
    Foreground,
}

impl From<DeletionPropagation> for PropagationPolicy {
    fn from(value: DeletionPropagation) -> Self {
        match value {
            DeletionPropagation::Orphan => PropagationPolicy::Orphan,
            DeletionPropagation::Background => PropagationPolicy::Background,
            DeletionPropagation::Foreground => PropagationPolicy::Foreground,
        }
    }
}

/// Wait after create/update until the value at `jsonpath` equals `value`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WaitCondition {
    pub jsonpath: String,
    pub value: String,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

/// Wait after delete until the object is gone
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct WaitForDelete {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceMetadata {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// State of a namespaced custom resource. `spec` holds snake_case attribute names.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResourceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_conflicts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_propagation: Option<DeletionPropagation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_upsert: Option<Vec<WaitCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_delete: Option<WaitForDelete>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub metadata: ResourceMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Map<String, Value>>,
}

impl ResourceData {
    /// Fill optional-computed attributes the user left out
    pub fn with_defaults(mut self, ar: &ApiResource, field_manager: &str) -> Self {
        self.id = Some(self.resource_id());
        self.field_manager.get_or_insert_with(|| field_manager.to_string());
        self.force_conflicts.get_or_insert(false);
        self.deletion_propagation.get_or_insert_with(DeletionPropagation::default);
        self.api_version = Some(ar.api_version.clone());
        self.kind = Some(ar.kind.clone());
        self
    }

    /// `namespace/name`
    pub fn resource_id(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    pub fn field_manager_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.field_manager.as_deref().unwrap_or(default)
    }

    /// Build the object sent with server-side apply
    pub fn to_object(&self, ar: &ApiResource, spec_attributes: &[Attribute]) -> DynamicObject {
        let mut object =
            DynamicObject::new(&self.metadata.name, ar).within(&self.metadata.namespace);
        object.metadata.labels = self.metadata.labels.clone();
        object.metadata.annotations = self.metadata.annotations.clone();
        object.data = match &self.spec {
            Some(spec) => json!({ "spec": Value::Object(to_wire(spec_attributes, spec)) }),
            None => json!({}),
        };
        object
    }

    /// Copy identity, metadata and spec from an API server response
    pub fn apply_response(&mut self, object: &DynamicObject, spec_attributes: &[Attribute]) {
        self.metadata = ResourceMetadata {
            name: object.name_any(),
            namespace: object.namespace().unwrap_or_default(),
            labels: object.metadata.labels.clone().filter(|l| !l.is_empty()),
            annotations: object.metadata.annotations.clone().filter(|a| !a.is_empty()),
        };
        self.id = Some(self.resource_id());
        if let Some(types) = &object.types {
            self.api_version = Some(types.api_version.clone());
            self.kind = Some(types.kind.clone());
        }
        self.spec = object
            .data
            .get("spec")
            .and_then(Value::as_object)
            .map(|spec| from_wire(spec_attributes, spec));
    }

    /// Build state for an object that exists in the cluster but not in state yet
    pub fn from_object(
        object: &DynamicObject,
        ar: &ApiResource,
        spec_attributes: &[Attribute],
        field_manager: &str,
    ) -> Self {
        let mut data = ResourceData::default();
        data.apply_response(object, spec_attributes);
        data.with_defaults(ar, field_manager)
    }
}

/// State of data sources: identity, metadata and spec, without apply settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ObjectData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub metadata: ResourceMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Map<String, Value>>,
}

impl From<ResourceData> for ObjectData {
    fn from(data: ResourceData) -> Self {
        Self {
            id: data.id,
            api_version: data.api_version,
            kind: data.kind,
            metadata: data.metadata,
            spec: data.spec,
        }
    }
}

impl From<ObjectData> for ResourceData {
    fn from(data: ObjectData) -> Self {
        Self {
            id: data.id,
            api_version: data.api_version,
            kind: data.kind,
            metadata: data.metadata,
            spec: data.spec,
            ..Default::default()
        }
    }
}

/// Parse an import identifier of the form `namespace/name`
pub fn parse_import_id(id: &str) -> Result<(String, String)> {
    match id.split_once('/') {
        Some((namespace, name))
            if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((namespace.to_string(), name.to_string()))
        }
        _ => Err(ProviderError::InvalidImportId(id.to_string())),
    }
}

/// `metadata` block of resources and data sources
pub fn metadata_attribute(labels_and_annotations: Requirement) -> Attribute {
    Attribute::nested(
        "metadata",
        Requirement::Required,
        NestingMode::Single,
        vec![
            Attribute::required("name", AttributeType::String)
                .with_description("Unique name of the object within its namespace")
                .with_validator(Validator::Dns1123Subdomain)
                .with_requires_replace(),
            Attribute::required("namespace", AttributeType::String)
                .with_description("Namespace the object lives in")
                .with_validator(Validator::Dns1123Label)
                .with_requires_replace(),
            Attribute {
                requirement: labels_and_annotations,
                ..Attribute::optional("labels", AttributeType::map(AttributeType::String))
            }
            .with_description("Key/value pairs used to organize and categorize objects")
            .with_validator(Validator::LabelKeys)
            .with_validator(Validator::LabelValues),
            Attribute {
                requirement: labels_and_annotations,
                ..Attribute::optional("annotations", AttributeType::map(AttributeType::String))
            }
            .with_description("Unstructured key/value map stored with the object")
            .with_validator(Validator::AnnotationKeys),
        ],
    )
}

fn non_negative() -> Validator {
    Validator::Range {
        min: Some(0.0),
        max: None,
    }
}

/// Attributes of a managed resource whose spec compiles to `spec`
pub fn resource_attributes(spec: Attribute) -> Vec<Attribute> {
    let timeouts = || {
        vec![
            Attribute::optional("timeout", AttributeType::Int64)
                .with_description("Seconds to wait before giving up")
                .with_validator(non_negative()),
            Attribute::optional("poll_interval", AttributeType::Int64)
                .with_description("Maximum seconds between two checks")
                .with_validator(non_negative()),
        ]
    };

    vec![
        Attribute::computed("id", AttributeType::String)
            .with_description("Identifier of the form 'namespace/name'"),
        Attribute::optional_computed("field_manager", AttributeType::String)
            .with_description("Field manager used for server-side apply"),
        Attribute::optional_computed("force_conflicts", AttributeType::Bool)
            .with_description("Take ownership of fields managed by other field managers"),
        Attribute::optional_computed("deletion_propagation", AttributeType::String)
            .with_description("How dependents are garbage collected on delete")
            .with_validator(Validator::OneOf(vec![
                json!("Orphan"),
                json!("Background"),
                json!("Foreground"),
            ])),
        Attribute::nested(
            "wait_for_upsert",
            Requirement::Optional,
            NestingMode::List,
            [
                vec![
                    Attribute::required("jsonpath", AttributeType::String)
                        .with_description("Path into the object, e.g. '.status.phase'"),
                    Attribute::required("value", AttributeType::String)
                        .with_description("Expected value at the path"),
                ],
                timeouts(),
            ]
            .concat(),
        )
        .with_description("Conditions to wait for after create or update"),
        Attribute::nested(
            "wait_for_delete",
            Requirement::Optional,
            NestingMode::Single,
            timeouts(),
        )
        .with_description("Wait for the object to disappear after delete"),
        Attribute::computed("api_version", AttributeType::String),
        Attribute::computed("kind", AttributeType::String),
        metadata_attribute(Requirement::Optional),
        spec,
    ]
}
