// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Offline rendering of a custom resource into a YAML manifest.

use super::{check_typed, decode, spec_attribute, type_name_for, CustomResourceKind, DataSourceService, ResourceContext};
use crate::constants::MANIFEST_SUFFIX;
use crate::error::Result;
use crate::model::{metadata_attribute, ObjectData, ResourceData};
use crate::schema::validate::Mode;
use crate::schema::{Attribute, AttributeKind, AttributeType, Requirement, Schema};
use async_trait::async_trait;
use kube::api::ApiResource;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, instrument};

pub struct CustomResourceManifest<K> {
    type_name: String,
    ar: ApiResource,
    schema: Schema,
    spec_attributes: Vec<Attribute>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: CustomResourceKind> CustomResourceManifest<K> {
    pub fn new() -> Self {
        let ar = ApiResource::erase::<K>(&());
        let spec = spec_attribute::<K>();
        let spec_attributes = match &spec.kind {
            AttributeKind::Nested { attributes, .. } => attributes.clone(),
            AttributeKind::Primitive(_) => Vec::new(),
        };
        let schema = Schema::new(
            &format!("Renders a {} ({}) manifest as YAML", ar.kind, ar.api_version),
            vec![
                Attribute::computed("id", AttributeType::String),
                Attribute::computed("api_version", AttributeType::String),
                Attribute::computed("kind", AttributeType::String),
                metadata_attribute(Requirement::Optional),
                spec,
                Attribute::computed("yaml", AttributeType::String)
                    .with_description("The rendered manifest"),
            ],
        );

        Self {
            type_name: format!("{}{}", type_name_for(&ar), MANIFEST_SUFFIX),
            ar,
            schema,
            spec_attributes,
            _kind: PhantomData,
        }
    }

    /// Render the manifest for validated data
    pub fn render(&self, data: &ResourceData) -> Result<String> {
        let object = data.to_object(&self.ar, &self.spec_attributes);
        check_typed::<K>(&object)?;
        Ok(serde_yaml::to_string(&object)?)
    }
}

impl<K: CustomResourceKind> Default for CustomResourceManifest<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: CustomResourceKind> DataSourceService for CustomResourceManifest<K> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn requires_client(&self) -> bool {
        false
    }

    #[instrument(skip(self, _ctx, config), fields(type_name = %self.type_name))]
    async fn read(&self, _ctx: Option<&ResourceContext>, config: Value) -> Result<Value> {
        let input: ObjectData = decode(&self.schema, config, Mode::Config)?;
        let mut data = ResourceData::from(input);
        data.id = Some(data.resource_id());
        data.api_version = Some(self.ar.api_version.clone());
        data.kind = Some(self.ar.kind.clone());

        let yaml = self.render(&data)?;
        debug!("Rendered manifest for {}", data.resource_id());

        let mut state = serde_json::to_value(ObjectData::from(data))?;
        state["yaml"] = Value::String(yaml);
        Ok(state)
    }
}
