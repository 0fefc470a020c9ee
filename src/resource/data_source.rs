// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read-only lookup of an existing custom resource.

use super::{decode, spec_attribute, type_name_for, CustomResourceKind, DataSourceService, ResourceContext};
use crate::error::{ProviderError, Result};
use crate::kubernetes::get_object;
use crate::model::{metadata_attribute, ObjectData, ResourceData};
use crate::schema::validate::Mode;
use crate::schema::{Attribute, AttributeKind, AttributeType, Requirement, Schema};
use async_trait::async_trait;
use kube::api::ApiResource;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::instrument;

pub struct CustomResourceDataSource<K> {
    type_name: String,
    ar: ApiResource,
    schema: Schema,
    spec_attributes: Vec<Attribute>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: CustomResourceKind> CustomResourceDataSource<K> {
    pub fn new() -> Self {
        let ar = ApiResource::erase::<K>(&());
        let spec = Attribute {
            requirement: Requirement::Computed,
            ..spec_attribute::<K>()
        };
        let spec_attributes = match &spec.kind {
            AttributeKind::Nested { attributes, .. } => attributes.clone(),
            AttributeKind::Primitive(_) => Vec::new(),
        };
        let schema = Schema::new(
            &format!("Reads an existing {} ({})", ar.kind, ar.api_version),
            vec![
                Attribute::computed("id", AttributeType::String),
                Attribute::computed("api_version", AttributeType::String),
                Attribute::computed("kind", AttributeType::String),
                metadata_attribute(Requirement::Computed),
                spec,
            ],
        );

        Self {
            type_name: type_name_for(&ar),
            ar,
            schema,
            spec_attributes,
            _kind: PhantomData,
        }
    }
}

impl<K: CustomResourceKind> Default for CustomResourceDataSource<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: CustomResourceKind> DataSourceService for CustomResourceDataSource<K> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    #[instrument(skip(self, ctx, config), fields(type_name = %self.type_name))]
    async fn read(&self, ctx: Option<&ResourceContext>, config: Value) -> Result<Value> {
        let ctx = ctx.ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} needs a Kubernetes client", self.type_name))
        })?;
        let query: ObjectData = decode(&self.schema, config, Mode::Config)?;
        let namespace = &query.metadata.namespace;
        let name = &query.metadata.name;

        let object = get_object(&ctx.client, &self.ar, namespace, name)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}/{}", self.ar.kind, namespace, name)))?;

        let mut data = ResourceData::default();
        data.apply_response(&object, &self.spec_attributes);
        Ok(serde_json::to_value(ObjectData::from(data))?)
    }
}
