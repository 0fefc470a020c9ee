// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::schema::openapi::crd_schema;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::JSONSchemaProps;
use kube::api::ApiResource;
use kube::{CustomResource, Resource};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// RocketMQ Console: a web console for a RocketMQ cluster, run as a Deployment
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(
    group = "rocketmq.apache.org",
    version = "v1alpha1",
    kind = "Console",
    plural = "consoles"
)]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleSpec {
    /// Name server addresses of the RocketMQ cluster, separated by semicolons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<String>,
    /// Deployment running the console
    #[schemars(schema_with = "console_deployment_schema")]
    pub console_deployment: Deployment,
}

/// Deployment schema with optional `metadata`; k8s-openapi marks it required
fn console_deployment_schema(gen: &mut SchemaGenerator) -> Schema {
    let mut schema = Deployment::json_schema(gen);
    if let Schema::Object(object) = &mut schema {
        object.object().required.remove("metadata");
    }
    schema
}

impl Console {
    pub fn api_resource() -> ApiResource {
        ApiResource::erase::<Console>(&())
    }

    /// The `openAPIV3Schema` of the served version
    pub fn openapi_schema() -> Option<JSONSchemaProps> {
        crd_schema::<Console>(&Console::version(&()))
    }
}
