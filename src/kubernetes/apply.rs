// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Server-side apply, get and delete of custom resources through the dynamic API

use crate::error::{ProviderError, Result};
use kube::{
    api::{ApiResource, DeleteParams, DynamicObject, Patch, PatchParams, PropagationPolicy},
    Api, Client, ResourceExt,
};
use tracing::{debug, info, instrument};

fn namespaced_api(client: &Client, ar: &ApiResource, namespace: &str) -> Api<DynamicObject> {
    Api::namespaced_with(client.clone(), namespace, ar)
}

/// Apply an object with server-side apply and return the object as stored by the API server
#[instrument(
    skip(client, ar, object),
    fields(
        kind = %ar.kind,
        object = %format!("{}/{}", object.namespace().unwrap_or_default(), object.name_any())
    )
)]
pub async fn apply_object(
    client: &Client,
    ar: &ApiResource,
    object: &DynamicObject,
    field_manager: &str,
    force: bool,
) -> Result<DynamicObject> {
    let name = object.name_any();
    let namespace = object.namespace().unwrap_or_default();
    let api = namespaced_api(client, ar, &namespace);

    let mut pp = PatchParams::apply(field_manager);
    if force {
        pp = pp.force();
    }

    debug!("Applying with field manager '{}' (force: {})", field_manager, force);
    let applied = api.patch(&name, &pp, &Patch::Apply(object)).await?;

    info!(
        "Applied {} {}/{} (resourceVersion {})",
        ar.kind,
        namespace,
        name,
        applied.resource_version().unwrap_or_default()
    );

    Ok(applied)
}

/// Get an object, or None if it does not exist
#[instrument(skip(client, ar), fields(kind = %ar.kind))]
pub async fn get_object(
    client: &Client,
    ar: &ApiResource,
    namespace: &str,
    name: &str,
) -> Result<Option<DynamicObject>> {
    let object = namespaced_api(client, ar, namespace).get_opt(name).await?;
    if object.is_none() {
        debug!("{} {}/{} not found", ar.kind, namespace, name);
    }
    Ok(object)
}

/// Delete an object. Returns false if the object was already gone.
#[instrument(skip(client, ar), fields(kind = %ar.kind))]
pub async fn delete_object(
    client: &Client,
    ar: &ApiResource,
    namespace: &str,
    name: &str,
    propagation: PropagationPolicy,
) -> Result<bool> {
    let dp = DeleteParams {
        propagation_policy: Some(propagation),
        ..Default::default()
    };

    match namespaced_api(client, ar, namespace)
        .delete(name, &dp)
        .await
        .map_err(ProviderError::from)
    {
        Ok(_) => {
            info!("Deleted {} {}/{}", ar.kind, namespace, name);
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            debug!("{} {}/{} already deleted", ar.kind, namespace, name);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
