// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::Result;
use kube::api::ApiResource;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Wait for a CRD to be served by the API server.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_crd(client: &Client, ar: &ApiResource) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match crd_served(client, ar).await {
            Ok(true) => {
                info!("{} ({}) is available", ar.kind, ar.api_version);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "{} ({}) not yet available, waiting {} seconds...",
                    ar.kind, ar.api_version, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for {} CRD: {}, retrying in {} seconds...",
                    ar.kind, e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Check if the API server serves the given kind in the given version.
#[instrument(skip(client, ar), fields(kind = %ar.kind, api_version = %ar.api_version))]
pub async fn crd_served(client: &Client, ar: &ApiResource) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[ar.group.as_str()])
        .run()
        .await?;

    for group in discovery.groups() {
        if group.name() == ar.group {
            for (served, _) in group.recommended_resources() {
                if served.kind == ar.kind && served.version == ar.version {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}
