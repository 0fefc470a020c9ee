// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for client creation, CRD discovery, server-side apply and waiting.

pub mod apply;
pub mod client;
pub mod crd;
pub mod wait;

pub use apply::{apply_object, delete_object, get_object};
pub use client::create_client;
pub use crd::{crd_served, wait_for_crd};
pub use wait::{wait_for_conditions, wait_for_deletion};
