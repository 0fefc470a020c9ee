// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Polling for conditions on applied objects and for deletion to complete.

use crate::constants::wait::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS, INITIAL_POLL_MILLIS};
use crate::error::{ProviderError, Result};
use crate::kubernetes::apply::get_object;
use crate::model::{WaitCondition, WaitForDelete};
use kube::api::ApiResource;
use kube::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

/// Wait until every condition holds on the object, one after the other
#[instrument(skip(client, ar, conditions), fields(kind = %ar.kind))]
pub async fn wait_for_conditions(
    client: &Client,
    ar: &ApiResource,
    namespace: &str,
    name: &str,
    conditions: &[WaitCondition],
) -> Result<()> {
    for condition in conditions {
        let what = format!(
            "{} {}/{} to have {} = {}",
            ar.kind, namespace, name, condition.jsonpath, condition.value
        );
        poll_until(&what, condition.timeout, condition.poll_interval, move || async move {
            let Some(object) = get_object(client, ar, namespace, name).await? else {
                return Ok(false);
            };
            let object = serde_json::to_value(&object)?;
            let found = lookup(&object, &condition.jsonpath);
            debug!("{} is {:?}", condition.jsonpath, found);
            Ok(found.is_some_and(|v| matches_expected(v, &condition.value)))
        })
        .await?;
    }
    Ok(())
}

/// Wait until the object no longer exists
#[instrument(skip(client, ar, settings), fields(kind = %ar.kind))]
pub async fn wait_for_deletion(
    client: &Client,
    ar: &ApiResource,
    namespace: &str,
    name: &str,
    settings: &WaitForDelete,
) -> Result<()> {
    let what = format!("{} {}/{} to be deleted", ar.kind, namespace, name);
    poll_until(&what, settings.timeout, settings.poll_interval, move || async move {
        Ok(get_object(client, ar, namespace, name).await?.is_none())
    })
    .await
}

/// Call `check` with exponential backoff until it returns true or the timeout passes
async fn poll_until<F, Fut>(
    what: &str,
    timeout: Option<u64>,
    poll_interval: Option<u64>,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let timeout = Duration::from_secs(timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
    let max_interval = Duration::from_secs(poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS).max(1));
    // None when the timeout is too large to represent: wait without a deadline
    let deadline = Instant::now().checked_add(timeout);
    let mut interval = Duration::from_millis(INITIAL_POLL_MILLIS).min(max_interval);

    info!("Waiting for {} (timeout {:?})", what, timeout);
    loop {
        if check().await? {
            info!("Done waiting for {}", what);
            return Ok(());
        }

        let now = Instant::now();
        let pause = match deadline {
            Some(deadline) if now >= deadline => {
                return Err(ProviderError::Timeout(format!(
                    "waiting for {} after {:?}",
                    what, timeout
                )));
            }
            Some(deadline) => interval.min(deadline - now),
            None => interval,
        };

        sleep(pause).await;
        interval = (interval * 2).min(max_interval);
    }
}

/// Compare a found value with the expected string form
fn matches_expected(found: &Value, expected: &str) -> bool {
    match found {
        Value::String(s) => s == expected,
        Value::Null => expected.is_empty() || expected == "null",
        other => other.to_string() == expected,
    }
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Resolve a JSONPath subset: `$.a.b`, `.a.b`, `a.b[0].c`, `.metadata.labels['app.kubernetes.io/name']`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path)?;
    segments.iter().try_fold(value, |current, segment| match segment {
        Segment::Key(key) => current.get(*key),
        Segment::Index(i) => current.get(*i),
    })
}

fn parse_path(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut rest = path.trim();
    rest = rest.strip_prefix('$').unwrap_or(rest);
    let mut segments = Vec::new();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix('[') {
            let after = after.trim_start();
            match after.chars().next() {
                Some(quote @ ('\'' | '"')) => {
                    // Quoted keys may contain ']' and '.', so look for the closing quote first
                    let key_start = &after[1..];
                    let end = key_start.find(quote)?;
                    segments.push(Segment::Key(&key_start[..end]));
                    rest = key_start[end + 1..].trim_start().strip_prefix(']')?;
                }
                _ => {
                    let end = after.find(']')?;
                    segments.push(Segment::Index(after[..end].trim().parse().ok()?));
                    rest = &after[end + 1..];
                }
            }
            continue;
        }
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        segments.push(Segment::Key(&rest[..end]));
        rest = &rest[end..];
    }

    Some(segments)
}
