// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Value validators attached to attributes, including Kubernetes naming rules.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// RFC 1123 label (namespace names, label name segments)
static DNS1123_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

/// RFC 1123 subdomain (object names, label/annotation key prefixes)
static DNS1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Name part of a qualified name, and label values
static QUALIFIED_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").unwrap());

pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;
pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
pub const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
pub const LABEL_VALUE_MAX_LENGTH: usize = 63;
pub const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Value must be one of the listed values
    OneOf(Vec<Value>),
    /// String must match the regular expression
    Pattern(String),
    /// String length bounds, inclusive
    Length { min: Option<u64>, max: Option<u64> },
    /// Numeric bounds, inclusive
    Range { min: Option<f64>, max: Option<f64> },
    Dns1123Subdomain,
    Dns1123Label,
    /// Keys of a map must be valid label keys
    LabelKeys,
    /// Values of a map must be valid label values
    LabelValues,
    /// Keys of a map must be valid annotation keys and the map must fit the size limit
    AnnotationKeys,
}

impl Validator {
    /// Check a value, returning a human readable reason when it is invalid.
    /// Values of the wrong JSON type are left to type validation.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Validator::OneOf(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(format!(
                        "must be one of {}",
                        allowed
                            .iter()
                            .map(|v| v.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                }
            }
            Validator::Pattern(pattern) => match value.as_str() {
                Some(s) => check_pattern(pattern, s),
                None => Ok(()),
            },
            Validator::Length { min, max } => match value.as_str() {
                Some(s) => check_length(s, *min, *max),
                None => Ok(()),
            },
            Validator::Range { min, max } => match value.as_f64() {
                Some(n) => check_range(n, *min, *max),
                None => Ok(()),
            },
            Validator::Dns1123Subdomain => match value.as_str() {
                Some(s) => is_dns1123_subdomain(s),
                None => Ok(()),
            },
            Validator::Dns1123Label => match value.as_str() {
                Some(s) => is_dns1123_label(s),
                None => Ok(()),
            },
            Validator::LabelKeys => for_each_entry(value, |k, _| {
                is_qualified_name(k).map_err(|e| format!("label key '{}' {}", k, e))
            }),
            Validator::LabelValues => for_each_entry(value, |k, v| match v.as_str() {
                Some(v) => is_label_value(v).map_err(|e| format!("label '{}' value {}", k, e)),
                None => Ok(()),
            }),
            Validator::AnnotationKeys => {
                for_each_entry(value, |k, _| {
                    is_qualified_name(k).map_err(|e| format!("annotation key '{}' {}", k, e))
                })?;
                check_annotation_size(value)
            }
        }
    }
}

fn for_each_entry(
    value: &Value,
    mut check: impl FnMut(&str, &Value) -> Result<(), String>,
) -> Result<(), String> {
    let Some(map) = value.as_object() else {
        return Ok(());
    };
    for (k, v) in map {
        check(k, v)?;
    }
    Ok(())
}

fn check_pattern(pattern: &str, s: &str) -> Result<(), String> {
    match Regex::new(pattern) {
        Ok(re) if re.is_match(s) => Ok(()),
        Ok(_) => Err(format!("must match the pattern '{}'", pattern)),
        Err(e) => {
            // Patterns come from CRD schemas and may use ECMA syntax the regex crate rejects
            debug!("Skipping unsupported pattern '{}': {}", pattern, e);
            Ok(())
        }
    }
}

fn check_length(s: &str, min: Option<u64>, max: Option<u64>) -> Result<(), String> {
    let len = s.chars().count() as u64;
    if let Some(min) = min {
        if len < min {
            return Err(format!("must be at least {} characters long", min));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(format!("must be at most {} characters long", max));
        }
    }
    Ok(())
}

fn check_range(n: f64, min: Option<f64>, max: Option<f64>) -> Result<(), String> {
    if let Some(min) = min {
        if n < min {
            return Err(format!("must be at least {}", min));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(format!("must be at most {}", max));
        }
    }
    Ok(())
}

pub fn is_dns1123_label(s: &str) -> Result<(), String> {
    if s.len() > DNS1123_LABEL_MAX_LENGTH {
        return Err(format!("must be no more than {} characters", DNS1123_LABEL_MAX_LENGTH));
    }
    if !DNS1123_LABEL_REGEX.is_match(s) {
        return Err(
            "must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

pub fn is_dns1123_subdomain(s: &str) -> Result<(), String> {
    if s.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        return Err(format!(
            "must be no more than {} characters",
            DNS1123_SUBDOMAIN_MAX_LENGTH
        ));
    }
    if !DNS1123_SUBDOMAIN_REGEX.is_match(s) {
        return Err(
            "must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

/// A qualified name is an optional DNS subdomain prefix and a name, separated by '/'
pub fn is_qualified_name(s: &str) -> Result<(), String> {
    let name = match s.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() {
                return Err("prefix part must be non-empty".to_string());
            }
            is_dns1123_subdomain(prefix).map_err(|e| format!("prefix part {}", e))?;
            name
        }
        None => s,
    };

    if name.is_empty() {
        return Err("name part must be non-empty".to_string());
    }
    if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        return Err(format!(
            "name part must be no more than {} characters",
            QUALIFIED_NAME_MAX_LENGTH
        ));
    }
    if !QUALIFIED_NAME_REGEX.is_match(name) {
        return Err(
            "name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

pub fn is_label_value(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Ok(());
    }
    if s.len() > LABEL_VALUE_MAX_LENGTH {
        return Err(format!("must be no more than {} characters", LABEL_VALUE_MAX_LENGTH));
    }
    if !QUALIFIED_NAME_REGEX.is_match(s) {
        return Err(
            "must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

fn check_annotation_size(value: &Value) -> Result<(), String> {
    let Some(map) = value.as_object() else {
        return Ok(());
    };
    let total: usize = map
        .iter()
        .map(|(k, v)| k.len() + v.as_str().map_or(0, str::len))
        .sum();
    if total > TOTAL_ANNOTATION_SIZE_LIMIT {
        return Err(format!(
            "annotations may not exceed {} bytes in total, got {}",
            TOTAL_ANNOTATION_SIZE_LIMIT, total
        ));
    }
    Ok(())
}
