// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Compiles CRD OpenAPI v3 schemas into attribute trees.

use super::{Attribute, AttributeKind, AttributeType, NestingMode, Requirement, Validator};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    JSONSchemaProps, JSONSchemaPropsOrArray, JSONSchemaPropsOrBool,
};
use kube::CustomResourceExt;

/// The OpenAPI v3 schema of the given version of a custom resource
pub fn crd_schema<K: CustomResourceExt>(version: &str) -> Option<JSONSchemaProps> {
    K::crd()
        .spec
        .versions
        .into_iter()
        .find(|v| v.name == version)
        .and_then(|v| v.schema)
        .and_then(|s| s.open_api_v3_schema)
}

/// Compile the properties of an object schema into attributes, sorted by name
pub fn compile(props: &JSONSchemaProps) -> Vec<Attribute> {
    let required = props.required.as_deref().unwrap_or_default();
    let mut attributes: Vec<Attribute> = props
        .properties
        .iter()
        .flatten()
        .map(|(json_name, child)| compile_property(json_name, child, required.contains(json_name)))
        .collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
    attributes
}

/// Compile a single property of an object schema
pub fn compile_property(json_name: &str, props: &JSONSchemaProps, required: bool) -> Attribute {
    let requirement = if required {
        Requirement::Required
    } else {
        Requirement::Optional
    };

    let kind = match nested_mode(props) {
        Some((mode, object)) => AttributeKind::Nested {
            mode,
            attributes: compile(object),
        },
        None => AttributeKind::Primitive(primitive_type(props)),
    };

    Attribute {
        name: to_snake_case(json_name),
        json_name: json_name.to_string(),
        description: props.description.clone(),
        requirement,
        kind,
        validators: validators(props),
        requires_replace: false,
    }
}

/// Whether the schema is an object with declared properties, or a list/map of such objects.
/// Returns the nesting mode and the schema holding the properties.
fn nested_mode(props: &JSONSchemaProps) -> Option<(NestingMode, &JSONSchemaProps)> {
    if is_int_or_string(props) {
        return None;
    }
    match props.type_.as_deref() {
        Some("object") if has_properties(props) => Some((NestingMode::Single, props)),
        Some("object") => match &props.additional_properties {
            Some(JSONSchemaPropsOrBool::Schema(inner)) if is_object_with_properties(inner) => {
                Some((NestingMode::Map, inner.as_ref()))
            }
            _ => None,
        },
        Some("array") => match &props.items {
            Some(JSONSchemaPropsOrArray::Schema(inner)) if is_object_with_properties(inner) => {
                Some((NestingMode::List, inner.as_ref()))
            }
            _ => None,
        },
        _ => None,
    }
}

/// The type of a schema that has no nested attributes
pub fn primitive_type(props: &JSONSchemaProps) -> AttributeType {
    if is_int_or_string(props) {
        return AttributeType::IntOrString;
    }
    match props.type_.as_deref() {
        Some("string") => AttributeType::String,
        Some("integer") => AttributeType::Int64,
        Some("number") => AttributeType::Float64,
        Some("boolean") => AttributeType::Bool,
        Some("array") => match &props.items {
            Some(JSONSchemaPropsOrArray::Schema(inner)) => AttributeType::list(primitive_type(inner)),
            _ => AttributeType::list(AttributeType::Dynamic),
        },
        Some("object") => match &props.additional_properties {
            Some(JSONSchemaPropsOrBool::Schema(inner)) => AttributeType::map(primitive_type(inner)),
            _ => AttributeType::Dynamic,
        },
        _ => AttributeType::Dynamic,
    }
}

fn is_int_or_string(props: &JSONSchemaProps) -> bool {
    if props.x_kubernetes_int_or_string == Some(true) {
        return true;
    }
    let Some(any_of) = &props.any_of else {
        return false;
    };
    let types: Vec<&str> = any_of.iter().filter_map(|p| p.type_.as_deref()).collect();
    types.len() == 2 && types.contains(&"integer") && types.contains(&"string")
}

fn has_properties(props: &JSONSchemaProps) -> bool {
    props.properties.as_ref().is_some_and(|p| !p.is_empty())
}

fn is_object_with_properties(props: &JSONSchemaProps) -> bool {
    props.type_.as_deref() == Some("object") && has_properties(props)
}

fn validators(props: &JSONSchemaProps) -> Vec<Validator> {
    let mut validators = Vec::new();
    if let Some(values) = &props.enum_ {
        let allowed: Vec<_> = values.iter().map(|v| v.0.clone()).filter(|v| !v.is_null()).collect();
        if !allowed.is_empty() {
            validators.push(Validator::OneOf(allowed));
        }
    }
    if let Some(pattern) = &props.pattern {
        validators.push(Validator::Pattern(pattern.clone()));
    }
    if props.min_length.is_some() || props.max_length.is_some() {
        validators.push(Validator::Length {
            min: props.min_length.and_then(|v| u64::try_from(v).ok()),
            max: props.max_length.and_then(|v| u64::try_from(v).ok()),
        });
    }
    if props.minimum.is_some() || props.maximum.is_some() {
        validators.push(Validator::Range {
            min: props.minimum,
            max: props.maximum,
        });
    }
    validators
}

/// Convert a camelCase field name to snake_case, keeping acronyms together
/// (`hostIPC` becomes `host_ipc`, `podIPs` becomes `pod_i_ps`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == '.' || c == '$' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            continue;
        }
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
