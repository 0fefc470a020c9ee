// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Checks provider configuration and state against an attribute tree.

use super::{Attribute, AttributeKind, AttributeType, Diagnostic, NestingMode};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// User configuration: computed-only attributes must not be set
    Config,
    /// Prior state or planned state: computed attributes may carry values
    State,
}

/// Validate an object against the given attributes. `path` prefixes attribute paths in diagnostics.
pub fn validate(
    attributes: &[Attribute],
    object: &Map<String, Value>,
    path: &str,
    mode: Mode,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_object(attributes, object, path, mode, &mut diagnostics);
    diagnostics
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn validate_object(
    attributes: &[Attribute],
    object: &Map<String, Value>,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for key in object.keys() {
        if !attributes.iter().any(|a| &a.name == key) {
            diagnostics.push(
                Diagnostic::error(&join(path, key), "Unsupported attribute")
                    .with_detail(format!("An attribute named \"{}\" is not expected here", key)),
            );
        }
    }

    for attr in attributes {
        let attr_path = join(path, &attr.name);
        match object.get(&attr.name) {
            None | Some(Value::Null) => {
                if attr.is_required() {
                    diagnostics.push(Diagnostic::error(&attr_path, "Missing required attribute"));
                }
            }
            Some(value) => {
                if mode == Mode::Config && !attr.is_settable() {
                    diagnostics.push(
                        Diagnostic::error(&attr_path, "Invalid configuration")
                            .with_detail("This attribute is computed and cannot be set"),
                    );
                    continue;
                }
                validate_value(attr, value, &attr_path, mode, diagnostics);
            }
        }
    }
}

fn validate_value(
    attr: &Attribute,
    value: &Value,
    path: &str,
    mode: Mode,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match &attr.kind {
        AttributeKind::Primitive(ty) => {
            if let Err(detail) = check_type(ty, value) {
                diagnostics.push(Diagnostic::error(path, "Incorrect attribute value type").with_detail(detail));
                return;
            }
        }
        AttributeKind::Nested { mode: nesting, attributes } => match (nesting, value) {
            (NestingMode::Single, Value::Object(map)) => {
                validate_object(attributes, map, path, mode, diagnostics);
            }
            (NestingMode::List, Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    match item {
                        Value::Object(map) => {
                            validate_object(attributes, map, &item_path, mode, diagnostics)
                        }
                        _ => diagnostics.push(
                            Diagnostic::error(&item_path, "Incorrect attribute value type")
                                .with_detail("object required"),
                        ),
                    }
                }
            }
            (NestingMode::Map, Value::Object(entries)) => {
                for (key, item) in entries {
                    let item_path = format!("{}[\"{}\"]", path, key);
                    match item {
                        Value::Object(map) => {
                            validate_object(attributes, map, &item_path, mode, diagnostics)
                        }
                        _ => diagnostics.push(
                            Diagnostic::error(&item_path, "Incorrect attribute value type")
                                .with_detail("object required"),
                        ),
                    }
                }
            }
            (nesting, _) => {
                let expected = match nesting {
                    NestingMode::Single | NestingMode::Map => "object required",
                    NestingMode::List => "list of objects required",
                };
                diagnostics.push(Diagnostic::error(path, "Incorrect attribute value type").with_detail(expected));
                return;
            }
        },
    }

    for validator in &attr.validators {
        if let Err(detail) = validator.check(value) {
            diagnostics.push(Diagnostic::error(path, "Invalid attribute value").with_detail(detail));
        }
    }
}

/// Check a JSON value against a primitive attribute type
pub fn check_type(ty: &AttributeType, value: &Value) -> Result<(), String> {
    let ok = match ty {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => value.is_i64() || value.is_u64(),
        AttributeType::Float64 => value.is_number(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::IntOrString => value.is_i64() || value.is_u64() || value.is_string(),
        AttributeType::Dynamic => true,
        AttributeType::List(element) => match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_null() {
                        check_type(element, item).map_err(|e| format!("element {}: {}", i, e))?;
                    }
                }
                true
            }
            _ => false,
        },
        AttributeType::Map(element) => match value {
            Value::Object(entries) => {
                for (key, item) in entries {
                    if !item.is_null() {
                        check_type(element, item).map_err(|e| format!("element \"{}\": {}", key, e))?;
                    }
                }
                true
            }
            _ => false,
        },
    };

    if ok {
        Ok(())
    } else {
        Err(format!("{} required", ty))
    }
}
