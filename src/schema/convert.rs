// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Moves values between provider state (snake_case) and Kubernetes objects (wire names).

use super::{Attribute, AttributeKind, NestingMode};
use serde_json::{Map, Value};

/// Translate a provider state object into its wire representation.
/// Null values are omitted; keys without a matching attribute are kept as-is.
pub fn to_wire(attributes: &[Attribute], state: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in state {
        if value.is_null() {
            continue;
        }
        match attributes.iter().find(|a| &a.name == key) {
            Some(attr) => {
                out.insert(attr.json_name.clone(), translate(attr, value, Direction::ToWire));
            }
            None => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

/// Translate a Kubernetes object into provider state.
/// Fields without a matching attribute are dropped.
pub fn from_wire(attributes: &[Attribute], object: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for attr in attributes {
        match object.get(&attr.json_name) {
            None | Some(Value::Null) => {}
            Some(value) => {
                out.insert(attr.name.clone(), translate(attr, value, Direction::FromWire));
            }
        }
    }
    out
}

#[derive(Clone, Copy)]
enum Direction {
    ToWire,
    FromWire,
}

fn translate(attr: &Attribute, value: &Value, direction: Direction) -> Value {
    let AttributeKind::Nested { mode, attributes } = &attr.kind else {
        return value.clone();
    };

    let object = |v: &Value| match v {
        Value::Object(map) => Value::Object(match direction {
            Direction::ToWire => to_wire(attributes, map),
            Direction::FromWire => from_wire(attributes, map),
        }),
        other => other.clone(),
    };

    match (mode, value) {
        (NestingMode::Single, v) => object(v),
        (NestingMode::List, Value::Array(items)) => Value::Array(items.iter().map(object).collect()),
        (NestingMode::Map, Value::Object(entries)) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), object(v)))
                .collect(),
        ),
        (_, other) => other.clone(),
    }
}
