// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Attribute trees describing provider, resource and data source schemas.
//!
//! Attribute names are snake_case. Every attribute also remembers the name of
//! the field it maps to on the Kubernetes object (`json_name`), which is what
//! [`convert`] uses to move values between provider state and API objects.

pub mod convert;
pub mod openapi;
pub mod validate;
pub mod validators;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub use validators::Validator;

/// Type of a primitive (non-nested) attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "element")]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Bool,
    /// Either an integer or a string, like `maxSurge: 1` or `maxSurge: "25%"`
    IntOrString,
    /// Arbitrary JSON, passed to the API server untouched
    Dynamic,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Int64 => write!(f, "number (int64)"),
            AttributeType::Float64 => write!(f, "number"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::IntOrString => write!(f, "number or string"),
            AttributeType::Dynamic => write!(f, "dynamic"),
            AttributeType::List(e) => write!(f, "list of {}", e),
            AttributeType::Map(e) => write!(f, "map of {}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Required,
    Optional,
    /// Set by the provider only
    Computed,
    /// Set by the user, or by the provider when the user leaves it out
    OptionalComputed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    Single,
    List,
    Map,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Primitive(AttributeType),
    Nested {
        mode: NestingMode,
        attributes: Vec<Attribute>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub json_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub requirement: Requirement,
    pub kind: AttributeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_replace: bool,
}

impl Attribute {
    fn new(name: &str, requirement: Requirement, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            json_name: name.to_string(),
            description: None,
            requirement,
            kind,
            validators: Vec::new(),
            requires_replace: false,
        }
    }

    pub fn required(name: &str, ty: AttributeType) -> Self {
        Self::new(name, Requirement::Required, AttributeKind::Primitive(ty))
    }

    pub fn optional(name: &str, ty: AttributeType) -> Self {
        Self::new(name, Requirement::Optional, AttributeKind::Primitive(ty))
    }

    pub fn computed(name: &str, ty: AttributeType) -> Self {
        Self::new(name, Requirement::Computed, AttributeKind::Primitive(ty))
    }

    pub fn optional_computed(name: &str, ty: AttributeType) -> Self {
        Self::new(name, Requirement::OptionalComputed, AttributeKind::Primitive(ty))
    }

    pub fn nested(
        name: &str,
        requirement: Requirement,
        mode: NestingMode,
        attributes: Vec<Attribute>,
    ) -> Self {
        Self::new(name, requirement, AttributeKind::Nested { mode, attributes })
    }

    pub fn with_json_name(mut self, json_name: &str) -> Self {
        self.json_name = json_name.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    /// Whether a user may set this attribute in configuration
    pub fn is_settable(&self) -> bool {
        self.requirement != Requirement::Computed
    }

    /// Child attributes of a nested attribute
    pub fn children(&self) -> Option<&[Attribute]> {
        match &self.kind {
            AttributeKind::Nested { attributes, .. } => Some(attributes),
            AttributeKind::Primitive(_) => None,
        }
    }
}

/// Find an attribute by its snake_case name
pub fn find<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.name == name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(description: &str, attributes: Vec<Attribute>) -> Self {
        Self {
            version: 0,
            description: Some(description.to_string()),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find(&self.attributes, name)
    }
}

/// Schemas of everything the provider exposes, keyed by type name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<String, Schema>,
    pub data_sources: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem found while validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(attribute: &str, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            attribute: (!attribute.is_empty()).then(|| attribute.to_string()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(attribute) = &self.attribute {
            write!(f, "{}: ", attribute)?;
        }
        write!(f, "{}", self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_display() {
        let ty = AttributeType::map(AttributeType::list(AttributeType::String));
        assert_eq!(ty.to_string(), "map of list of string");
    }

    #[test]
    fn test_diagnostic_display_with_attribute() {
        let d = Diagnostic::error("metadata.name", "Invalid name").with_detail("too long");
        assert_eq!(d.to_string(), "metadata.name: Invalid name (too long)");
    }

    #[test]
    fn test_diagnostic_display_without_attribute() {
        let d = Diagnostic::error("", "Missing configuration");
        assert!(d.attribute.is_none());
        assert_eq!(d.to_string(), "Missing configuration");
    }

    #[test]
    fn test_computed_is_not_settable() {
        assert!(!Attribute::computed("id", AttributeType::String).is_settable());
        assert!(Attribute::optional_computed("field_manager", AttributeType::String).is_settable());
    }

    #[test]
    fn test_schema_serializes_nested_attributes() {
        let schema = Schema::new(
            "test",
            vec![Attribute::nested(
                "metadata",
                Requirement::Required,
                NestingMode::Single,
                vec![Attribute::required("name", AttributeType::String)],
            )],
        );
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(value["attributes"][0]["name"], "metadata");
        assert_eq!(value["attributes"][0]["kind"]["nested"]["mode"], "single");
        assert_eq!(
            value["attributes"][0]["kind"]["nested"]["attributes"][0]["kind"]["primitive"]["type"],
            "string"
        );
    }
}
