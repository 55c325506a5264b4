//! Query schema subsystem.
//!
//! # Data Flow
//! ```text
//! Schema (JSON Schema document, registered with a route or group)
//!     → strict_or_passthrough / merge (effective schema for a target)
//!     → compiled.rs (compile once when the registry is frozen)
//!     → validate(query) → validated query | ValidationFailure
//! ```
//!
//! # Design Decisions
//! - Schemas are plain JSON Schema documents checked by the `jsonschema` crate
//! - "Object-shaped" means `"type": "object"`; everything else passes through
//!   strictness and merging untouched
//! - Strict means `"additionalProperties": false`
//! - Compilation happens at startup, validation is the only per-request work

pub mod compiled;

use serde_json::{Map, Value};

pub use compiled::{CompiledSchema, SchemaError, ValidationFailure, ValidationIssue};

/// A JSON Schema document describing the `query` of a route or group.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    definition: Value,
}

impl Schema {
    /// Wrap an arbitrary JSON Schema document.
    pub fn new(definition: Value) -> Self {
        Self { definition }
    }

    /// Schema accepting any JSON value.
    pub fn any() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    /// Object schema whose listed properties are all required.
    ///
    /// `properties` maps each key to its own JSON Schema, e.g.
    /// `json!({"id": {"type": "string"}})`.
    pub fn object(properties: Value) -> Self {
        let required: Vec<Value> = properties
            .as_object()
            .map(|props| props.keys().cloned().map(Value::String).collect())
            .unwrap_or_default();

        let mut definition = Map::new();
        definition.insert("type".into(), Value::String("object".into()));
        definition.insert("properties".into(), properties);
        definition.insert("required".into(), Value::Array(required));
        Self::new(Value::Object(definition))
    }

    /// The underlying JSON Schema document.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    /// Returns true if this schema describes a JSON object.
    pub fn is_object(&self) -> bool {
        self.definition.get("type").and_then(Value::as_str) == Some("object")
    }

    /// Variant of an object schema that rejects undeclared keys.
    /// Non-object schemas are returned unchanged.
    pub fn strict_or_passthrough(&self) -> Schema {
        let mut definition = self.definition.clone();
        if self.is_object() {
            if let Some(map) = definition.as_object_mut() {
                map.insert("additionalProperties".into(), Value::Bool(false));
            }
        }
        Schema::new(definition)
    }

    /// Union of two object schemas' fields.
    ///
    /// Properties declared by `other` win on conflict; `required` lists are
    /// concatenated without duplicates. Both schemas are expected to be
    /// object-shaped; other keywords are taken from `self`.
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut definition = self.definition.clone();
        let Some(map) = definition.as_object_mut() else {
            return other.clone();
        };

        let mut properties = map
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if let Some(extra) = other.definition.get("properties").and_then(Value::as_object) {
            for (key, schema) in extra {
                properties.insert(key.clone(), schema.clone());
            }
        }

        let mut required: Vec<Value> = Vec::new();
        let ours = map.get("required").and_then(Value::as_array);
        let theirs = other.definition.get("required").and_then(Value::as_array);
        for key in ours.into_iter().chain(theirs).flatten() {
            if !required.contains(key) {
                required.push(key.clone());
            }
        }

        map.insert("properties".into(), Value::Object(properties));
        map.insert("required".into(), Value::Array(required));
        Schema::new(definition)
    }

    /// Compile this schema into a reusable validator.
    pub fn compile(&self) -> Result<CompiledSchema, SchemaError> {
        CompiledSchema::compile(self)
    }
}

impl From<Value> for Schema {
    fn from(definition: Value) -> Self {
        Self::new(definition)
    }
}
