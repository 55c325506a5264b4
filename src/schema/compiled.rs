//! Compiled validators and structured validation errors.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::Schema;

/// Error raised when a schema document cannot be compiled.
#[derive(Debug, thiserror::Error)]
#[error("invalid schema: {message}")]
pub struct SchemaError {
    message: String,
}

/// One failed constraint inside a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer to the offending value ("" for the root).
    pub path: String,
    pub message: String,
}

/// Structured result of a failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    pub name: &'static str,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self {
            name: "ValidationError",
            issues,
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            if issue.path.is_empty() {
                write!(f, "{}", issue.message)?;
            } else {
                write!(f, "{}: {}", issue.path, issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// A precompiled validator, cheap to clone and share across requests.
#[derive(Clone)]
pub struct CompiledSchema {
    validator: Arc<jsonschema::Validator>,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

impl CompiledSchema {
    pub(crate) fn compile(schema: &Schema) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(schema.definition()).map_err(|e| SchemaError {
            message: e.to_string(),
        })?;
        Ok(Self {
            validator: Arc::new(validator),
        })
    }

    /// Validate `value`, returning the validated query on success.
    ///
    /// Async so that callers never assume validation completes synchronously.
    pub async fn validate(&self, value: &Value) -> Result<Value, ValidationFailure> {
        let issues: Vec<ValidationIssue> = self
            .validator
            .iter_errors(value)
            .map(|error| ValidationIssue {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect();

        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(ValidationFailure::new(issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_valid_query_is_returned() {
        let compiled = Schema::object(json!({"id": {"type": "string"}})).compile().unwrap();
        let value = json!({"id": "@1"});
        assert_eq!(compiled.validate(&value).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_invalid_query_reports_issues() {
        let compiled = Schema::object(json!({"id": {"type": "string"}})).compile().unwrap();
        let failure = compiled.validate(&json!({"id": 5})).await.unwrap_err();
        assert_eq!(failure.name, "ValidationError");
        assert_eq!(failure.issues.len(), 1);
        assert_eq!(failure.issues[0].path, "/id");
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_extra_keys() {
        let schema = Schema::object(json!({"iconUrl": {"type": "string"}}));
        let query = json!({"iconUrl": "x", "extra": "y"});

        let loose = schema.compile().unwrap();
        assert!(loose.validate(&query).await.is_ok());

        let strict = schema.strict_or_passthrough().compile().unwrap();
        assert!(strict.validate(&query).await.is_err());
    }

    #[test]
    fn test_invalid_definition_fails_to_compile() {
        let schema = Schema::new(json!({"type": 12}));
        assert!(schema.compile().is_err());
    }

    #[test]
    fn test_failure_display_joins_issues() {
        let failure = ValidationFailure::new(vec![
            ValidationIssue { path: "".into(), message: "a".into() },
            ValidationIssue { path: "/b".into(), message: "c".into() },
        ]);
        assert_eq!(failure.to_string(), "a; /b: c");
    }
}
