//! Domain error types.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable reason attached to a [`FieldViolation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    /// A key required by the schema definition format is absent.
    MissingKey,
    /// A key is present but empty or blank.
    Empty,
    /// Two field definitions share an id.
    DuplicateId,
    /// A relationship points at a field the schema does not define.
    UnknownSourceField,
    /// A required form field has no value in the submission.
    RequiredFieldMissing,
    /// A submission carries a key the schema does not define.
    UnknownField,
    /// A generic constraint from a `validator` derive.
    Invalid,
}

/// One violation, naming the offending key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: ViolationCode,
    pub message: String,
}

/// The complete set of violations found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, code: ViolationCode, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field: field.into(),
            code,
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.0.iter()
    }

    /// Required form fields that were absent from a submission, in schema order.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|v| v.code == ViolationCode::RequiredFieldMissing)
            .map(|v| v.field.as_str())
            .collect()
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<(), FormError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FormError::Validation(self))
        }
    }

    /// Converts errors from a `validator` derive into violations.
    pub fn from_validation_errors(errors: &validator::ValidationErrors) -> Self {
        let mut violations = Self::new();
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        for (field, errs) in fields {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{}'", field));
                violations.push(field.to_string(), ViolationCode::Invalid, message);
            }
        }
        violations
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "no violations"),
            [single] => write!(f, "{}", single.message),
            many => write!(f, "{} validation errors", many.len()),
        }
    }
}

impl IntoIterator for Violations {
    type Item = FieldViolation;
    type IntoIter = std::vec::IntoIter<FieldViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Errors surfaced by the form services.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Validation failed: {0}")]
    Validation(Violations),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already deleted: {0}")]
    AlreadyDeleted(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors reported by the persistence and file storage ports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Slug already in use")]
    SlugConflict,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for FormError {
    fn from(err: StoreError) -> Self {
        FormError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Titled {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
    }

    #[test]
    fn test_missing_fields_filters_by_code() {
        let mut v = Violations::new();
        v.push("email", ViolationCode::RequiredFieldMissing, "Required field 'email' is missing");
        v.push("nickname", ViolationCode::UnknownField, "Unknown field 'nickname'");
        v.push("phone", ViolationCode::RequiredFieldMissing, "Required field 'phone' is missing");

        assert_eq!(v.missing_fields(), vec!["email", "phone"]);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_into_result() {
        assert!(Violations::new().into_result().is_ok());

        let mut v = Violations::new();
        v.push("title", ViolationCode::Empty, "Title must not be blank");
        assert!(matches!(v.into_result(), Err(FormError::Validation(_))));
    }

    #[test]
    fn test_display() {
        let mut v = Violations::new();
        v.push("a", ViolationCode::Empty, "first");
        assert_eq!(v.to_string(), "first");
        v.push("b", ViolationCode::Empty, "second");
        assert_eq!(v.to_string(), "2 validation errors");
    }

    #[test]
    fn test_from_validation_errors() {
        let errors = Titled { title: String::new() }.validate().unwrap_err();
        let v = Violations::from_validation_errors(&errors);
        let first = v.iter().next().unwrap();
        assert_eq!(first.field, "title");
        assert_eq!(first.code, ViolationCode::Invalid);
        assert_eq!(first.message, "Title is required");
    }

    #[test]
    fn test_serialization() {
        let mut v = Violations::new();
        v.push("email", ViolationCode::RequiredFieldMissing, "missing");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json[0]["code"], "required_field_missing");
        assert_eq!(json[0]["field"], "email");
    }

    #[test]
    fn test_store_error_into_form_error() {
        let err: FormError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, FormError::Storage(msg) if msg.contains("connection reset")));
    }
}
