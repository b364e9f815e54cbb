//! Structural validation of form schema definitions.
//!
//! Every check pushes into a shared [`Violations`] collection instead of
//! returning early, so a client sees all problems of a definition at once.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::errors::{ViolationCode, Violations};
use crate::models::form_schema::{
    FieldDefinitionInput, LanguageConfigInput, RelationshipInput,
};
use crate::models::{FieldDefinition, LanguageConfig, Relationship};

/// Reads a required string key, pushing a violation when it is absent,
/// blank or not a string. JSON `null` counts as absent.
fn required_text(value: Option<&Value>, key: &str, violations: &mut Violations) -> Option<String> {
    match value {
        None | Some(Value::Null) => {
            violations.push(key, ViolationCode::MissingKey, format!("{} is required", key));
            None
        }
        Some(Value::String(text)) if text.trim().is_empty() => {
            violations.push(key, ViolationCode::Empty, format!("{} must not be blank", key));
            None
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            violations.push(key, ViolationCode::Invalid, format!("{} must be a string", key));
            None
        }
    }
}

/// Validates `languageConfig`, which must carry a non-blank `primary`.
pub fn validate_language_config(
    input: Option<&LanguageConfigInput>,
    violations: &mut Violations,
) -> Option<LanguageConfig> {
    let Some(input) = input else {
        violations.push(
            "languageConfig",
            ViolationCode::MissingKey,
            "languageConfig is required",
        );
        return None;
    };

    if matches!(input.primary, None | Some(Value::Null)) {
        violations.push(
            "languageConfig.primary",
            ViolationCode::MissingKey,
            "languageConfig must contain 'primary'",
        );
        return None;
    }

    let primary = required_text(input.primary.as_ref(), "languageConfig.primary", violations)?;
    Some(LanguageConfig {
        primary,
        optional: input.optional.clone(),
    })
}

/// Reads `labels`, which must map language codes to label strings.
fn labels_of(
    value: Option<&Value>,
    prefix: &str,
    violations: &mut Violations,
) -> Option<BTreeMap<String, String>> {
    let key = format!("{}.labels", prefix);
    let map = match value {
        None | Some(Value::Null) => {
            violations.push(&key, ViolationCode::MissingKey, format!("{} is required", key));
            return None;
        }
        Some(Value::Object(map)) => map,
        Some(_) => {
            violations.push(
                &key,
                ViolationCode::Invalid,
                format!("{} must be a mapping of language codes to labels", key),
            );
            return None;
        }
    };

    if map.is_empty() {
        violations.push(
            &key,
            ViolationCode::Empty,
            format!("{} must contain at least one language", key),
        );
        return None;
    }

    let mut labels = BTreeMap::new();
    for (language, label) in map {
        match label {
            Value::String(text) => {
                labels.insert(language.clone(), text.clone());
            }
            _ => {
                violations.push(
                    format!("{}.{}", key, language),
                    ViolationCode::Invalid,
                    format!("{}.{} must be a string", key, language),
                );
            }
        }
    }
    (labels.len() == map.len()).then_some(labels)
}

/// Validates `fieldsStructure`. Every entry needs `id`, `type` and a
/// non-empty `labels` mapping; ids must be unique.
///
/// Only fully valid entries are returned.
pub fn validate_fields(
    inputs: &[FieldDefinitionInput],
    violations: &mut Violations,
) -> Vec<FieldDefinition> {
    let mut fields = Vec::with_capacity(inputs.len());
    let mut seen = HashSet::new();

    for (index, input) in inputs.iter().enumerate() {
        let prefix = format!("fieldsStructure[{}]", index);

        let id = required_text(input.id.as_ref(), &format!("{}.id", prefix), violations);
        let field_type = required_text(
            input.field_type.as_ref(),
            &format!("{}.type", prefix),
            violations,
        );

        let labels = labels_of(input.labels.as_ref(), &prefix, violations);

        if let Some(id) = &id {
            if !seen.insert(id.clone()) {
                violations.push(
                    format!("{}.id", prefix),
                    ViolationCode::DuplicateId,
                    format!("Duplicate field id '{}'", id),
                );
                continue;
            }
        }

        if let (Some(id), Some(field_type), Some(labels)) = (id, field_type, labels) {
            fields.push(FieldDefinition {
                id,
                field_type,
                labels,
                description: input.description.clone(),
                required: input.required,
                options: input.options.clone(),
            });
        }
    }

    fields
}

/// Validates `relationships`. Each entry needs all three keys and its
/// `sourceFieldId` must name one of `fields`.
pub fn validate_relationships(
    inputs: &[RelationshipInput],
    fields: &[FieldDefinition],
    violations: &mut Violations,
) -> Vec<Relationship> {
    let mut relationships = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let prefix = format!("relationships[{}]", index);
        let source = required_text(
            input.source_field_id.as_ref(),
            &format!("{}.sourceFieldId", prefix),
            violations,
        );
        if let Some(source) = &source {
            if !fields.iter().any(|f| &f.id == source) {
                violations.push(
                    format!("{}.sourceFieldId", prefix),
                    ViolationCode::UnknownSourceField,
                    format!("sourceFieldId '{}' does not match any field", source),
                );
            }
        }
        let target = required_text(
            input.target_form_slug.as_ref(),
            &format!("{}.targetFormSlug", prefix),
            violations,
        );
        let display = required_text(
            input.display_field.as_ref(),
            &format!("{}.displayField", prefix),
            violations,
        );

        if let (Some(source_field_id), Some(target_form_slug), Some(display_field)) =
            (source, target, display)
        {
            relationships.push(Relationship {
                source_field_id,
                target_form_slug,
                display_field,
            });
        }
    }

    relationships
}

/// Re-checks stored relationships after the field list changed.
pub fn check_relationship_sources(
    relationships: &[Relationship],
    fields: &[FieldDefinition],
    violations: &mut Violations,
) {
    for (index, relationship) in relationships.iter().enumerate() {
        if !fields.iter().any(|f| f.id == relationship.source_field_id) {
            violations.push(
                format!("relationships[{}].sourceFieldId", index),
                ViolationCode::UnknownSourceField,
                format!(
                    "sourceFieldId '{}' does not match any field",
                    relationship.source_field_id
                ),
            );
        }
    }
}
