//! Form schema domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

/// Language configuration of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    pub primary: String,
    #[serde(default)]
    pub optional: Vec<String>,
}

/// A validated field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Declares that a field's value space is drawn from another form's submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub source_field_id: String,
    pub target_form_slug: String,
    pub display_field: String,
}

/// Represents a form schema in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub language_config: LanguageConfig,
    pub fields_structure: Vec<FieldDefinition>,
    pub relationships: Vec<Relationship>,
    pub created_by: Uuid,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormSchema {
    /// Looks up a field definition by id.
    pub fn field(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.fields_structure.iter().find(|f| f.id == field_id)
    }

    /// Ids of required fields, in schema order.
    pub fn required_field_ids(&self) -> impl Iterator<Item = &str> {
        self.fields_structure
            .iter()
            .filter(|f| f.required)
            .map(|f| f.id.as_str())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }
}

// ---------------------------------------------------------------------------
// Unvalidated input shapes
//
// Every key is optional so that one validation pass can report all missing
// keys instead of failing on the first one during deserialization. Keys the
// definition format requires are kept as raw JSON, so a value of the wrong
// type becomes a violation rather than a body rejection.
// ---------------------------------------------------------------------------

/// Language configuration as received from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfigInput {
    pub primary: Option<Value>,
    #[serde(default)]
    pub optional: Vec<String>,
}

/// Field definition as received from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinitionInput {
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub field_type: Option<Value>,
    pub labels: Option<Value>,
    pub description: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub required: bool,
    pub options: Option<Vec<String>>,
}

/// Relationship as received from a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInput {
    pub source_field_id: Option<Value>,
    pub target_form_slug: Option<Value>,
    pub display_field: Option<Value>,
}

/// Request payload for creating a form schema.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormSchemaRequest {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub title: String,

    pub description: Option<String>,

    pub language_config: Option<LanguageConfigInput>,

    #[serde(default)]
    pub fields_structure: Vec<FieldDefinitionInput>,

    #[serde(default)]
    pub relationships: Vec<RelationshipInput>,
}

/// Request payload for updating a form schema (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormSchemaRequest {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub title: Option<String>,

    /// Absent keeps the description, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,

    pub language_config: Option<LanguageConfigInput>,

    pub fields_structure: Option<Vec<FieldDefinitionInput>>,

    pub relationships: Option<Vec<RelationshipInput>>,
}

/// Marks a key as present, so `null` deserializes to `Some(None)`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateFormSchemaRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.language_config.is_none()
            && self.fields_structure.is_none()
            && self.relationships.is_none()
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response payload for form schema operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchemaResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub language_config: LanguageConfig,
    pub fields_structure: Vec<FieldDefinition>,
    pub relationships: Vec<Relationship>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submission_count: i64,
}

impl FormSchemaResponse {
    pub fn new(schema: FormSchema, submission_count: i64) -> Self {
        Self {
            id: schema.id,
            title: schema.title,
            slug: schema.slug,
            description: schema.description,
            language_config: schema.language_config,
            fields_structure: schema.fields_structure,
            relationships: schema.relationships,
            created_by: schema.created_by,
            created_at: schema.created_at,
            updated_at: schema.updated_at,
            submission_count,
        }
    }
}

/// Response for listing form schemas.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFormSchemasResponse {
    pub forms: Vec<FormSchemaResponse>,
    pub total: usize,
}

/// Response for a soft delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFormSchemaResponse {
    pub message: String,
}
