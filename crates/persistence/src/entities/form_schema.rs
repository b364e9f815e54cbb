//! Form schema entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{FieldDefinition, LanguageConfig, Relationship};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the form_schemas table.
#[derive(Debug, Clone, FromRow)]
pub struct FormSchemaEntity {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub language_config: Json<LanguageConfig>,
    pub fields_structure: Json<Vec<FieldDefinition>>,
    pub relationships: Json<Vec<Relationship>>,
    pub created_by: Uuid,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FormSchemaEntity> for domain::models::FormSchema {
    fn from(entity: FormSchemaEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            slug: entity.slug,
            description: entity.description,
            language_config: entity.language_config.0,
            fields_structure: entity.fields_structure.0,
            relationships: entity.relationships.0,
            created_by: entity.created_by,
            is_deleted: entity.is_deleted,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_form_schema_entity_to_domain() {
        let entity = FormSchemaEntity {
            id: Uuid::new_v4(),
            title: "Contact".to_string(),
            slug: "Ab12Cd34".to_string(),
            description: Some("Reach us".to_string()),
            language_config: Json(LanguageConfig {
                primary: "en".to_string(),
                optional: vec![],
            }),
            fields_structure: Json(vec![FieldDefinition {
                id: "name".to_string(),
                field_type: "text".to_string(),
                labels: BTreeMap::from([("en".to_string(), "Name".to_string())]),
                description: None,
                required: true,
                options: None,
            }]),
            relationships: Json(vec![]),
            created_by: Uuid::new_v4(),
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let schema: domain::models::FormSchema = entity.clone().into();
        assert_eq!(schema.id, entity.id);
        assert_eq!(schema.slug, "Ab12Cd34");
        assert_eq!(schema.language_config.primary, "en");
        assert_eq!(schema.fields_structure[0].id, "name");
        assert!(schema.relationships.is_empty());
    }
}
