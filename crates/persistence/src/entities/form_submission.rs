//! Form submission and form file entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{FormFile, FormSubmission, StoredFile, SubmissionData};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the form_submissions table.
#[derive(Debug, Clone, FromRow)]
pub struct FormSubmissionEntity {
    pub id: Uuid,
    pub form_schema_id: Uuid,
    pub data: Json<SubmissionData>,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: Option<Uuid>,
    pub ip_address: Option<String>,
}

impl FormSubmissionEntity {
    /// Converts to the domain model, attaching the given files.
    pub fn into_domain(self, files: Vec<FormFile>) -> FormSubmission {
        FormSubmission {
            id: self.id,
            form_schema_id: self.form_schema_id,
            data: self.data.0,
            submitted_at: self.submitted_at,
            submitted_by: self.submitted_by,
            ip_address: self.ip_address.and_then(|ip| ip.parse().ok()),
            files,
        }
    }
}

/// Database row mapping for the form_files table.
#[derive(Debug, Clone, FromRow)]
pub struct FormFileEntity {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub path: String,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<FormFileEntity> for FormFile {
    fn from(entity: FormFileEntity) -> Self {
        Self {
            id: entity.id,
            submission_id: entity.submission_id,
            file: StoredFile {
                path: entity.path,
                name: entity.name,
                content_type: entity.content_type,
                size_bytes: entity.size_bytes,
                sha256: entity.sha256,
            },
            uploaded_at: entity.uploaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_entity_into_domain() {
        let entity = FormSubmissionEntity {
            id: Uuid::new_v4(),
            form_schema_id: Uuid::new_v4(),
            data: Json([("name", "Alice")].into_iter().collect()),
            submitted_at: Utc::now(),
            submitted_by: None,
            ip_address: Some("2001:db8::1".to_string()),
        };

        let submission = entity.clone().into_domain(vec![]);
        assert_eq!(submission.id, entity.id);
        assert_eq!(submission.data.get("name").unwrap().as_text(), "Alice");
        assert_eq!(submission.ip_address, Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_unparseable_ip_is_dropped() {
        let entity = FormSubmissionEntity {
            id: Uuid::new_v4(),
            form_schema_id: Uuid::new_v4(),
            data: Json(SubmissionData::new()),
            submitted_at: Utc::now(),
            submitted_by: None,
            ip_address: Some("unknown".to_string()),
        };
        assert!(entity.into_domain(vec![]).ip_address.is_none());
    }

    #[test]
    fn test_file_entity_to_domain() {
        let entity = FormFileEntity {
            id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            path: "form_submissions/2026/10/19/abc_cv.pdf".to_string(),
            name: "cv.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 2048,
            sha256: "0".repeat(64),
            uploaded_at: Utc::now(),
        };

        let file: FormFile = entity.clone().into();
        assert_eq!(file.submission_id, entity.submission_id);
        assert_eq!(file.file.name, "cv.pdf");
        assert_eq!(file.file.size_bytes, 2048);
    }
}
