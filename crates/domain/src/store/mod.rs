//! Persistence and file storage ports.
//!
//! The services only talk to these traits. PostgreSQL implementations live in
//! the `persistence` crate, the local filesystem storage in `api`, and
//! [`memory`] holds in-memory versions used by tests.

pub mod memory;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    FieldDefinition, FileUpload, FormSchema, FormSubmission, LanguageConfig, Relationship,
    StoredFile, SubmissionData, SubmissionFilter,
};

/// Directory, relative to the storage root, that holds uploaded files.
pub const UPLOAD_ROOT: &str = "form_submissions";

/// Content type used when neither the client nor the file name gives one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Storage-relative path of an upload: `form_submissions/YYYY/MM/DD/<id>_<name>`.
pub fn upload_path(uploaded_at: DateTime<Utc>, id: Uuid, name: &str) -> String {
    format!(
        "{}/{}/{}_{}",
        UPLOAD_ROOT,
        uploaded_at.format("%Y/%m/%d"),
        id.simple(),
        sanitize_file_name(name)
    )
}

/// Reduces a client-supplied file name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Input for inserting a new form schema.
#[derive(Debug, Clone)]
pub struct NewFormSchema {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub language_config: LanguageConfig,
    pub fields_structure: Vec<FieldDefinition>,
    pub relationships: Vec<Relationship>,
    pub created_by: Uuid,
}

/// Input for inserting a new submission.
#[derive(Debug, Clone)]
pub struct NewFormSubmission {
    pub form_schema_id: Uuid,
    pub data: SubmissionData,
    pub submitted_by: Option<Uuid>,
    pub ip_address: Option<IpAddr>,
}

/// Storage of form schemas.
#[async_trait::async_trait]
pub trait FormSchemaStore: Send + Sync {
    /// Inserts a schema. Returns [`StoreError::SlugConflict`] when the slug is taken.
    async fn insert(&self, schema: NewFormSchema) -> Result<FormSchema, StoreError>;

    /// Finds a schema by slug, soft-deleted ones included.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<FormSchema>, StoreError>;

    /// Finds a schema by id, soft-deleted ones included.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSchema>, StoreError>;

    /// Persists the mutable columns of a non-deleted schema and refreshes
    /// `updated_at`. Returns `None` if the schema is gone or soft-deleted.
    async fn update(&self, schema: &FormSchema) -> Result<Option<FormSchema>, StoreError>;

    /// Sets `is_deleted` if it is not set yet. Returns whether a row changed.
    async fn mark_deleted(&self, slug: &str) -> Result<bool, StoreError>;

    /// Schemas created by `owner`, newest first.
    async fn list_by_owner(
        &self,
        owner: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<FormSchema>, StoreError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Storage of submissions and their file records.
#[async_trait::async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Inserts a submission and one file record per stored blob, atomically.
    async fn insert_with_files(
        &self,
        submission: NewFormSubmission,
        files: Vec<StoredFile>,
    ) -> Result<FormSubmission, StoreError>;

    /// Submissions of the given schemas matching `filter`, newest first, with files.
    async fn list(
        &self,
        schema_ids: &[Uuid],
        filter: &SubmissionFilter,
    ) -> Result<Vec<FormSubmission>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSubmission>, StoreError>;

    /// Number of submissions per schema. Schemas without submissions are omitted.
    async fn count_by_schema(&self, schema_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, StoreError>;
}

/// Blob storage for uploaded files.
#[async_trait::async_trait]
pub trait FileStorage: Send + Sync {
    async fn store(&self, upload: FileUpload) -> Result<StoredFile, StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;
}
