//! In-memory implementations of the storage ports.
//!
//! Used by unit tests and by the API integration tests, which run the full
//! router without a database.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    upload_path, FileStorage, FormSchemaStore, NewFormSchema, NewFormSubmission, SubmissionStore,
    DEFAULT_CONTENT_TYPE,
};
use crate::errors::StoreError;
use crate::models::{FileUpload, FormFile, FormSchema, FormSubmission, StoredFile, SubmissionFilter};

/// Form schemas and submissions kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryFormStore {
    schemas: RwLock<Vec<FormSchema>>,
    submissions: RwLock<Vec<FormSubmission>>,
    /// Whether submission inserts should fail, for testing rollback paths.
    pub fail_submission_inserts: bool,
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose submission inserts always fail.
    pub fn failing_submissions() -> Self {
        Self {
            fail_submission_inserts: true,
            ..Self::default()
        }
    }

    pub async fn submission_count(&self) -> usize {
        self.submissions.read().await.len()
    }
}

#[async_trait::async_trait]
impl FormSchemaStore for InMemoryFormStore {
    async fn insert(&self, schema: NewFormSchema) -> Result<FormSchema, StoreError> {
        let mut schemas = self.schemas.write().await;
        if schemas.iter().any(|s| s.slug == schema.slug) {
            return Err(StoreError::SlugConflict);
        }

        let now = Utc::now();
        let created = FormSchema {
            id: Uuid::new_v4(),
            title: schema.title,
            slug: schema.slug,
            description: schema.description,
            language_config: schema.language_config,
            fields_structure: schema.fields_structure,
            relationships: schema.relationships,
            created_by: schema.created_by,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        schemas.push(created.clone());
        Ok(created)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<FormSchema>, StoreError> {
        let schemas = self.schemas.read().await;
        Ok(schemas.iter().find(|s| s.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSchema>, StoreError> {
        let schemas = self.schemas.read().await;
        Ok(schemas.iter().find(|s| s.id == id).cloned())
    }

    async fn update(&self, schema: &FormSchema) -> Result<Option<FormSchema>, StoreError> {
        let mut schemas = self.schemas.write().await;
        let Some(existing) = schemas
            .iter_mut()
            .find(|s| s.id == schema.id && !s.is_deleted)
        else {
            return Ok(None);
        };

        existing.title = schema.title.clone();
        existing.description = schema.description.clone();
        existing.language_config = schema.language_config.clone();
        existing.fields_structure = schema.fields_structure.clone();
        existing.relationships = schema.relationships.clone();
        existing.updated_at = Utc::now();
        Ok(Some(existing.clone()))
    }

    async fn mark_deleted(&self, slug: &str) -> Result<bool, StoreError> {
        let mut schemas = self.schemas.write().await;
        match schemas.iter_mut().find(|s| s.slug == slug && !s.is_deleted) {
            Some(schema) => {
                schema.is_deleted = true;
                schema.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_owner(
        &self,
        owner: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<FormSchema>, StoreError> {
        let schemas = self.schemas.read().await;
        Ok(schemas
            .iter()
            .rev()
            .filter(|s| s.created_by == owner && (include_deleted || !s.is_deleted))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubmissionStore for InMemoryFormStore {
    async fn insert_with_files(
        &self,
        submission: NewFormSubmission,
        files: Vec<StoredFile>,
    ) -> Result<FormSubmission, StoreError> {
        if self.fail_submission_inserts {
            return Err(StoreError::Backend("simulated insert failure".to_string()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let created = FormSubmission {
            id,
            form_schema_id: submission.form_schema_id,
            data: submission.data,
            submitted_at: now,
            submitted_by: submission.submitted_by,
            ip_address: submission.ip_address,
            files: files
                .into_iter()
                .map(|file| FormFile {
                    id: Uuid::new_v4(),
                    submission_id: id,
                    file,
                    uploaded_at: now,
                })
                .collect(),
        };
        self.submissions.write().await.push(created.clone());
        Ok(created)
    }

    async fn list(
        &self,
        schema_ids: &[Uuid],
        filter: &SubmissionFilter,
    ) -> Result<Vec<FormSubmission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .iter()
            .rev()
            .filter(|s| schema_ids.contains(&s.form_schema_id) && filter.matches(&s.data))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSubmission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn count_by_schema(&self, schema_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, StoreError> {
        let submissions = self.submissions.read().await;
        let mut counts = HashMap::new();
        for submission in submissions
            .iter()
            .filter(|s| schema_ids.contains(&s.form_schema_id))
        {
            *counts.entry(submission.form_schema_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Blobs kept in a map keyed by storage path.
#[derive(Debug, Default)]
pub struct InMemoryFileStorage {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait::async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn store(&self, upload: FileUpload) -> Result<StoredFile, StoreError> {
        let path = upload_path(Utc::now(), Uuid::new_v4(), &upload.name);
        let stored = StoredFile {
            path: path.clone(),
            name: upload.name,
            content_type: upload
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            size_bytes: upload.bytes.len() as i64,
            sha256: shared::crypto::sha256_hex(&upload.bytes),
        };
        self.blobs.write().await.insert(path, upload.bytes);
        Ok(stored)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.blobs.write().await.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LanguageConfig, SubmissionData};

    fn new_schema(slug: &str, owner: Uuid) -> NewFormSchema {
        NewFormSchema {
            slug: slug.to_string(),
            title: "Survey".to_string(),
            description: None,
            language_config: LanguageConfig {
                primary: "en".to_string(),
                optional: vec![],
            },
            fields_structure: vec![],
            relationships: vec![],
            created_by: owner,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_slug() {
        let store = InMemoryFormStore::new();
        let owner = Uuid::new_v4();
        store.insert(new_schema("Ab12Cd34", owner)).await.unwrap();

        let result = store.insert(new_schema("Ab12Cd34", owner)).await;
        assert!(matches!(result, Err(StoreError::SlugConflict)));
    }

    #[tokio::test]
    async fn test_mark_deleted_only_once() {
        let store = InMemoryFormStore::new();
        store
            .insert(new_schema("Ab12Cd34", Uuid::new_v4()))
            .await
            .unwrap();

        assert!(store.mark_deleted("Ab12Cd34").await.unwrap());
        assert!(!store.mark_deleted("Ab12Cd34").await.unwrap());
        assert!(!store.mark_deleted("missing1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let store = InMemoryFormStore::new();
        let owner = Uuid::new_v4();
        store.insert(new_schema("first001", owner)).await.unwrap();
        store.insert(new_schema("second02", owner)).await.unwrap();
        store
            .insert(new_schema("other003", Uuid::new_v4()))
            .await
            .unwrap();
        store.mark_deleted("first001").await.unwrap();

        let visible = store.list_by_owner(owner, false).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].slug, "second02");

        let all = store.list_by_owner(owner, true).await.unwrap();
        let slugs: Vec<_> = all.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["second02", "first001"]);
    }

    #[tokio::test]
    async fn test_submissions_listed_newest_first_and_counted() {
        let store = InMemoryFormStore::new();
        let schema = store
            .insert(new_schema("Ab12Cd34", Uuid::new_v4()))
            .await
            .unwrap();

        for name in ["one", "two"] {
            let data: SubmissionData = [("name", name)].into_iter().collect();
            store
                .insert_with_files(
                    NewFormSubmission {
                        form_schema_id: schema.id,
                        data,
                        submitted_by: None,
                        ip_address: None,
                    },
                    vec![],
                )
                .await
                .unwrap();
        }

        let listed = store
            .list(&[schema.id], &SubmissionFilter::default())
            .await
            .unwrap();
        assert_eq!(listed[0].data.get("name").unwrap().as_text(), "two");
        assert_eq!(listed[1].data.get("name").unwrap().as_text(), "one");

        let counts = store.count_by_schema(&[schema.id]).await.unwrap();
        assert_eq!(counts.get(&schema.id), Some(&2));
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let storage = InMemoryFileStorage::new();
        let stored = storage
            .store(FileUpload {
                name: "notes.txt".to_string(),
                content_type: None,
                bytes: b"hello".to_vec(),
            })
            .await
            .unwrap();

        assert!(stored.path.starts_with("form_submissions/"));
        assert!(stored.path.ends_with("_notes.txt"));
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(stored.content_type, DEFAULT_CONTENT_TYPE);
        assert!(storage.contains(&stored.path).await);

        storage.remove(&stored.path).await.unwrap();
        assert_eq!(storage.len().await, 0);
    }
}
