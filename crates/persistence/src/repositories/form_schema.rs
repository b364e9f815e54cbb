//! Form schema repository for database operations.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use domain::errors::StoreError;
use domain::models::FormSchema;
use domain::store::{FormSchemaStore, NewFormSchema};

use super::store_error;
use crate::entities::FormSchemaEntity;
use crate::metrics::QueryTimer;

const SELECT_COLUMNS: &str = "id, title, slug, description, language_config, fields_structure, \
     relationships, created_by, is_deleted, created_at, updated_at";

/// Repository for form schema database operations.
#[derive(Clone)]
pub struct FormSchemaRepository {
    pool: PgPool,
}

impl FormSchemaRepository {
    /// Creates a new FormSchemaRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a new form schema. Fails with a unique violation if the slug is taken.
    pub async fn insert_schema(&self, input: NewFormSchema) -> Result<FormSchemaEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_form_schema");
        let now = Utc::now();

        let result = sqlx::query_as::<_, FormSchemaEntity>(&format!(
            r#"
            INSERT INTO form_schemas (
                id, title, slug, description, language_config, fields_structure,
                relationships, created_by, is_deleted, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, $9, $9)
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(Json(&input.language_config))
        .bind(Json(&input.fields_structure))
        .bind(Json(&input.relationships))
        .bind(input.created_by)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Find a form schema by slug, including soft-deleted ones.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<FormSchemaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_schema_by_slug");

        let result = sqlx::query_as::<_, FormSchemaEntity>(&format!(
            "SELECT {} FROM form_schemas WHERE slug = $1",
            SELECT_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Find a form schema by id, including soft-deleted ones.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSchemaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_schema_by_id");

        let result = sqlx::query_as::<_, FormSchemaEntity>(&format!(
            "SELECT {} FROM form_schemas WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Write the mutable columns of a non-deleted schema.
    pub async fn update_schema(
        &self,
        schema: &FormSchema,
    ) -> Result<Option<FormSchemaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_form_schema");

        let result = sqlx::query_as::<_, FormSchemaEntity>(&format!(
            r#"
            UPDATE form_schemas
            SET title = $2,
                description = $3,
                language_config = $4,
                fields_structure = $5,
                relationships = $6,
                updated_at = $7
            WHERE id = $1 AND is_deleted = false
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(schema.id)
        .bind(&schema.title)
        .bind(&schema.description)
        .bind(Json(&schema.language_config))
        .bind(Json(&schema.fields_structure))
        .bind(Json(&schema.relationships))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Soft delete a schema.
    /// Returns the number of rows affected (0 if not found or already deleted).
    pub async fn soft_delete(&self, slug: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("soft_delete_form_schema");

        let result = sqlx::query(
            r#"
            UPDATE form_schemas
            SET is_deleted = true, updated_at = $2
            WHERE slug = $1 AND is_deleted = false
            "#,
        )
        .bind(slug)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        Ok(timer.observe(result)?.rows_affected())
    }

    /// List schemas created by a user, newest first.
    pub async fn find_by_owner(
        &self,
        owner: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<FormSchemaEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_schemas_by_owner");

        let result = sqlx::query_as::<_, FormSchemaEntity>(&format!(
            r#"
            SELECT {}
            FROM form_schemas
            WHERE created_by = $1 AND ($2 OR is_deleted = false)
            ORDER BY created_at DESC, id DESC
            "#,
            SELECT_COLUMNS
        ))
        .bind(owner)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Check database connectivity.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FormSchemaStore for FormSchemaRepository {
    async fn insert(&self, schema: NewFormSchema) -> Result<FormSchema, StoreError> {
        self.insert_schema(schema)
            .await
            .map(Into::into)
            .map_err(store_error)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<FormSchema>, StoreError> {
        FormSchemaRepository::find_by_slug(self, slug)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSchema>, StoreError> {
        FormSchemaRepository::find_by_id(self, id)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn update(&self, schema: &FormSchema) -> Result<Option<FormSchema>, StoreError> {
        self.update_schema(schema)
            .await
            .map(|row| row.map(Into::into))
            .map_err(store_error)
    }

    async fn mark_deleted(&self, slug: &str) -> Result<bool, StoreError> {
        self.soft_delete(slug)
            .await
            .map(|rows| rows > 0)
            .map_err(store_error)
    }

    async fn list_by_owner(
        &self,
        owner: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<FormSchema>, StoreError> {
        self.find_by_owner(owner, include_deleted)
            .await
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(store_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        FormSchemaRepository::ping(self).await.map_err(store_error)
    }
}
