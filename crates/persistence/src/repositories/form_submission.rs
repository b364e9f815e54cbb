//! Form submission repository for database operations.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use domain::errors::StoreError;
use domain::models::{FormFile, FormSubmission, StoredFile, SubmissionFilter};
use domain::store::{NewFormSubmission, SubmissionStore};

use super::store_error;
use crate::entities::{FormFileEntity, FormSubmissionEntity};
use crate::metrics::QueryTimer;

const SUBMISSION_COLUMNS: &str = "id, form_schema_id, data, submitted_at, submitted_by, ip_address";
const FILE_COLUMNS: &str =
    "id, submission_id, path, name, content_type, size_bytes, sha256, uploaded_at";

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Appends the WHERE clause for `filter` to a submissions query.
pub fn push_filter_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    schema_ids: &[Uuid],
    filter: &SubmissionFilter,
) {
    builder.push(" WHERE form_schema_id = ANY(");
    builder.push_bind(schema_ids.to_vec());
    builder.push(")");

    if let Some(search) = &filter.search {
        builder.push(" AND data::text ILIKE ");
        builder.push_bind(like_pattern(search));
        builder.push(r" ESCAPE '\'");
    }

    for (field_id, value) in &filter.fields {
        builder.push(" AND data ->> ");
        builder.push_bind(field_id.clone());
        builder.push(" = ");
        builder.push_bind(value.clone());
    }
}

/// Repository for form submission and form file database operations.
#[derive(Clone)]
pub struct FormSubmissionRepository {
    pool: PgPool,
}

impl FormSubmissionRepository {
    /// Creates a new FormSubmissionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a submission and its file rows within one transaction.
    pub async fn insert_submission(
        &self,
        input: NewFormSubmission,
        files: Vec<StoredFile>,
    ) -> Result<(FormSubmissionEntity, Vec<FormFileEntity>), sqlx::Error> {
        let timer = QueryTimer::new("insert_form_submission");
        let result = self.insert_submission_tx(input, files).await;
        timer.observe(result)
    }

    async fn insert_submission_tx(
        &self,
        input: NewFormSubmission,
        files: Vec<StoredFile>,
    ) -> Result<(FormSubmissionEntity, Vec<FormFileEntity>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let submission = sqlx::query_as::<_, FormSubmissionEntity>(&format!(
            r#"
            INSERT INTO form_submissions (id, form_schema_id, data, submitted_at, submitted_by, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.form_schema_id)
        .bind(Json(&input.data))
        .bind(now)
        .bind(input.submitted_by)
        .bind(input.ip_address.map(|ip| ip.to_string()))
        .fetch_one(&mut *tx)
        .await?;

        let mut file_rows = Vec::with_capacity(files.len());
        for file in files {
            let row = sqlx::query_as::<_, FormFileEntity>(&format!(
                r#"
                INSERT INTO form_files (id, submission_id, path, name, content_type, size_bytes, sha256, uploaded_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {}
                "#,
                FILE_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(submission.id)
            .bind(&file.path)
            .bind(&file.name)
            .bind(&file.content_type)
            .bind(file.size_bytes)
            .bind(&file.sha256)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            file_rows.push(row);
        }

        tx.commit().await?;
        Ok((submission, file_rows))
    }

    /// Submissions of the given schemas matching `filter`, newest first.
    pub async fn find_matching(
        &self,
        schema_ids: &[Uuid],
        filter: &SubmissionFilter,
    ) -> Result<Vec<FormSubmissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_submissions");

        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM form_submissions", SUBMISSION_COLUMNS));
        push_filter_conditions(&mut builder, schema_ids, filter);
        builder.push(" ORDER BY submitted_at DESC, id DESC");

        let result = builder
            .build_query_as::<FormSubmissionEntity>()
            .fetch_all(&self.pool)
            .await;

        timer.observe(result)
    }

    /// Find a submission by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSubmissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_form_submission_by_id");

        let result = sqlx::query_as::<_, FormSubmissionEntity>(&format!(
            "SELECT {} FROM form_submissions WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        timer.observe(result)
    }

    /// File rows of the given submissions, oldest first.
    pub async fn find_files(&self, submission_ids: &[Uuid]) -> Result<Vec<FormFileEntity>, sqlx::Error> {
        if submission_ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("find_form_files");

        let result = sqlx::query_as::<_, FormFileEntity>(&format!(
            r#"
            SELECT {}
            FROM form_files
            WHERE submission_id = ANY($1)
            ORDER BY uploaded_at ASC, id ASC
            "#,
            FILE_COLUMNS
        ))
        .bind(submission_ids)
        .fetch_all(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Submission counts grouped by schema.
    pub async fn count_by_schema(&self, schema_ids: &[Uuid]) -> Result<Vec<(Uuid, i64)>, sqlx::Error> {
        let timer = QueryTimer::new("count_form_submissions_by_schema");

        let result = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT form_schema_id, COUNT(*) as count
            FROM form_submissions
            WHERE form_schema_id = ANY($1)
            GROUP BY form_schema_id
            "#,
        )
        .bind(schema_ids)
        .fetch_all(&self.pool)
        .await;

        timer.observe(result)
    }

    /// Attaches file rows to their submissions, preserving submission order.
    async fn with_files(
        &self,
        rows: Vec<FormSubmissionEntity>,
    ) -> Result<Vec<FormSubmission>, sqlx::Error> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut files_by_submission: HashMap<Uuid, Vec<FormFile>> = HashMap::new();
        for file in self.find_files(&ids).await? {
            files_by_submission
                .entry(file.submission_id)
                .or_default()
                .push(file.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let files = files_by_submission.remove(&row.id).unwrap_or_default();
                row.into_domain(files)
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl SubmissionStore for FormSubmissionRepository {
    async fn insert_with_files(
        &self,
        submission: NewFormSubmission,
        files: Vec<StoredFile>,
    ) -> Result<FormSubmission, StoreError> {
        let (row, file_rows) = self
            .insert_submission(submission, files)
            .await
            .map_err(store_error)?;
        Ok(row.into_domain(file_rows.into_iter().map(Into::into).collect()))
    }

    async fn list(
        &self,
        schema_ids: &[Uuid],
        filter: &SubmissionFilter,
    ) -> Result<Vec<FormSubmission>, StoreError> {
        let rows = self
            .find_matching(schema_ids, filter)
            .await
            .map_err(store_error)?;
        self.with_files(rows).await.map_err(store_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSubmission>, StoreError> {
        let Some(row) = FormSubmissionRepository::find_by_id(self, id)
            .await
            .map_err(store_error)?
        else {
            return Ok(None);
        };
        let mut submissions = self.with_files(vec![row]).await.map_err(store_error)?;
        Ok(submissions.pop())
    }

    async fn count_by_schema(&self, schema_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, StoreError> {
        FormSubmissionRepository::count_by_schema(self, schema_ids)
            .await
            .map(|rows| rows.into_iter().collect())
            .map_err(store_error)
    }
}
