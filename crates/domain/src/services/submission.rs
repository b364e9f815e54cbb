//! Submission intake and querying.
//!
//! Submissions are checked against the live schema at write time and stored
//! together with their file records in one atomic insert.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::form_schema::FormSchemaService;
use crate::errors::{FormError, ViolationCode, Violations};
use crate::models::{
    Actor, FileUpload, FormSchema, FormSubmission, StoredFile, SubmissionData, SubmissionFilter,
};
use crate::store::{FileStorage, NewFormSubmission, SubmissionStore};

/// Checks `data` against the fields of `schema`.
///
/// Reports every required field that has no value, in schema order, and every
/// key the schema does not define.
pub fn validate_submission(schema: &FormSchema, data: &SubmissionData) -> Result<(), Violations> {
    let mut violations = Violations::new();

    for field_id in schema.required_field_ids() {
        if !data.contains(field_id) {
            violations.push(
                field_id,
                ViolationCode::RequiredFieldMissing,
                format!("Required field '{}' is missing", field_id),
            );
        }
    }

    for key in data.keys() {
        if schema.field(key).is_none() {
            violations.push(
                key,
                ViolationCode::UnknownField,
                format!("Field '{}' is not part of this form", key),
            );
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Input for [`SubmissionService::submit`].
#[derive(Debug, Clone)]
pub struct SubmitInput {
    pub slug: String,
    pub data: SubmissionData,
    pub ip_address: Option<IpAddr>,
    pub submitted_by: Option<Uuid>,
    pub files: Vec<FileUpload>,
}

/// Accepts, stores and lists form submissions.
#[derive(Clone)]
pub struct SubmissionService {
    forms: FormSchemaService,
    submissions: Arc<dyn SubmissionStore>,
    files: Arc<dyn FileStorage>,
}

impl std::fmt::Debug for SubmissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionService")
            .field("forms", &self.forms)
            .finish_non_exhaustive()
    }
}

impl SubmissionService {
    pub fn new(
        forms: FormSchemaService,
        submissions: Arc<dyn SubmissionStore>,
        files: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            forms,
            submissions,
            files,
        }
    }

    /// Validates and persists a submission.
    pub async fn submit(&self, input: SubmitInput) -> Result<FormSubmission, FormError> {
        let schema = self.forms.get_by_slug(&input.slug).await?;

        if input.submitted_by.is_none() && !self.forms.policy().allow_anonymous_submissions {
            return Err(FormError::PermissionDenied(
                "Anonymous submissions are not accepted".to_string(),
            ));
        }

        if let Err(violations) = validate_submission(&schema, &input.data) {
            info!(
                form_id = %schema.id,
                missing = ?violations.missing_fields(),
                violations = violations.len(),
                "Submission rejected"
            );
            return Err(FormError::Validation(violations));
        }

        let stored = self.store_files(input.files).await?;

        let new_submission = NewFormSubmission {
            form_schema_id: schema.id,
            data: input.data,
            submitted_by: input.submitted_by,
            ip_address: input.ip_address,
        };

        match self
            .submissions
            .insert_with_files(new_submission, stored.clone())
            .await
        {
            Ok(submission) => {
                info!(
                    submission_id = %submission.id,
                    form_id = %schema.id,
                    files = submission.files.len(),
                    anonymous = submission.submitted_by.is_none(),
                    "Submission accepted"
                );
                Ok(submission)
            }
            Err(e) => {
                self.discard_files(&stored).await;
                Err(e.into())
            }
        }
    }

    async fn store_files(&self, uploads: Vec<FileUpload>) -> Result<Vec<StoredFile>, FormError> {
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.files.store(upload).await {
                Ok(file) => stored.push(file),
                Err(e) => {
                    self.discard_files(&stored).await;
                    return Err(e.into());
                }
            }
        }
        Ok(stored)
    }

    async fn discard_files(&self, files: &[StoredFile]) {
        for file in files {
            if let Err(e) = self.files.remove(&file.path).await {
                warn!(path = %file.path, error = %e, "Failed to remove orphaned upload");
            }
        }
    }

    /// Submissions of one schema owned by the caller, newest first.
    pub async fn list_submissions(
        &self,
        slug: &str,
        actor: &Actor,
        filter: &SubmissionFilter,
    ) -> Result<(FormSchema, Vec<FormSubmission>), FormError> {
        let schema = self.forms.get_owned(slug, actor).await?;
        let submissions = self.submissions.list(&[schema.id], filter).await?;
        Ok((schema, submissions))
    }

    /// Submissions across every schema the caller created, soft-deleted ones
    /// included, newest first. Each submission is paired with its schema.
    pub async fn list_owned_submissions(
        &self,
        actor: &Actor,
    ) -> Result<Vec<(FormSubmission, FormSchema)>, FormError> {
        let schemas = self.forms.list_owned(actor, true).await?;
        let ids: Vec<Uuid> = schemas.iter().map(|s| s.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let by_id: HashMap<Uuid, FormSchema> = schemas.into_iter().map(|s| (s.id, s)).collect();
        let submissions = self
            .submissions
            .list(&ids, &SubmissionFilter::default())
            .await?;

        Ok(submissions
            .into_iter()
            .filter_map(|submission| {
                by_id
                    .get(&submission.form_schema_id)
                    .cloned()
                    .map(|schema| (submission, schema))
            })
            .collect())
    }

    /// One submission, visible only to the creator of its schema.
    pub async fn get_submission(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> Result<(FormSubmission, FormSchema), FormError> {
        let not_found = || FormError::NotFound(format!("Submission '{}' not found", id));

        let submission = self
            .submissions
            .find_by_id(id)
            .await?
            .ok_or_else(not_found)?;
        let schema = self
            .forms
            .find_by_id(submission.form_schema_id)
            .await?
            .filter(|schema| schema.is_owned_by(actor.user_id))
            .ok_or_else(not_found)?;

        Ok((submission, schema))
    }
}
