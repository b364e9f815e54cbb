//! Form schema lifecycle: define, update, soft-delete and look up blueprints.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::schema_validation::{
    check_relationship_sources, validate_fields, validate_language_config,
    validate_relationships,
};
use crate::errors::{FormError, StoreError, ViolationCode, Violations};
use crate::models::form_schema::{CreateFormSchemaRequest, UpdateFormSchemaRequest};
use crate::models::{Actor, FormSchema, RelatedOption, SubmissionFilter};
use crate::store::{FormSchemaStore, NewFormSchema, SubmissionStore};

/// Role allowed to create and delete form schemas unless configured otherwise.
pub const DEFAULT_ELEVATED_ROLE: &str = "superemployee";

/// Default number of slug draws before creation gives up.
pub const DEFAULT_SLUG_MAX_ATTEMPTS: u32 = 5;

/// Produces candidate slugs. Replaceable so tests can force collisions.
pub type SlugGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Access and creation rules applied by the form services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormsPolicy {
    /// Role required to create or soft-delete schemas.
    pub elevated_role: String,
    /// Whether submissions without an authenticated submitter are accepted.
    pub allow_anonymous_submissions: bool,
    pub slug_max_attempts: u32,
}

impl Default for FormsPolicy {
    fn default() -> Self {
        Self {
            elevated_role: DEFAULT_ELEVATED_ROLE.to_string(),
            allow_anonymous_submissions: true,
            slug_max_attempts: DEFAULT_SLUG_MAX_ATTEMPTS,
        }
    }
}

/// Manages form schemas on top of the storage ports.
#[derive(Clone)]
pub struct FormSchemaService {
    schemas: Arc<dyn FormSchemaStore>,
    submissions: Arc<dyn SubmissionStore>,
    policy: FormsPolicy,
    slug_generator: SlugGenerator,
}

impl std::fmt::Debug for FormSchemaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSchemaService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FormSchemaService {
    pub fn new(
        schemas: Arc<dyn FormSchemaStore>,
        submissions: Arc<dyn SubmissionStore>,
        policy: FormsPolicy,
    ) -> Self {
        Self {
            schemas,
            submissions,
            policy,
            slug_generator: Arc::new(shared::crypto::generate_slug),
        }
    }

    pub fn with_slug_generator(mut self, generator: SlugGenerator) -> Self {
        self.slug_generator = generator;
        self
    }

    pub fn policy(&self) -> &FormsPolicy {
        &self.policy
    }

    fn is_elevated(&self, actor: &Actor) -> bool {
        actor.has_role(&self.policy.elevated_role)
    }

    /// Creates a schema with a freshly generated slug.
    pub async fn create(
        &self,
        request: CreateFormSchemaRequest,
        actor: &Actor,
    ) -> Result<FormSchema, FormError> {
        if !self.is_elevated(actor) {
            return Err(FormError::PermissionDenied(
                "Only staff with the elevated role can create forms".to_string(),
            ));
        }

        let mut violations = match request.validate() {
            Ok(()) => Violations::new(),
            Err(e) => Violations::from_validation_errors(&e),
        };
        let language_config =
            validate_language_config(request.language_config.as_ref(), &mut violations);
        let fields = validate_fields(&request.fields_structure, &mut violations);
        let relationships = validate_relationships(&request.relationships, &fields, &mut violations);

        let language_config = match (violations.is_empty(), language_config) {
            (true, Some(config)) => config,
            _ => return Err(FormError::Validation(violations)),
        };

        let template = NewFormSchema {
            slug: String::new(),
            title: request.title.trim().to_string(),
            description: request.description,
            language_config,
            fields_structure: fields,
            relationships,
            created_by: actor.user_id,
        };

        for attempt in 1..=self.policy.slug_max_attempts {
            let candidate = NewFormSchema {
                slug: (self.slug_generator)(),
                ..template.clone()
            };
            match self.schemas.insert(candidate).await {
                Ok(schema) => {
                    info!(
                        form_id = %schema.id,
                        slug = %schema.slug,
                        created_by = %schema.created_by,
                        fields = schema.fields_structure.len(),
                        "Form schema created"
                    );
                    return Ok(schema);
                }
                Err(StoreError::SlugConflict) => {
                    warn!(attempt, "Slug collision while creating form schema, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(FormError::Storage(format!(
            "Could not allocate a unique slug after {} attempts",
            self.policy.slug_max_attempts
        )))
    }

    /// Applies a partial update to a non-deleted schema.
    pub async fn update(
        &self,
        slug: &str,
        request: UpdateFormSchemaRequest,
        actor: &Actor,
    ) -> Result<FormSchema, FormError> {
        let mut schema = self.get_by_slug(slug).await?;

        if !schema.is_owned_by(actor.user_id) && !self.is_elevated(actor) {
            return Err(FormError::PermissionDenied(
                "Only the creator or elevated staff can update this form".to_string(),
            ));
        }

        let mut violations = match request.validate() {
            Ok(()) => Violations::new(),
            Err(e) => Violations::from_validation_errors(&e),
        };

        if let Some(input) = &request.language_config {
            if let Some(config) = validate_language_config(Some(input), &mut violations) {
                schema.language_config = config;
            }
        }
        if let Some(inputs) = &request.fields_structure {
            schema.fields_structure = validate_fields(inputs, &mut violations);
        }
        match &request.relationships {
            Some(inputs) => {
                schema.relationships =
                    validate_relationships(inputs, &schema.fields_structure, &mut violations);
            }
            None if request.fields_structure.is_some() => {
                check_relationship_sources(
                    &schema.relationships,
                    &schema.fields_structure,
                    &mut violations,
                );
            }
            None => {}
        }
        violations.into_result()?;

        if let Some(title) = request.title {
            schema.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            schema.description = description;
        }

        let updated = self
            .schemas
            .update(&schema)
            .await?
            .ok_or_else(|| not_found(slug))?;

        info!(form_id = %updated.id, slug = %updated.slug, updated_by = %actor.user_id, "Form schema updated");
        Ok(updated)
    }

    /// Marks a schema as deleted. Submissions and files are kept.
    pub async fn soft_delete(&self, slug: &str, actor: &Actor) -> Result<(), FormError> {
        if !self.is_elevated(actor) {
            return Err(FormError::PermissionDenied(
                "Only staff with the elevated role can delete forms".to_string(),
            ));
        }

        let schema = self
            .schemas
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| not_found(slug))?;
        if schema.is_deleted {
            return Err(already_deleted());
        }

        // A concurrent delete may win between the read and the update.
        if !self.schemas.mark_deleted(slug).await? {
            return Err(already_deleted());
        }

        info!(form_id = %schema.id, slug = %slug, deleted_by = %actor.user_id, "Form schema soft-deleted");
        Ok(())
    }

    /// Public lookup. Soft-deleted schemas are not found.
    pub async fn get_by_slug(&self, slug: &str) -> Result<FormSchema, FormError> {
        match self.schemas.find_by_slug(slug).await? {
            Some(schema) if !schema.is_deleted => Ok(schema),
            _ => Err(not_found(slug)),
        }
    }

    /// Lookup restricted to the schema's creator.
    pub async fn get_owned(&self, slug: &str, actor: &Actor) -> Result<FormSchema, FormError> {
        let schema = self.get_by_slug(slug).await?;
        if !schema.is_owned_by(actor.user_id) {
            return Err(not_found(slug));
        }
        Ok(schema)
    }

    /// Lookup by id, soft-deleted schemas included.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<FormSchema>, FormError> {
        Ok(self.schemas.find_by_id(id).await?)
    }

    /// The caller's schemas, newest first.
    pub async fn list_owned(
        &self,
        actor: &Actor,
        include_deleted: bool,
    ) -> Result<Vec<FormSchema>, FormError> {
        Ok(self
            .schemas
            .list_by_owner(actor.user_id, include_deleted)
            .await?)
    }

    /// Submission counts for the given schemas, zero included.
    pub async fn submission_counts(
        &self,
        schemas: &[FormSchema],
    ) -> Result<HashMap<Uuid, i64>, FormError> {
        let ids: Vec<Uuid> = schemas.iter().map(|s| s.id).collect();
        let mut counts = self.submissions.count_by_schema(&ids).await?;
        for id in ids {
            counts.entry(id).or_insert(0);
        }
        Ok(counts)
    }

    pub async fn submission_count(&self, schema: &FormSchema) -> Result<i64, FormError> {
        let counts = self.submission_counts(std::slice::from_ref(schema)).await?;
        Ok(counts.get(&schema.id).copied().unwrap_or(0))
    }

    /// Options for a dependent field, drawn from the target form's submissions.
    ///
    /// One entry per submission holding `display_field`, newest first.
    pub async fn list_related_options(
        &self,
        target_slug: &str,
        display_field: &str,
    ) -> Result<Vec<RelatedOption>, FormError> {
        let target = self.get_by_slug(target_slug).await?;
        let submissions = self
            .submissions
            .list(&[target.id], &SubmissionFilter::default())
            .await?;

        Ok(submissions
            .into_iter()
            .filter_map(|submission| {
                submission.data.get(display_field).map(|label| RelatedOption {
                    id: submission.id,
                    label: label.clone(),
                })
            })
            .collect())
    }

    /// Resolves the display field for a related-data lookup started from
    /// `source_slug`. An explicit field wins; otherwise the source schema's
    /// relationship pointing at `target_slug` supplies it.
    pub async fn resolve_display_field(
        &self,
        source_slug: &str,
        target_slug: &str,
        display_field: Option<String>,
    ) -> Result<String, FormError> {
        if let Some(field) = display_field.filter(|f| !f.is_empty()) {
            return Ok(field);
        }

        let source = self.get_by_slug(source_slug).await?;
        source
            .relationships
            .iter()
            .find(|r| r.target_form_slug == target_slug)
            .map(|r| r.display_field.clone())
            .ok_or_else(|| {
                let mut violations = Violations::new();
                violations.push(
                    "displayField",
                    ViolationCode::MissingKey,
                    "displayField is required when no relationship targets this form",
                );
                FormError::Validation(violations)
            })
    }
}

fn not_found(slug: &str) -> FormError {
    FormError::NotFound(format!("Form '{}' not found", slug))
}

fn already_deleted() -> FormError {
    FormError::AlreadyDeleted("Form already deleted.".to_string())
}
