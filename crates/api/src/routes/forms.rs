//! Form schema endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::{record_form_created, record_form_deleted};
use domain::models::form_schema::{
    CreateFormSchemaRequest, DeleteFormSchemaResponse, FormSchemaResponse,
    ListFormSchemasResponse, UpdateFormSchemaRequest,
};
use domain::models::form_submission::{
    ListSubmissionsResponse, RelatedOptionsQuery, SubmissionResponse,
};
use domain::models::{RelatedOption, SubmissionFilter};

/// Query parameters for listing the caller's forms.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFormsQuery {
    #[serde(default, alias = "include_deleted")]
    pub include_deleted: bool,
}

/// Create a new form schema.
///
/// POST /api/v1/forms
pub async fn create_form(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateFormSchemaRequest>,
) -> Result<(StatusCode, Json<FormSchemaResponse>), ApiError> {
    let schema = state.forms.create(request, &auth.actor).await?;
    record_form_created();

    Ok((StatusCode::CREATED, Json(FormSchemaResponse::new(schema, 0))))
}

/// List the caller's forms, newest first.
///
/// GET /api/v1/forms
pub async fn list_forms(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListFormsQuery>,
) -> Result<Json<ListFormSchemasResponse>, ApiError> {
    let schemas = state
        .forms
        .list_owned(&auth.actor, query.include_deleted)
        .await?;
    let counts = state.forms.submission_counts(&schemas).await?;

    let forms: Vec<FormSchemaResponse> = schemas
        .into_iter()
        .map(|schema| {
            let count = counts.get(&schema.id).copied().unwrap_or(0);
            FormSchemaResponse::new(schema, count)
        })
        .collect();
    let total = forms.len();

    Ok(Json(ListFormSchemasResponse { forms, total }))
}

/// Get one of the caller's forms.
///
/// GET /api/v1/forms/:slug
pub async fn get_form(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(slug): Path<String>,
) -> Result<Json<FormSchemaResponse>, ApiError> {
    let schema = state.forms.get_owned(&slug, &auth.actor).await?;
    let count = state.forms.submission_count(&schema).await?;
    Ok(Json(FormSchemaResponse::new(schema, count)))
}

/// Public form definition used to render the form.
///
/// GET /api/v1/forms/:slug/public
pub async fn get_public_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<FormSchemaResponse>, ApiError> {
    let schema = state.forms.get_by_slug(&slug).await?;
    let count = state.forms.submission_count(&schema).await?;
    Ok(Json(FormSchemaResponse::new(schema, count)))
}

/// Partially update a form.
///
/// PATCH /api/v1/forms/:slug
pub async fn update_form(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(slug): Path<String>,
    Json(request): Json<UpdateFormSchemaRequest>,
) -> Result<Json<FormSchemaResponse>, ApiError> {
    if request.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }

    let schema = state.forms.update(&slug, request, &auth.actor).await?;
    let count = state.forms.submission_count(&schema).await?;
    Ok(Json(FormSchemaResponse::new(schema, count)))
}

/// Soft delete a form. Its submissions and files are kept.
///
/// DELETE /api/v1/forms/:slug
pub async fn delete_form(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(slug): Path<String>,
) -> Result<Json<DeleteFormSchemaResponse>, ApiError> {
    state.forms.soft_delete(&slug, &auth.actor).await?;
    record_form_deleted();

    Ok(Json(DeleteFormSchemaResponse {
        message: "Form deleted successfully.".to_string(),
    }))
}

/// List the submissions of one of the caller's forms.
///
/// GET /api/v1/forms/:slug/submissions?search=..&filter_<fieldId>=..
pub async fn list_form_submissions(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ListSubmissionsResponse>, ApiError> {
    let filter = SubmissionFilter::from_query_params(&params);
    let (schema, submissions) = state
        .submissions
        .list_submissions(&slug, &auth.actor, &filter)
        .await?;

    info!(
        slug = %slug,
        filtered = !filter.is_empty(),
        count = submissions.len(),
        "Listed form submissions"
    );

    let submissions: Vec<SubmissionResponse> = submissions
        .into_iter()
        .map(|s| SubmissionResponse::new(s, schema.title.clone(), schema.slug.clone()))
        .collect();
    let total = submissions.len();

    Ok(Json(ListSubmissionsResponse { submissions, total }))
}

/// Options for a dependent field drawn from another form's submissions.
///
/// GET /api/v1/forms/:slug/related-data?targetSlug=..&displayField=..
pub async fn related_data(
    State(state): State<AppState>,
    _auth: UserAuth,
    Path(slug): Path<String>,
    Query(query): Query<RelatedOptionsQuery>,
) -> Result<Json<Vec<RelatedOption>>, ApiError> {
    let target_slug = query
        .target_slug
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("targetSlug is required".to_string()))?;

    let display_field = state
        .forms
        .resolve_display_field(&slug, &target_slug, query.display_field)
        .await?;
    let options = state
        .forms
        .list_related_options(&target_slug, &display_field)
        .await?;

    Ok(Json(options))
}
