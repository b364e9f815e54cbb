//! Form submission endpoint handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, OptionalUserAuth, UserAuth};
use crate::middleware::metrics::{record_submission_accepted, record_submission_rejected};
use domain::errors::FormError;
use domain::models::form_submission::{
    ListSubmissionsResponse, SubmissionResponse, SubmitRequest, SubmitResponse,
};
use domain::models::{FileUpload, SubmissionData};
use domain::services::SubmitInput;

/// Multipart part names accepted for uploaded files.
const FILE_PART_NAMES: &[&str] = &["files", "files[]", "file"];

async fn accept(
    state: &AppState,
    input: SubmitInput,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    match state.submissions.submit(input).await {
        Ok(submission) => {
            record_submission_accepted(submission.files.len());
            Ok((StatusCode::CREATED, Json(SubmitResponse::new(submission.id))))
        }
        Err(err) => {
            if matches!(err, FormError::Validation(_)) {
                record_submission_rejected();
            }
            Err(err.into())
        }
    }
}

/// Submit a form with a JSON body.
///
/// POST /api/v1/submissions
pub async fn submit(
    State(state): State<AppState>,
    OptionalUserAuth(auth): OptionalUserAuth,
    ClientIp(ip): ClientIp,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let input = SubmitInput {
        slug: request.slug,
        data: request.data,
        ip_address: ip,
        submitted_by: auth.map(|a| a.actor.user_id),
        files: Vec::new(),
    };
    accept(&state, input).await
}

/// Submit a form with file attachments.
///
/// POST /api/v1/submissions/upload
///
/// Parts: `slug` (text), `data` (JSON object as text) and any number of
/// `files` parts.
pub async fn submit_with_files(
    State(state): State<AppState>,
    OptionalUserAuth(auth): OptionalUserAuth,
    ClientIp(ip): ClientIp,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut slug = None;
    let mut data = SubmissionData::new();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "slug" => slug = Some(field.text().await?.trim().to_string()),
            "data" => {
                let text = field.text().await?;
                data = serde_json::from_str(&text).map_err(|e| {
                    ApiError::Validation(format!("data must be a JSON object: {}", e))
                })?;
            }
            part if FILE_PART_NAMES.contains(&part) => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                files.push(FileUpload {
                    name: file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => {
                tracing::debug!(part = %other, "Ignoring unknown multipart part");
            }
        }
    }

    let slug = slug
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("slug is required".to_string()))?;

    let input = SubmitInput {
        slug,
        data,
        ip_address: ip,
        submitted_by: auth.map(|a| a.actor.user_id),
        files,
    };
    accept(&state, input).await
}

/// Submissions across every form the caller created.
///
/// GET /api/v1/submissions
pub async fn list_my_submissions(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Json<ListSubmissionsResponse>, ApiError> {
    let submissions: Vec<SubmissionResponse> = state
        .submissions
        .list_owned_submissions(&auth.actor)
        .await?
        .into_iter()
        .map(|(submission, schema)| SubmissionResponse::new(submission, schema.title, schema.slug))
        .collect();
    let total = submissions.len();

    Ok(Json(ListSubmissionsResponse { submissions, total }))
}

/// Get one submission of a form the caller created.
///
/// GET /api/v1/submissions/:id
pub async fn get_submission(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let (submission, schema) = state.submissions.get_submission(id, &auth.actor).await?;
    Ok(Json(SubmissionResponse::new(
        submission,
        schema.title,
        schema.slug,
    )))
}
