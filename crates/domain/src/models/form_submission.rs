//! Form submission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use uuid::Uuid;

use super::document::{FieldValue, SubmissionData};

/// Query parameter prefix that turns a key into a per-field filter.
pub const FIELD_FILTER_PREFIX: &str = "filter_";

/// Message returned on a successful submit.
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Form submitted successfully";

/// Metadata of a blob persisted by the file storage port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Storage-relative path, e.g. `form_submissions/2026/10/19/<uuid>_cv.pdf`.
    pub path: String,
    pub name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
}

/// A file received with a submission, before it is stored.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A stored file attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFile {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub file: StoredFile,
    pub uploaded_at: DateTime<Utc>,
}

/// Represents one filled-in instance of a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: Uuid,
    pub form_schema_id: Uuid,
    pub data: SubmissionData,
    pub submitted_at: DateTime<Utc>,
    pub submitted_by: Option<Uuid>,
    pub ip_address: Option<IpAddr>,
    pub files: Vec<FormFile>,
}

/// Search and per-field equality filters for listing submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    /// Case-insensitive substring matched against the whole document.
    pub search: Option<String>,
    /// Field id to the exact textual value it must hold.
    pub fields: BTreeMap<String, String>,
}

impl SubmissionFilter {
    /// Builds a filter from raw query parameters.
    ///
    /// `search` maps to the free-text search, every `filter_<fieldId>` key to
    /// an exact-match filter. Empty values are ignored.
    pub fn from_query_params(params: &HashMap<String, String>) -> Self {
        let mut filter = Self::default();
        for (key, value) in params {
            if value.is_empty() {
                continue;
            }
            if key == "search" {
                filter.search = Some(value.clone());
            } else if let Some(field_id) = key.strip_prefix(FIELD_FILTER_PREFIX) {
                if !field_id.is_empty() {
                    filter.fields.insert(field_id.to_string(), value.clone());
                }
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.fields.is_empty()
    }

    /// Applies the filter to an in-memory document.
    pub fn matches(&self, data: &SubmissionData) -> bool {
        if let Some(search) = &self.search {
            let haystack = data.to_json_text().to_lowercase();
            if !haystack.contains(&search.to_lowercase()) {
                return false;
            }
        }
        self.fields.iter().all(|(field_id, expected)| {
            data.get(field_id)
                .map(|value| value.as_text() == *expected)
                .unwrap_or(false)
        })
    }
}

/// One selectable option drawn from a related form's submissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedOption {
    pub id: Uuid,
    pub label: FieldValue,
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request payload for submitting a form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub slug: String,
    #[serde(default)]
    pub data: SubmissionData,
}

/// Query parameters for the related-data lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedOptionsQuery {
    #[serde(alias = "target_slug")]
    pub target_slug: Option<String>,
    #[serde(alias = "display_field")]
    pub display_field: Option<String>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Response payload for a successful submit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub submission_id: Uuid,
}

impl SubmitResponse {
    pub fn new(submission_id: Uuid) -> Self {
        Self {
            message: SUBMIT_SUCCESS_MESSAGE.to_string(),
            submission_id,
        }
    }
}

/// A stored file as shown to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFileResponse {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<FormFile> for FormFileResponse {
    fn from(file: FormFile) -> Self {
        Self {
            id: file.id,
            name: file.file.name,
            path: file.file.path,
            content_type: file.file.content_type,
            size_bytes: file.file.size_bytes,
            sha256: file.file.sha256,
            uploaded_at: file.uploaded_at,
        }
    }
}

/// Response payload for a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub form_schema_id: Uuid,
    pub form_title: String,
    pub form_slug: String,
    pub data: SubmissionData,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub files: Vec<FormFileResponse>,
}

impl SubmissionResponse {
    pub fn new(submission: FormSubmission, form_title: String, form_slug: String) -> Self {
        Self {
            id: submission.id,
            form_schema_id: submission.form_schema_id,
            form_title,
            form_slug,
            data: submission.data,
            submitted_at: submission.submitted_at,
            submitted_by: submission.submitted_by,
            ip_address: submission.ip_address.map(|ip| ip.to_string()),
            files: submission.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response for listing submissions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubmissionsResponse {
    pub submissions: Vec<SubmissionResponse>,
    pub total: usize,
}
