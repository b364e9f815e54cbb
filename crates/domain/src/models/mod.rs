//! Domain models for the forms backend.

pub mod actor;
pub mod document;
pub mod form_schema;
pub mod form_submission;

pub use actor::Actor;
pub use document::{FieldValue, SubmissionData};
pub use form_schema::{FieldDefinition, FormSchema, LanguageConfig, Relationship};
pub use form_submission::{
    FileUpload, FormFile, FormSubmission, RelatedOption, StoredFile, SubmissionFilter,
};
