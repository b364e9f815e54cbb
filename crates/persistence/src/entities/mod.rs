//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod form_schema;
pub mod form_submission;

pub use form_schema::FormSchemaEntity;
pub use form_submission::{FormFileEntity, FormSubmissionEntity};
