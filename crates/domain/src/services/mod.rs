//! Domain services for the forms backend.
//!
//! Services contain business logic that operates on domain models.

pub mod form_schema;
pub mod schema_validation;
pub mod submission;

pub use form_schema::{FormSchemaService, FormsPolicy, SlugGenerator, DEFAULT_ELEVATED_ROLE};
pub use submission::{validate_submission, SubmissionService, SubmitInput};
