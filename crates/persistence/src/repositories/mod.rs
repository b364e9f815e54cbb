//! Repository implementations for database operations.

pub mod form_schema;
pub mod form_submission;

pub use form_schema::FormSchemaRepository;
pub use form_submission::FormSubmissionRepository;

use domain::errors::StoreError;

/// Name of the unique constraint guarding public slugs.
pub const SLUG_UNIQUE_CONSTRAINT: &str = "form_schemas_slug_key";

/// Maps a database error onto the storage port's error type.
///
/// A unique violation on the slug constraint becomes
/// [`StoreError::SlugConflict`] so the caller can retry with a new slug.
pub fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(SLUG_UNIQUE_CONSTRAINT)
        {
            return StoreError::SlugConflict;
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_backend_errors() {
        let err = store_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend(_)));

        let err = store_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Backend(msg) if msg.contains("pool")));
    }
}
