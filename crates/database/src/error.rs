use core_types::CoreError;
use std::time::Duration;
use thiserror::Error;

/// Broad failure classes a caller branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or contradictory input, caught by validation or by a schema
    /// constraint. Retrying the same call fails the same way.
    Validation,
    /// The form does not exist or belongs to someone else. Never split.
    NotFoundOrUnauthorized,
    /// Connection, pool, commit or deadline failure. Nothing partial was
    /// committed, so the whole operation may be retried.
    TransientInfrastructure,
    /// Stored data breaks a schema invariant, e.g. a form without its detail
    /// row. Not caused by the caller and not fixed by retrying.
    Integrity,
    /// Startup problems: bad connection settings or a failed migration.
    Setup,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load database connection settings: {0}")]
    ConnectionConfigError(String),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid form data: {0}")]
    Validation(String),

    /// Deliberately carries no detail so absent and foreign forms look alike.
    #[error("form not found")]
    NotFoundOrUnauthorized,

    #[error("Stored form data is inconsistent: {0}")]
    Integrity(String),

    #[error("Database unavailable: {0}")]
    Transient(#[source] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    TimedOut(Duration),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::NotFoundOrUnauthorized => ErrorKind::NotFoundOrUnauthorized,
            DbError::Transient(_) | DbError::TimedOut(_) => ErrorKind::TransientInfrastructure,
            DbError::Integrity(_) => ErrorKind::Integrity,
            DbError::ConnectionConfigError(_) | DbError::MigrationError(_) => ErrorKind::Setup,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientInfrastructure
    }
}

/// Maps a Postgres SQLSTATE to the class it belongs to.
///
/// Class 22 (data exception) and class 23 (integrity constraint violation,
/// including the trigger raises in the forms schema) are caller mistakes;
/// anything else is treated as infrastructure.
pub fn classify_sqlstate(code: &str) -> ErrorKind {
    if code.starts_with("22") || code.starts_with("23") {
        ErrorKind::Validation
    } else {
        ErrorKind::TransientInfrastructure
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return DbError::NotFoundOrUnauthorized;
        }
        if let sqlx::Error::Database(db_err) = &err {
            let is_validation = db_err
                .code()
                .is_some_and(|code| classify_sqlstate(&code) == ErrorKind::Validation);
            if is_validation {
                return DbError::Validation(db_err.message().to_string());
            }
        }
        DbError::Transient(err)
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => DbError::Validation(message),
            CoreError::Unauthorized | CoreError::Forbidden => DbError::NotFoundOrUnauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_classes_are_validation_failures() {
        assert_eq!(classify_sqlstate("23514"), ErrorKind::Validation); // check_violation
        assert_eq!(classify_sqlstate("23503"), ErrorKind::Validation); // foreign_key_violation
        assert_eq!(classify_sqlstate("23000"), ErrorKind::Validation); // deferred detail check
        // invalid_text_representation
        assert_eq!(classify_sqlstate("22P02"), ErrorKind::Validation);
        assert_eq!(classify_sqlstate("08006"), ErrorKind::TransientInfrastructure);
        assert_eq!(classify_sqlstate("40001"), ErrorKind::TransientInfrastructure);
        // query_canceled
        assert_eq!(classify_sqlstate("57014"), ErrorKind::TransientInfrastructure);
    }

    #[test]
    fn missing_rows_become_not_found() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFoundOrUnauthorized);
        assert_eq!(err.to_string(), "form not found");
    }

    #[test]
    fn pool_and_io_failures_are_retryable() {
        assert!(DbError::from(sqlx::Error::PoolTimedOut).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(DbError::from(sqlx::Error::Io(io)).is_retryable());
        assert!(DbError::TimedOut(Duration::from_secs(1)).is_retryable());
        assert!(!DbError::Validation("x".into()).is_retryable());
        assert!(!DbError::Integrity("x".into()).is_retryable());
    }

    #[test]
    fn auth_refusals_are_indistinguishable_from_missing_forms() {
        let unauthorized = DbError::from(CoreError::Unauthorized);
        let forbidden = DbError::from(CoreError::Forbidden);
        assert_eq!(unauthorized.kind(), ErrorKind::NotFoundOrUnauthorized);
        assert_eq!(unauthorized.to_string(), DbError::NotFoundOrUnauthorized.to_string());
        assert_eq!(forbidden.to_string(), DbError::NotFoundOrUnauthorized.to_string());
    }
}
