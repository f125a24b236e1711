use thiserror::Error;
use uuid::Uuid;

use crate::auth::{JwtError, PasswordError};
use crate::database::models::ItemInputError;
use crate::database::DatabaseError;
use crate::filter::FilterError;
use crate::notifier::NotifierError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    #[error("No modifiable fields supplied")]
    NoModifiableFields,

    #[error("{0} not found")]
    NotFound(String),

    #[error("No profile exists for user {0}")]
    AuthorProfileNotFound(Uuid),

    #[error("{0} already in use")]
    Conflict(String),

    #[error("Incorrect credentials")]
    IncorrectCredentials,

    #[error("Email has not been verified")]
    EmailNotVerified,

    #[error("{0}")]
    Forbidden(String),

    /// Signup stopped after the user had been committed.
    #[error("Failed to {failed} after {}", .completed.join(", "))]
    PartialFailure {
        user_id: Uuid,
        completed: Vec<&'static str>,
        failed: &'static str,
        #[source]
        source: Box<ServiceError>,
    },

    #[error("Email delivery failed: {0}")]
    Delivery(#[from] NotifierError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Persistence(DatabaseError),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(field) => ServiceError::Conflict(field),
            DatabaseError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Persistence(other),
        }
    }
}

impl From<ItemInputError> for ServiceError {
    fn from(err: ItemInputError) -> Self {
        match err {
            ItemInputError::MissingField(field) => ServiceError::MissingFields(vec![field.to_string()]),
            ItemInputError::BlankField(_) => ServiceError::Validation(err.to_string()),
        }
    }
}

/// Collect the names of blank or absent required fields.
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<(), ServiceError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::MissingFields(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields_lists_every_gap() {
        let err = require_fields(&[("email", Some("a@b.c")), ("password", Some("  ")), ("handle", None)]).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: password, handle");
        assert!(require_fields(&[("email", Some("a@b.c"))]).is_ok());
    }

    #[test]
    fn test_database_errors_keep_their_meaning() {
        assert!(matches!(ServiceError::from(DatabaseError::Conflict("email".into())), ServiceError::Conflict(f) if f == "email"));
        assert!(matches!(ServiceError::from(DatabaseError::QueryError("boom".into())), ServiceError::Persistence(_)));
    }

    #[test]
    fn test_partial_failure_names_the_step() {
        let err = ServiceError::PartialFailure {
            user_id: Uuid::new_v4(),
            completed: vec!["create user", "create contact card"],
            failed: "create profile",
            source: Box::new(ServiceError::Persistence(DatabaseError::QueryError("x".into()))),
        };
        assert_eq!(err.to_string(), "Failed to create profile after create user, create contact card");
    }
}
