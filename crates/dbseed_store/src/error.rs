//! Store error taxonomy.
//!
//! Driver errors are classified into the few cases the runner treats
//! differently: everything is fatal except [`StoreError::Conflict`], which the
//! runner may fold into the existing-target path.

use mongodb::error::ErrorKind;

/// MongoDB `Unauthorized`.
pub const CODE_UNAUTHORIZED: i32 = 13;
/// MongoDB `AuthenticationFailed`.
pub const CODE_AUTHENTICATION_FAILED: i32 = 18;
/// MongoDB `NamespaceExists`, returned by `create` for an existing collection.
pub const CODE_NAMESPACE_EXISTS: i32 = 48;
/// MongoDB `DuplicateKey`.
pub const CODE_DUPLICATE_KEY: i32 = 11000;
/// MongoDB `Location51003`, returned by `createUser` for an existing user.
pub const CODE_USER_ALREADY_EXISTS: i32 = 51003;

/// Errors that can occur while talking to a document store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The server is unreachable or rejected our credentials.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connected user lacks the rights for the requested operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The target was created by someone else between check and create.
    #[error("already exists: {0}")]
    Conflict(String),

    /// Any other server or driver failure.
    #[error("database error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` for a check-then-create race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Classify a server command failure by its error code.
    #[must_use]
    pub fn from_command(code: i32, message: &str) -> Self {
        match code {
            CODE_UNAUTHORIZED => StoreError::Permission(message.to_string()),
            CODE_AUTHENTICATION_FAILED => StoreError::Connection(message.to_string()),
            CODE_NAMESPACE_EXISTS | CODE_DUPLICATE_KEY | CODE_USER_ALREADY_EXISTS => {
                StoreError::Conflict(message.to_string())
            }
            _ => StoreError::Backend(format!("{message} (code {code})")),
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Command(cmd) => StoreError::from_command(cmd.code, &cmd.message),
            ErrorKind::Authentication { message, .. } => {
                StoreError::Connection(format!("authentication failed: {message}"))
            }
            ErrorKind::ServerSelection { message, .. } | ErrorKind::DnsResolve { message, .. } => {
                StoreError::Connection(message.clone())
            }
            ErrorKind::Io(io) => StoreError::Connection(io.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_permission() {
        let err = StoreError::from_command(CODE_UNAUTHORIZED, "not authorized on admin");
        assert!(matches!(err, StoreError::Permission(_)));
    }

    #[test]
    fn test_auth_failure_is_connection() {
        let err = StoreError::from_command(CODE_AUTHENTICATION_FAILED, "bad auth");
        assert!(matches!(err, StoreError::Connection(_)));
    }

    #[test]
    fn test_existing_targets_are_conflicts() {
        for code in [
            CODE_NAMESPACE_EXISTS,
            CODE_DUPLICATE_KEY,
            CODE_USER_ALREADY_EXISTS,
        ] {
            assert!(StoreError::from_command(code, "exists").is_conflict());
        }
    }

    #[test]
    fn test_other_codes_are_backend() {
        let err = StoreError::from_command(2, "BadValue");
        assert_eq!(err.to_string(), "database error: BadValue (code 2)");
        assert!(!err.is_conflict());
    }
}
