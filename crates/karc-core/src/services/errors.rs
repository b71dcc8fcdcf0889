//! Typed error types for the karc-core service layer.

use thiserror::Error;

use crate::policy::Action;

/// Result type alias for core service operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Failures reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailInUse,

    #[error("Password must be at least {min_len} characters")]
    WeakPassword { min_len: usize },

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Not signed in")]
    NotSignedIn,

    /// The credential store could not be reached or answered with an error.
    #[error("Authentication service unavailable: {0}")]
    BackendUnavailable(String),
}

/// Input rejected before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("Unknown {purpose} field '{field}' for {kind} (expected one of: {expected})")]
    UnknownField {
        kind: &'static str,
        purpose: &'static str,
        field: String,
        expected: String,
    },

    #[error("Invalid {field}: {message}")]
    Invalid { field: String, message: String },

    /// Import header lacks required columns. Nothing was inserted.
    #[error("Missing required column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Unsupported import format '{extension}' (expected .csv, .tsv or .txt)")]
    UnsupportedFormat { extension: String },

    #[error("Import file has no header row")]
    EmptyImport,
}

/// Errors that can occur in the karc-core service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The actor's role does not allow the action.
    #[error("Permission denied: your role does not allow {action}")]
    PermissionDenied { action: Action },

    /// Signed in, but an admin has not approved the account yet.
    #[error("Your account is pending approval")]
    PendingApproval,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Only the author of a record may perform this on it.
    #[error("Only the author can delete this {kind}")]
    NotAuthor { kind: &'static str },

    #[error("No portal data at {path}. Run 'karc init' first.")]
    NotInitialized { path: String },

    /// Store unreachable or query failure.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl CoreError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
