use thiserror::Error;

/// Errors raised while provisioning permissions.
///
/// Fatality scope: `Authentication` aborts the whole run,
/// `VendorUnavailable` is fatal during login and object-scoped afterwards,
/// everything else is scoped to a single object or field.
#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("configuration error for {object}: {reason}")]
    Configuration { object: String, reason: String },

    #[error("failed to create permission set {name}: {reason}")]
    PermissionSetCreation { name: String, reason: String },

    #[error("field permission for {field}: {reason}")]
    FieldPermission { field: String, reason: String },

    #[error("vendor unavailable: {0}")]
    VendorUnavailable(String),
}

impl Error {
    /// True when the session itself is no longer usable and the run must stop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
