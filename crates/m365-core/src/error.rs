use crate::directory::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("invalid visibility '{0}': must be 'public' or 'private'")]
    InvalidVisibility(String),

    #[error("invalid channel type '{0}': must be 'standard' or 'private'")]
    InvalidChannelType(String),

    #[error("invalid role '{0}': must be 'owner' or 'member'")]
    InvalidRole(String),

    #[error("invalid template syntax: {0}")]
    InvalidTemplateSyntax(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("template already exists: {0}")]
    TemplateExists(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("{context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: RemoteError,
    },

    #[error("{0} timed out after {1}s")]
    Timeout(String, u64),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AdminError {
    /// Wrap a boundary failure with a short description of the attempted call.
    pub fn remote(context: impl Into<String>, source: RemoteError) -> Self {
        AdminError::Remote {
            context: context.into(),
            source,
        }
    }

    /// True for errors raised before any remote call was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AdminError::InvalidEmail(_)
                | AdminError::InvalidVisibility(_)
                | AdminError::InvalidChannelType(_)
                | AdminError::InvalidRole(_)
                | AdminError::InvalidTemplateSyntax(_)
                | AdminError::MissingField(_)
                | AdminError::InvalidConfig(_)
                | AdminError::TemplateNotFound(_)
                | AdminError::TemplateExists(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_keeps_context_and_source() {
        let err = AdminError::remote(
            "create channel 'alerts'",
            RemoteError::new(Some(403), "Forbidden"),
        );
        let text = err.to_string();
        assert!(text.starts_with("create channel 'alerts'"));
        assert!(text.contains("Forbidden"));
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_errors_are_tagged() {
        assert!(AdminError::InvalidRole("admin".into()).is_validation());
        assert!(AdminError::InvalidEmail("nope".into()).is_validation());
        assert!(!AdminError::UserNotFound("a@b.io".into()).is_validation());
    }
}
