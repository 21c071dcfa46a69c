use m365_core::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unsupported authentication method: {0}")]
    UnsupportedAuth(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl GraphError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GraphError::Http(e) => e.status().map(|s| s.as_u16()),
            GraphError::Api { status, .. } => Some(*status),
            GraphError::Auth(_) => Some(401),
            GraphError::UnsupportedAuth(_) | GraphError::Unexpected(_) => None,
        }
    }
}

impl From<GraphError> for RemoteError {
    fn from(e: GraphError) -> Self {
        let status = e.status();
        let message = match e {
            GraphError::Api {
                code: Some(code),
                message,
                ..
            } => format!("{code}: {message}"),
            GraphError::Api { message, .. } => message,
            other => other.to_string(),
        };
        RemoteError::new(status, message)
    }
}
