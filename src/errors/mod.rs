use thiserror::Error;

/// Errors that abort a deployment before or during the WebDAV exchange.
///
/// Configuration and authentication problems are hard errors: nothing
/// useful can happen until the operator fixes the settings, so they
/// surface here instead of inside a `DeploymentResult`. Transport
/// failures that only sink the current flow are reported through the
/// result instead.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Please specify '{field}' in the upload settings")]
    MissingSetting { field: &'static str },

    #[error("Invalid upload settings: {details}")]
    InvalidSettings { details: String },

    #[error("Configured credentials are incorrect! (HTTP 401 from instance)")]
    AuthenticationFailed,

    #[error("{method} to '{remote_path}' failed with HTTP {status}")]
    Transport {
        method: String,
        remote_path: String,
        status: u16,
    },

    #[error("Failed to reach the server: {details}")]
    Unreachable { details: String },

    #[error("Failed to build archive '{path}': {source}")]
    Archive {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Local I/O error on '{path}': {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// HTTP status associated with the error, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeployError::AuthenticationFailed => Some(401),
            DeployError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors that must stop the whole session, not just the
    /// current flow.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeployError::AuthenticationFailed
                | DeployError::MissingSetting { .. }
                | DeployError::InvalidSettings { .. }
        )
    }
}
