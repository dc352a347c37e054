use serde::Serialize;

/// Outcome of one deployment flow, returned to the triggering caller.
///
/// A skipped result (file outside any cartridge, or uploads disabled
/// in the settings) counts as neither success nor failure; no
/// transport call was made for it.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub success: bool,
    pub skipped: bool,
    /// Remote path the flow targeted, relative to the code version root.
    pub remote_path: Option<String>,
    /// HTTP status of the failing request, when one was received.
    pub status_code: Option<u16>,
    /// Human-readable progress/status line for display.
    pub message: String,
}

impl DeploymentResult {
    pub fn deployed(remote_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: false,
            remote_path: Some(remote_path.into()),
            status_code: None,
            message: message.into(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: true,
            remote_path: None,
            status_code: None,
            message: message.into(),
        }
    }

    pub fn failed(
        remote_path: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            skipped: false,
            remote_path: Some(remote_path.into()),
            status_code,
            message: message.into(),
        }
    }
}
