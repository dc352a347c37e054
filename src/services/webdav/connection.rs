use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{Client, Method};
use tracing::{debug, error, info, warn};

use super::config::WebDavConfig;
use crate::errors::DeployError;

/// Control body for the server-side archive extraction extension.
const UNZIP_BODY: &[u8] = b"method=UNZIP";

/// Outcome of a single WebDAV request. `status` is `None` when the
/// server never produced a response.
#[derive(Debug, Clone, Copy)]
pub struct WebDavResponse {
    pub success: bool,
    pub status: Option<u16>,
}

impl WebDavResponse {
    /// True when the failure is a plain 404, which some steps (DELETE
    /// pre-clean) treat as "already absent".
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Authenticated WebDAV client for one instance and code version.
///
/// One connection serves one deployment flow. A 401 response latches
/// the connection: every later call fails fast with the credential
/// error without touching the network, so no step of the session can
/// run after authentication has been rejected.
pub struct WebDavConnection {
    client: Client,
    config: WebDavConfig,
    auth_rejected: AtomicBool,
}

impl WebDavConnection {
    pub fn new(config: WebDavConfig) -> Result<Self, DeployError> {
        config.validate()?;
        let client = Client::builder()
            .build()
            .map_err(|e| DeployError::InvalidSettings {
                details: format!("could not build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            auth_rejected: AtomicBool::new(false),
        })
    }

    /// Performs one authenticated request against a path relative to
    /// the code version root.
    ///
    /// Non-2xx statuses other than 401 are normal failures reported in
    /// the response; network-level unreachability yields a response
    /// with no status. Only a 401 is an error, and it is fatal for the
    /// whole connection.
    pub async fn request(
        &self,
        remote_path: &str,
        method: Method,
        body: Option<Vec<u8>>,
    ) -> Result<WebDavResponse, DeployError> {
        if self.auth_rejected.load(Ordering::SeqCst) {
            return Err(DeployError::AuthenticationFailed);
        }

        let url = self.config.url_for(remote_path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .basic_auth(&self.config.username, Some(&self.config.password));

        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("We failed to reach the server ({} '{}'): {}", method, url, e);
                return Ok(WebDavResponse {
                    success: false,
                    status: None,
                });
            }
        };

        let status = response.status();
        if status.as_u16() == 401 {
            self.auth_rejected.store(true, Ordering::SeqCst);
            error!("Authentication rejected by '{}', aborting session", self.config.instance);
            return Err(DeployError::AuthenticationFailed);
        }

        if !status.is_success() {
            debug!(
                "The server couldn't fulfill the request (HTTP {} to '{}'): {}",
                method, url, status
            );
        }

        Ok(WebDavResponse {
            success: status.is_success(),
            status: Some(status.as_u16()),
        })
    }

    /// Existence probe: a plain GET, success inferred from the status
    /// alone. Response content is never read.
    pub async fn exists(&self, remote_path: &str) -> Result<bool, DeployError> {
        let response = self.request(remote_path, Method::GET, None).await?;
        if response.success {
            debug!("File '{}' already exists on server", remote_path);
        }
        Ok(response.success)
    }

    pub async fn put(&self, remote_path: &str, bytes: Vec<u8>) -> Result<WebDavResponse, DeployError> {
        self.request(remote_path, Method::PUT, Some(bytes)).await
    }

    /// MKCOL on a collection path. Repeating it on an existing
    /// collection reports failure; callers treat that as harmless
    /// since this client cannot tell "created" from "already exists".
    pub async fn mkdir(&self, remote_path: &str) -> Result<WebDavResponse, DeployError> {
        info!("Creating directory '{}' on server", remote_path);
        let mkcol = Method::from_bytes(b"MKCOL").map_err(|e| DeployError::InvalidSettings {
            details: format!("invalid MKCOL method token: {}", e),
        })?;
        self.request(remote_path, mkcol, None).await
    }

    /// Asks the server to extract an archive previously uploaded at
    /// `remote_path` into its enclosing collection.
    pub async fn unzip(&self, remote_path: &str) -> Result<WebDavResponse, DeployError> {
        self.request(remote_path, Method::POST, Some(UNZIP_BODY.to_vec()))
            .await
    }

    pub async fn delete(&self, remote_path: &str) -> Result<WebDavResponse, DeployError> {
        self.request(remote_path, Method::DELETE, None).await
    }

    /// Connection probe for the `check` command: GETs the code version
    /// root and reports reachability.
    pub async fn probe(&self) -> Result<WebDavResponse, DeployError> {
        info!("Probing '{}'", self.config.url_for(""));
        self.request("", Method::GET, None).await
    }
}
