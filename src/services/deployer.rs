use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::cartridge::CartridgeResource;
use super::packager::{self, BULK_ARCHIVE_NAME};
use super::webdav::{WebDavConfig, WebDavConnection, WebDavResponse};
use crate::errors::DeployError;
use crate::models::DeploymentResult;

/// Sequences path resolution, packaging and the WebDAV exchange for
/// the three deployment flows.
///
/// One `Deployer` holds the settings for one flow invocation; the
/// caller loads configuration and passes it in, so flows carry no
/// hidden state and re-loading settings between runs is the caller's
/// choice. Each flow is an independent future — callers may await it
/// or spawn it fire-and-forget.
///
/// Transport failures end the flow and come back inside the
/// `DeploymentResult`; configuration and authentication failures are
/// the `Err` arm and must stop the whole session.
pub struct Deployer {
    config: WebDavConfig,
}

impl Deployer {
    pub fn new(config: WebDavConfig) -> Self {
        Self { config }
    }

    /// Uploads one file's content to its place inside the deployed
    /// cartridge, creating remote parent collections when the file is
    /// new on the server.
    ///
    /// Content is supplied by the caller rather than re-read from
    /// disk, so editors can push not-yet-saved buffers.
    pub async fn deploy_file(
        &self,
        path: &Path,
        content: Vec<u8>,
    ) -> Result<DeploymentResult, DeployError> {
        if !self.config.enabled {
            return Ok(DeploymentResult::skipped("Uploads are disabled in settings."));
        }

        let resource = CartridgeResource::classify(path);
        let Some(remote_path) = resource.remote_relative_path() else {
            debug!("'{}' is outside any cartridge", path.display());
            return Ok(DeploymentResult::skipped(
                "File is not in a cartridge, upload skipped.",
            ));
        };

        let connection = WebDavConnection::new(self.config.clone())?;
        info!("Uploading {}", remote_path);

        if !connection.exists(&remote_path).await? {
            self.create_directories(&connection, &remote_path).await?;
        }

        let response = connection.put(&remote_path, content).await?;
        if !response.success {
            return Ok(DeploymentResult::failed(
                remote_path.clone(),
                response.status,
                format!("Upload of '{}' failed", remote_path),
            ));
        }

        info!("Upload of '{}' successful", remote_path);
        Ok(DeploymentResult::deployed(
            remote_path.clone(),
            format!("Upload of {} successful", remote_path),
        ))
    }

    /// Packs the enclosing cartridge into a zip archive, uploads it,
    /// replaces any previously deployed copy and extracts it remotely.
    pub async fn deploy_cartridge(&self, path: &Path) -> Result<DeploymentResult, DeployError> {
        if !self.config.enabled {
            return Ok(DeploymentResult::skipped("Uploads are disabled in settings."));
        }

        let resource = CartridgeResource::classify(path);
        let (Some(base_path), Some(cartridge_name), Some(cartridge_dir)) = (
            resource.base_path.clone(),
            resource.cartridge_name.clone(),
            resource.cartridge_dir.clone(),
        ) else {
            return Ok(DeploymentResult::skipped(
                "File is not in a cartridge, upload skipped.",
            ));
        };

        let connection = WebDavConnection::new(self.config.clone())?;
        let remote_archive = format!("{}.zip", cartridge_name);
        let archive_path = match packager::pack(&cartridge_dir, &base_path) {
            Ok(path) => path,
            Err(e) => {
                return self.finish_archive_flow(
                    Err(e),
                    remote_archive,
                    format!("Upload of cartridge '{}' successful", cartridge_name),
                )
            }
        };
        info!("Starting upload of cartridge '{}' ...", cartridge_name);

        let outcome = self
            .replace_remote(&connection, &archive_path, &remote_archive, &[cartridge_name.clone()])
            .await;
        // The local archive is transient on every exit path.
        packager::cleanup(&archive_path);

        self.finish_archive_flow(
            outcome,
            remote_archive,
            format!("Upload of cartridge '{}' successful", cartridge_name),
        )
    }

    /// Deploys every cartridge found next to the triggering one as a
    /// single combined archive: one upload, one remote unzip.
    ///
    /// Pre-cleaning and extraction are all-or-nothing for the batch; a
    /// failure on any cartridge aborts the whole run.
    pub async fn deploy_all(&self, path: &Path) -> Result<DeploymentResult, DeployError> {
        if !self.config.enabled {
            return Ok(DeploymentResult::skipped("Uploads are disabled in settings."));
        }

        let resource = CartridgeResource::classify(path);
        let Some(scan_root) = resource.base_path.clone() else {
            return Ok(DeploymentResult::skipped(
                "File is not in a cartridge, upload skipped.",
            ));
        };

        let connection = WebDavConnection::new(self.config.clone())?;
        info!("Scanning directory {} for cartridges.", scan_root.display());

        let (archive_path, cartridge_names) = match packager::pack_all(&scan_root) {
            Ok(packed) => packed,
            Err(e) => {
                return self.finish_archive_flow(
                    Err(e),
                    BULK_ARCHIVE_NAME.to_string(),
                    "Upload of all cartridges successful".to_string(),
                )
            }
        };
        if cartridge_names.is_empty() {
            packager::cleanup(&archive_path);
            return Ok(DeploymentResult::skipped(format!(
                "No cartridges found under '{}', upload skipped.",
                scan_root.display()
            )));
        }
        info!("Starting upload of cartridges '{}' ...", cartridge_names.join(", "));

        let outcome = self
            .replace_remote_batch(&connection, &archive_path, &cartridge_names)
            .await;
        packager::cleanup(&archive_path);

        self.finish_archive_flow(
            outcome,
            BULK_ARCHIVE_NAME.to_string(),
            "Upload of all cartridges successful".to_string(),
        )
    }

    /// Single-cartridge replacement: upload the archive, drop the old
    /// deployed copy, extract, drop the remote archive.
    async fn replace_remote(
        &self,
        connection: &WebDavConnection,
        archive_path: &Path,
        remote_archive: &str,
        cartridge_names: &[String],
    ) -> Result<(), DeployError> {
        self.upload_archive(connection, archive_path, remote_archive).await?;
        for name in cartridge_names {
            self.delete_previous(connection, name).await?;
        }
        self.extract_and_discard(connection, remote_archive).await
    }

    /// Batch replacement pre-cleans every cartridge before the upload,
    /// so a half-deleted remote state never receives a partial tree.
    async fn replace_remote_batch(
        &self,
        connection: &WebDavConnection,
        archive_path: &Path,
        cartridge_names: &[String],
    ) -> Result<(), DeployError> {
        for name in cartridge_names {
            self.delete_previous(connection, name).await?;
        }
        self.upload_archive(connection, archive_path, BULK_ARCHIVE_NAME).await?;
        self.extract_and_discard(connection, BULK_ARCHIVE_NAME).await
    }

    async fn upload_archive(
        &self,
        connection: &WebDavConnection,
        archive_path: &Path,
        remote_archive: &str,
    ) -> Result<(), DeployError> {
        let bytes = fs::read(archive_path).map_err(|e| DeployError::LocalIo {
            path: archive_path.display().to_string(),
            source: e,
        })?;
        let response = connection.put(remote_archive, bytes).await?;
        step_result("PUT", remote_archive, response)?;
        info!("Upload of '{}' successful", archive_path.display());
        Ok(())
    }

    /// Deletes a previously deployed cartridge. A 404 means there was
    /// nothing to delete and counts as success.
    async fn delete_previous(
        &self,
        connection: &WebDavConnection,
        cartridge_name: &str,
    ) -> Result<(), DeployError> {
        let response = connection.delete(cartridge_name).await?;
        if response.is_not_found() {
            debug!("No previous copy of '{}' on server", cartridge_name);
            return Ok(());
        }
        step_result("DELETE", cartridge_name, response)
    }

    async fn extract_and_discard(
        &self,
        connection: &WebDavConnection,
        remote_archive: &str,
    ) -> Result<(), DeployError> {
        let response = connection.unzip(remote_archive).await?;
        step_result("UNZIP", remote_archive, response)?;
        info!("Unzipping of '{}' successful", remote_archive);

        let response = connection.delete(remote_archive).await?;
        step_result("DELETE", remote_archive, response)
    }

    /// Best-effort MKCOL for every ancestor of the target, shallowest
    /// first. MKCOL on an already-existing collection reports failure;
    /// that is expected and the flow proceeds.
    async fn create_directories(
        &self,
        connection: &WebDavConnection,
        remote_path: &str,
    ) -> Result<(), DeployError> {
        let segments: Vec<&str> = remote_path.split('/').collect();
        let mut collection = String::new();

        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !collection.is_empty() {
                collection.push('/');
            }
            collection.push_str(segment);

            let response = connection.mkdir(&collection).await?;
            if response.success {
                info!("Creation of directory '{}' successful", collection);
            } else {
                debug!("MKCOL '{}' not created (status {:?})", collection, response.status);
            }
        }
        Ok(())
    }

    /// Folds an archive-flow outcome into the caller-facing result:
    /// fatal errors propagate, transport errors become a failed result.
    fn finish_archive_flow(
        &self,
        outcome: Result<(), DeployError>,
        remote_path: String,
        success_message: String,
    ) -> Result<DeploymentResult, DeployError> {
        match outcome {
            Ok(()) => {
                info!("{}", success_message);
                Ok(DeploymentResult::deployed(remote_path, success_message))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                let status = e.status_code();
                Ok(DeploymentResult::failed(remote_path, status, e.to_string()))
            }
        }
    }

    /// Settings validation plus a reachability probe against the code
    /// version root, for the `check` command.
    pub async fn check(&self) -> Result<DeploymentResult, DeployError> {
        if !self.config.enabled {
            return Ok(DeploymentResult::skipped("Uploads are disabled in settings."));
        }

        let connection = WebDavConnection::new(self.config.clone())?;
        let response = connection.probe().await?;
        if response.success {
            Ok(DeploymentResult::deployed(
                String::new(),
                format!(
                    "Connection to '{}' (code version '{}') successful",
                    self.config.instance, self.config.code_version
                ),
            ))
        } else {
            Ok(DeploymentResult::failed(
                String::new(),
                response.status,
                format!("Could not reach code version root on '{}'", self.config.instance),
            ))
        }
    }
}

fn step_result(method: &str, remote_path: &str, response: WebDavResponse) -> Result<(), DeployError> {
    if response.success {
        return Ok(());
    }
    match response.status {
        Some(status) => Err(DeployError::Transport {
            method: method.to_string(),
            remote_path: remote_path.to_string(),
            status,
        }),
        None => Err(DeployError::Unreachable {
            details: format!("no response to {} '{}'", method, remote_path),
        }),
    }
}
