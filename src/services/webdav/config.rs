use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Fixed WebDAV location for cartridge code on a B2C Commerce instance.
pub const CARTRIDGES_WEBDAV_PREFIX: &str = "on/demandware.servlet/webdav/Sites/Cartridges";

fn default_enabled() -> bool {
    true
}

/// Connection parameters for one target instance.
///
/// Loaded fresh at the start of each deployment flow so settings edits
/// take effect on the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDavConfig {
    /// Instance hostname, e.g. `dev01-mysandbox.demandware.net`. May
    /// carry an explicit `http://`/`https://` scheme to override the
    /// default `https://{instance}:443` endpoint.
    pub instance: String,
    pub username: String,
    pub password: String,
    /// Code version label the cartridges are deployed under.
    pub code_version: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl WebDavConfig {
    /// Validates that every field a remote operation needs is present,
    /// naming the first missing one.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.instance.is_empty() {
            return Err(DeployError::MissingSetting { field: "instance" });
        }
        if self.username.is_empty() {
            return Err(DeployError::MissingSetting { field: "username" });
        }
        if self.password.is_empty() {
            return Err(DeployError::MissingSetting { field: "password" });
        }
        if self.code_version.is_empty() {
            return Err(DeployError::MissingSetting { field: "version" });
        }
        Ok(())
    }

    /// Base endpoint URL for the instance.
    pub fn base_url(&self) -> String {
        if self.instance.contains("://") {
            self.instance.trim_end_matches('/').to_string()
        } else {
            format!("https://{}:443", self.instance)
        }
    }

    /// Full URL for a path relative to the code version root.
    pub fn url_for(&self, remote_path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url(),
            CARTRIDGES_WEBDAV_PREFIX,
            self.code_version,
            remote_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebDavConfig {
        WebDavConfig {
            instance: "dev01-sandbox.demandware.net".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            code_version: "version1".to_string(),
            enabled: true,
        }
    }

    #[test]
    fn url_carries_prefix_version_and_path() {
        let url = config().url_for("app_core/cartridge/app_core/controllers/Home.js");
        assert_eq!(
            url,
            "https://dev01-sandbox.demandware.net:443/on/demandware.servlet/webdav/Sites/Cartridges/version1/app_core/cartridge/app_core/controllers/Home.js"
        );
    }

    #[test]
    fn explicit_scheme_overrides_default_endpoint() {
        let mut cfg = config();
        cfg.instance = "http://127.0.0.1:8080".to_string();
        assert_eq!(
            cfg.url_for("app_core.zip"),
            "http://127.0.0.1:8080/on/demandware.servlet/webdav/Sites/Cartridges/version1/app_core.zip"
        );
    }

    #[test]
    fn validate_names_first_missing_field() {
        let mut cfg = config();
        cfg.password = String::new();
        match cfg.validate() {
            Err(DeployError::MissingSetting { field }) => assert_eq!(field, "password"),
            other => panic!("expected missing password, got {:?}", other),
        }
    }

    #[test]
    fn validate_accepts_complete_settings() {
        assert!(config().validate().is_ok());
    }
}
