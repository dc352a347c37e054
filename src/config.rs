use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::services::webdav::WebDavConfig;

/// Default settings file name, looked up in the working directory.
pub const SETTINGS_FILE: &str = "cartup.json";

/// Loads deployment settings, preferring the JSON settings file and
/// falling back to `CARTUP_*` environment variables.
///
/// Settings are loaded fresh per invocation so edits take effect on
/// the next run; callers pass the resulting config into each flow.
pub fn load(settings_path: Option<&Path>) -> Result<WebDavConfig> {
    match settings_path {
        Some(path) => from_file(path),
        None if Path::new(SETTINGS_FILE).exists() => from_file(Path::new(SETTINGS_FILE)),
        None => from_env(),
    }
}

/// Reads a JSON settings file of the shape
/// `{"instance": "...", "username": "...", "password": "...",
///   "code_version": "...", "enabled": true}`.
pub fn from_file(path: &Path) -> Result<WebDavConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read settings file '{}'", path.display()))?;
    let config: WebDavConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    Ok(config)
}

/// Builds settings from `CARTUP_INSTANCE`, `CARTUP_USERNAME`,
/// `CARTUP_PASSWORD`, `CARTUP_CODE_VERSION` and `CARTUP_ENABLED`,
/// honoring a `.env` file when present.
pub fn from_env() -> Result<WebDavConfig> {
    dotenvy::dotenv().ok();

    Ok(WebDavConfig {
        instance: env::var("CARTUP_INSTANCE").unwrap_or_default(),
        username: env::var("CARTUP_USERNAME").unwrap_or_default(),
        password: env::var("CARTUP_PASSWORD").unwrap_or_default(),
        code_version: env::var("CARTUP_CODE_VERSION").unwrap_or_default(),
        enabled: env::var("CARTUP_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn settings_file_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cartup.json");
        fs::write(
            &path,
            r#"{
                "instance": "dev01-sandbox.demandware.net",
                "username": "admin",
                "password": "secret",
                "code_version": "version1"
            }"#,
        )
        .unwrap();

        let config = from_file(&path).unwrap();
        assert_eq!(config.instance, "dev01-sandbox.demandware.net");
        assert_eq!(config.code_version, "version1");
        // `enabled` defaults to true when omitted.
        assert!(config.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn disabled_flag_parses_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cartup.json");
        fs::write(
            &path,
            r#"{"instance": "i", "username": "u", "password": "p", "code_version": "v", "enabled": false}"#,
        )
        .unwrap();

        let config = from_file(&path).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn missing_settings_file_reports_path() {
        let err = from_file(Path::new("/nonexistent/cartup.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cartup.json"));
    }
}
