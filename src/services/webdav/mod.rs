// WebDAV transport for cartridge deployment, split by concern.

pub mod config;
pub mod connection;

pub use config::{WebDavConfig, CARTRIDGES_WEBDAV_PREFIX};
pub use connection::{WebDavConnection, WebDavResponse};
