//! Deploys local cartridge source trees to a Salesforce B2C Commerce
//! ("Demandware") instance over its WebDAV interface.
//!
//! The core is the deployment engine: resolving a local path to its
//! remote upload path, the WebDAV request sequence for synchronizing a
//! cartridge or a whole set of cartridges, and the packaging strategy
//! (single-file PUT vs. zip-then-remote-unzip). Editor or host
//! integrations call [`services::Deployer`] and receive a
//! [`models::DeploymentResult`] per flow.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use errors::DeployError;
pub use models::DeploymentResult;
pub use services::{Deployer, WebDavConfig};
