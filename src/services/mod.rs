// Deployment services organized by concern.

pub mod cartridge;
pub mod deployer;
pub mod packager;
pub mod webdav;

pub use cartridge::{is_cartridge_root, CartridgeResource};
pub use deployer::Deployer;
pub use webdav::{WebDavConfig, WebDavConnection, WebDavResponse};
