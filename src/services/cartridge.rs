use std::path::{Path, PathBuf};

/// A local filesystem path classified against the cartridge layout.
///
/// `base_path`, `cartridge_name` and `cartridge_dir` are populated iff
/// the path was determined to live inside a cartridge; classification
/// fails softly otherwise and deployment flows skip the resource.
#[derive(Debug, Clone)]
pub struct CartridgeResource {
    pub path: PathBuf,
    /// Directory containing `path`.
    pub base_dir: PathBuf,
    /// Directory whose children are cartridge directories. Every
    /// remote path is computed relative to this root.
    pub base_path: Option<PathBuf>,
    pub cartridge_name: Option<String>,
    pub cartridge_dir: Option<PathBuf>,
}

impl CartridgeResource {
    /// Classifies a path by walking its components, with no dependence
    /// on the host path separator.
    ///
    /// A path is cartridge-resident when it has a strict ancestor
    /// named `cartridge`, or when its containing directory has a
    /// direct `cartridge` subdirectory on disk.
    pub fn classify(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.clone());

        let mut resource = Self {
            path,
            base_dir,
            base_path: None,
            cartridge_name: None,
            cartridge_dir: None,
        };
        resource.locate_boundary();
        resource
    }

    fn locate_boundary(&mut self) {
        // Deepest strict ancestor literally named `cartridge`; its
        // parent is the cartridge directory.
        let segment = self
            .path
            .ancestors()
            .skip(1)
            .find(|anc| anc.file_name().is_some_and(|name| name == "cartridge"));

        let cartridge_dir = match segment {
            Some(segment) => segment.parent().map(Path::to_path_buf),
            None if self.base_dir.join("cartridge").is_dir() => Some(self.base_dir.clone()),
            None => None,
        };

        // Soft failure: a cartridge directory sitting at the
        // filesystem root has no name or parent to deploy under.
        if let Some(dir) = cartridge_dir {
            match (dir.parent(), dir.file_name()) {
                (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                    self.base_path = Some(parent.to_path_buf());
                    self.cartridge_name = Some(name.to_string_lossy().into_owned());
                    self.cartridge_dir = Some(dir);
                }
                _ => {}
            }
        }
    }

    pub fn is_in_cartridge(&self) -> bool {
        self.cartridge_dir.is_some()
    }

    /// Upload path relative to `base_path`, normalized to `/`
    /// separators for the URL-based remote protocol.
    pub fn remote_relative_path(&self) -> Option<String> {
        let base_path = self.base_path.as_deref()?;
        let relative = self.path.strip_prefix(base_path).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

/// True iff `path/cartridge` exists as a directory, making `path` a
/// deployable cartridge root.
pub fn is_cartridge_root(path: &Path) -> bool {
    path.join("cartridge").is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn classifies_file_under_cartridge_segment() {
        let resource =
            CartridgeResource::classify("/root/modules/app_core/cartridge/app_core/controllers/Home.js");

        assert!(resource.is_in_cartridge());
        assert_eq!(resource.base_path.as_deref(), Some(Path::new("/root/modules")));
        assert_eq!(resource.cartridge_name.as_deref(), Some("app_core"));
        assert_eq!(
            resource.cartridge_dir.as_deref(),
            Some(Path::new("/root/modules/app_core"))
        );
        assert_eq!(
            resource.remote_relative_path().as_deref(),
            Some("app_core/cartridge/app_core/controllers/Home.js")
        );
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        let resource =
            CartridgeResource::classify("/projects/site/storefront/cartridge/templates/default/home.isml");
        let remote = resource.remote_relative_path().unwrap();
        assert!(!remote.contains('\\'));
        assert_eq!(remote, "storefront/cartridge/templates/default/home.isml");
    }

    #[test]
    fn path_without_cartridge_is_unclassified() {
        let resource = CartridgeResource::classify("/home/user/notes/todo.txt");
        assert!(!resource.is_in_cartridge());
        assert!(resource.base_path.is_none());
        assert!(resource.cartridge_name.is_none());
        assert!(resource.remote_relative_path().is_none());
    }

    #[test]
    fn sibling_cartridge_directory_marks_membership() {
        let tmp = TempDir::new().unwrap();
        let cartridge_dir = tmp.path().join("app_storefront");
        fs::create_dir_all(cartridge_dir.join("cartridge")).unwrap();
        let file = cartridge_dir.join("package.json");
        fs::write(&file, b"{}").unwrap();

        let resource = CartridgeResource::classify(&file);
        assert!(resource.is_in_cartridge());
        assert_eq!(resource.cartridge_name.as_deref(), Some("app_storefront"));
        assert_eq!(resource.base_path.as_deref(), Some(tmp.path()));
        assert_eq!(resource.remote_relative_path().as_deref(), Some("app_storefront/package.json"));
    }

    #[test]
    fn deepest_cartridge_segment_wins() {
        // A cartridge checked out under a directory that itself is
        // named `cartridge` resolves against the inner boundary.
        let resource =
            CartridgeResource::classify("/src/cartridge/app_a/cartridge/scripts/util.js");
        assert_eq!(resource.cartridge_name.as_deref(), Some("app_a"));
        assert_eq!(resource.base_path.as_deref(), Some(Path::new("/src/cartridge")));
    }

    #[test]
    fn cartridge_root_detection() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("app_core");
        fs::create_dir_all(root.join("cartridge")).unwrap();
        let plain = tmp.path().join("docs");
        fs::create_dir_all(&plain).unwrap();

        assert!(is_cartridge_root(&root));
        assert!(!is_cartridge_root(&plain));
    }
}
