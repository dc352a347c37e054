use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::cartridge::is_cartridge_root;
use crate::errors::DeployError;

/// Remote and local file name used for the combined all-cartridges archive.
pub const BULK_ARCHIVE_NAME: &str = "upload.zip";

/// Packs one cartridge directory into `<cartridge_dir>.zip`.
///
/// Entries are stored relative to `base_path` (the cartridge's parent,
/// for a normal layout), so the server-side UNZIP recreates the
/// cartridge under its own name at the code version root.
pub fn pack(cartridge_dir: &Path, base_path: &Path) -> Result<PathBuf, DeployError> {
    let mut name: OsString = cartridge_dir.as_os_str().to_owned();
    name.push(".zip");
    let archive_path = PathBuf::from(name);

    let built = new_writer(&archive_path).and_then(|mut writer| {
        append_tree(&mut writer, cartridge_dir, base_path, &archive_path)?;
        finish(writer, &archive_path)
    });
    if let Err(e) = built {
        // A partially written archive must not linger on disk.
        cleanup(&archive_path);
        return Err(e);
    }

    info!("Zipped cartridge '{}'", cartridge_dir.display());
    Ok(archive_path)
}

/// Packs every cartridge root directly under `scan_root` into a single
/// `upload.zip` inside the scan root, returning the archive path and
/// the cartridge names in filesystem enumeration order.
///
/// Enumeration order is whatever the filesystem yields; it only
/// affects progress messages, never archive correctness. The archive
/// cannot include itself because only cartridge subdirectories are
/// walked.
pub fn pack_all(scan_root: &Path) -> Result<(PathBuf, Vec<String>), DeployError> {
    let archive_path = scan_root.join(BULK_ARCHIVE_NAME);
    match pack_all_into(scan_root, &archive_path) {
        Ok(cartridge_names) => {
            info!("Zipped all cartridges under '{}'", scan_root.display());
            Ok((archive_path, cartridge_names))
        }
        Err(e) => {
            cleanup(&archive_path);
            Err(e)
        }
    }
}

fn pack_all_into(scan_root: &Path, archive_path: &Path) -> Result<Vec<String>, DeployError> {
    let mut writer = new_writer(archive_path)?;
    let mut cartridge_names = Vec::new();

    let entries = fs::read_dir(scan_root).map_err(|e| local_io(scan_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| local_io(scan_root, e))?;
        let dir = entry.path();
        if !dir.is_dir() || !is_cartridge_root(&dir) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        info!("Found cartridge {}", name);
        cartridge_names.push(name);
        append_tree(&mut writer, &dir, scan_root, archive_path)?;
    }

    finish(writer, archive_path)?;
    Ok(cartridge_names)
}

/// Removes a transient archive. Runs on every flow exit path and is
/// never fatal; a leftover archive only wastes disk.
pub fn cleanup(archive_path: &Path) {
    if let Err(e) = fs::remove_file(archive_path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove archive '{}': {}", archive_path.display(), e);
        }
    }
}

fn new_writer(archive_path: &Path) -> Result<ZipWriter<File>, DeployError> {
    let file = File::create(archive_path).map_err(|e| local_io(archive_path, e))?;
    Ok(ZipWriter::new(file))
}

fn finish(writer: ZipWriter<File>, archive_path: &Path) -> Result<(), DeployError> {
    writer.finish().map_err(|e| archive_err(archive_path, e))?;
    Ok(())
}

/// Walks `dir` and appends every regular file under its path relative
/// to `base_path`, normalized to `/` separators.
fn append_tree(
    writer: &mut ZipWriter<File>,
    dir: &Path,
    base_path: &Path,
    archive_path: &Path,
) -> Result<(), DeployError> {
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| local_io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let entry_name = match relative_entry_name(entry.path(), base_path) {
            Some(name) => name,
            None => continue,
        };

        writer
            .start_file(entry_name, options)
            .map_err(|e| archive_err(archive_path, e))?;
        let mut source = File::open(entry.path()).map_err(|e| local_io(entry.path(), e))?;
        io::copy(&mut source, writer).map_err(|e| local_io(entry.path(), e))?;
    }

    Ok(())
}

fn relative_entry_name(path: &Path, base_path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base_path).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(segments.join("/"))
}

fn local_io(path: &Path, source: io::Error) -> DeployError {
    DeployError::LocalIo {
        path: path.display().to_string(),
        source,
    }
}

fn archive_err(path: &Path, source: zip::result::ZipError) -> DeployError {
    DeployError::Archive {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn write_file(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn entry_names(archive_path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(archive_path).unwrap()).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn pack_stores_entries_relative_to_base() {
        let tmp = TempDir::new().unwrap();
        let cartridge_dir = tmp.path().join("app_core");
        write_file(
            &cartridge_dir.join("cartridge/controllers/Home.js"),
            "exports.Show = function () {};",
        );
        write_file(&cartridge_dir.join("cartridge/templates/home.isml"), "<html/>");

        let archive_path = pack(&cartridge_dir, tmp.path()).unwrap();
        assert_eq!(archive_path, tmp.path().join("app_core.zip"));

        let mut names = entry_names(&archive_path);
        names.sort();
        assert_eq!(
            names,
            vec![
                "app_core/cartridge/controllers/Home.js",
                "app_core/cartridge/templates/home.isml",
            ]
        );

        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("app_core/cartridge/controllers/Home.js")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "exports.Show = function () {};");
    }

    #[test]
    fn pack_all_filters_non_cartridge_directories() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("app_a/cartridge/scripts/a.js"), "a");
        write_file(&tmp.path().join("app_b/cartridge/scripts/b.js"), "b");
        write_file(&tmp.path().join("docs/readme.md"), "not a cartridge");

        let (archive_path, mut names) = pack_all(tmp.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["app_a", "app_b"]);

        let entries = entry_names(&archive_path);
        assert!(entries.contains(&"app_a/cartridge/scripts/a.js".to_string()));
        assert!(entries.contains(&"app_b/cartridge/scripts/b.js".to_string()));
        assert!(entries.iter().all(|name| !name.starts_with("docs/")));
        assert!(entries.iter().all(|name| !name.ends_with(BULK_ARCHIVE_NAME)));
    }

    #[test]
    fn cleanup_removes_archive_and_tolerates_absence() {
        let tmp = TempDir::new().unwrap();
        let archive_path = tmp.path().join("app_core.zip");
        fs::write(&archive_path, b"zip bytes").unwrap();

        cleanup(&archive_path);
        assert!(!archive_path.exists());

        // Second removal of an already-gone file must not panic.
        cleanup(&archive_path);
    }
}
