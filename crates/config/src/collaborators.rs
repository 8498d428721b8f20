//! Injected collaborators: file discovery and declaration-file execution
//!
//! The resolution engine never touches a module system or a globbing library
//! directly. Both concerns enter through the traits below, so the engine can
//! be driven by a real bundler integration in production and by fixtures in
//! tests.

use async_trait::async_trait;
use globset::GlobBuilder;
use pageconf_core::constants::IGNORED_DIRECTORIES;
use pageconf_core::{Error, Result};
use pageconf_utils::paths;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A discovered user file
#[derive(Debug, Clone)]
pub struct UserFile {
    /// Absolute path on disk
    pub path_absolute: PathBuf,
    /// Posix path relative to the project root, with a leading slash
    pub path_root_relative: String,
}

/// Trait for listing user files matching a glob pattern.
///
/// Glob matching is case-insensitive. Dependency-vendor directories are
/// excluded. The returned list is flat and its order is not guaranteed.
pub trait FileLister: Send + Sync {
    fn list(&self, pattern: &str, root: &Path) -> Result<Vec<UserFile>>;
}

/// Exported values captured from one executed declaration file
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    /// The file's default export, if any
    pub default: Option<serde_json::Value>,
}

/// Trait for executing a declaration file and capturing its exports.
///
/// Any error returned here aborts the whole resolution pass; the engine
/// never retries a load.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<ModuleExports>;
}

/// Production lister that walks the project tree on disk
#[derive(Debug, Clone, Default)]
pub struct GlobFileLister;

impl GlobFileLister {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileLister for GlobFileLister {
    fn list(&self, pattern: &str, root: &Path) -> Result<Vec<UserFile>> {
        let matcher = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::configuration(format!("invalid glob pattern '{pattern}': {e}")))?
            .compile_matcher();

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
        {
            let entry = entry.map_err(|e| {
                Error::configuration(format!("failed to walk '{}': {e}", root.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).map_err(|_| {
                Error::invariant(format!(
                    "walked entry '{}' escapes the project root",
                    entry.path().display()
                ))
            })?;
            let relative_posix = paths::to_posix(&relative.to_string_lossy());
            if matcher.is_match(&relative_posix) {
                files.push(UserFile {
                    path_absolute: entry.path().to_path_buf(),
                    path_root_relative: format!("/{relative_posix}"),
                });
            }
        }
        Ok(files)
    }
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRECTORIES.contains(&name))
}

/// Declaration-file loader that parses file contents as JSON and treats the
/// parsed document as the file's default export.
///
/// This is the stand-in used by the CLI and the test suite. Integrations
/// that embed a real module system (transpiler, bundler) supply their own
/// [`ModuleLoader`]; the engine only ever sees exported values.
#[derive(Debug, Clone, Default)]
pub struct JsonModuleLoader;

impl JsonModuleLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModuleLoader for JsonModuleLoader {
    async fn load(&self, path: &Path) -> Result<ModuleExports> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::file_system(path, "read", e))?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| Error::module_load_with_source(path, "invalid JSON", e))?;
        Ok(ModuleExports {
            default: Some(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write file");
    }

    #[test]
    fn test_lister_matches_and_excludes_vendor_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "pages/+config.js", "{}");
        write(dir.path(), "pages/about/+config.js", "{}");
        write(dir.path(), "node_modules/dep/+config.js", "{}");
        write(dir.path(), "pages/readme.md", "");

        let mut found = GlobFileLister::new()
            .list("**/+config.*", dir.path())
            .expect("list");
        found.sort_by(|a, b| a.path_root_relative.cmp(&b.path_root_relative));
        let relative: Vec<&str> = found.iter().map(|f| f.path_root_relative.as_str()).collect();
        assert_eq!(relative, ["/pages/+config.js", "/pages/about/+config.js"]);
    }

    #[test]
    fn test_lister_is_case_insensitive() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "pages/+Config.JS", "{}");
        let found = GlobFileLister::new()
            .list("**/+config.js", dir.path())
            .expect("list");
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_json_loader_reads_default_export() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "pages/+config.js", r#"{ "title": "Home" }"#);
        let exports = JsonModuleLoader::new()
            .load(&dir.path().join("pages/+config.js"))
            .await
            .expect("load");
        assert_eq!(
            exports.default.expect("default")["title"],
            serde_json::json!("Home")
        );
    }

    #[tokio::test]
    async fn test_json_loader_rejects_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "pages/+config.js", "export default {}");
        let err = JsonModuleLoader::new()
            .load(&dir.path().join("pages/+config.js"))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("invalid JSON"));
    }
}
