//! Declaration-file discovery and loading
//!
//! Two kinds of declaration sources exist in the tree: bundle files
//! (`+config.<ext>`, one per directory, exporting several keys) and
//! single-value files (`+<keyName>.<ext>`, exporting exactly one value).
//! Discovery goes through the injected [`FileLister`]; execution goes
//! through the injected [`ModuleLoader`]. Loads are dispatched concurrently
//! and fully joined before any aggregation runs; the first failure aborts
//! the pass.

use crate::collaborators::{FileLister, ModuleExports, ModuleLoader, UserFile};
use crate::filesystem::{config_fs_root, determine_page_id, relevant_bundle_files};
use crate::registry;
use pageconf_core::constants::{BUNDLE_FILE_STEM, CONFIG_MARKER, SCRIPT_EXTENSIONS};
use pageconf_core::{
    json_type_name, Error, Result, IS_ERROR_PAGE_CONFIG_NAME, PAGE_CONFIG_NAME, ROUTE_CONFIG_NAME,
};
use pageconf_utils::paths;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// A loaded bundle file: one reserved `+config` file exporting several keys
#[derive(Debug, Clone)]
pub struct BundleFile {
    /// Root-relative posix path
    pub path: String,
    /// Absolute path on disk
    pub path_absolute: PathBuf,
    /// Directory this bundle governs, `renderer` segments stripped
    pub fs_root: String,
    /// Page identity of the bundle's own directory
    pub page_id: String,
    /// The default-export object: key name to raw value
    pub exports: Map<String, Value>,
}

impl BundleFile {
    /// The key/value declarations this bundle exports
    #[must_use]
    pub fn config_values(&self) -> &Map<String, Value> {
        &self.exports
    }

    /// Whether this bundle declares a concrete page (rather than only
    /// inherited values for descendants)
    #[must_use]
    pub fn defines_page(&self) -> bool {
        [PAGE_CONFIG_NAME, ROUTE_CONFIG_NAME, IS_ERROR_PAGE_CONFIG_NAME]
            .iter()
            .any(|key| self.exports.contains_key(*key))
    }
}

/// A loaded single-value file: its filename encodes the one key it sets
#[derive(Debug, Clone)]
pub struct ValueFile {
    /// Root-relative posix path
    pub path: String,
    /// Absolute path on disk
    pub path_absolute: PathBuf,
    /// Page identity of the file's directory
    pub page_id: String,
    /// Key name derived from the filename marker
    pub config_name: String,
    /// The inline default export, present when the key does not require
    /// loadable code (the file itself is the code reference otherwise)
    pub value: Option<Value>,
}

/// Derive the config key name a `+`-marked file sets
pub fn extract_config_name(file_path: &str) -> Result<String> {
    let basename = paths::basename(file_path);
    let stem = basename.split('.').next().unwrap_or(basename);
    let Some(config_name) = stem.strip_prefix(CONFIG_MARKER) else {
        return Err(Error::invariant(format!(
            "declaration file '{file_path}' lacks the '{CONFIG_MARKER}' marker"
        )));
    };
    Ok(config_name.to_string())
}

fn marker_glob(stem: &str) -> String {
    format!("**/{stem}.{{{}}}", SCRIPT_EXTENSIONS.join(","))
}

/// Find and load every bundle file under `root`
pub async fn find_bundle_files(
    lister: &dyn FileLister,
    loader: &Arc<dyn ModuleLoader>,
    root: &Path,
) -> Result<Vec<BundleFile>> {
    let found = lister.list(&marker_glob(BUNDLE_FILE_STEM), root)?;
    debug!("discovered {} bundle files", found.len());

    let loaded = load_all(loader, found).await?;

    let mut bundles = Vec::with_capacity(loaded.len());
    for (file, exports) in loaded {
        let Some(default) = exports.default else {
            return Err(Error::usage(
                &file.path_root_relative,
                "has no default export: a bundle file must default-export its config values",
            ));
        };
        let Some(values) = default.as_object() else {
            return Err(Error::usage(
                &file.path_root_relative,
                format!(
                    "default-exports a value with an invalid type `{}`: it should be an object \
                     instead",
                    json_type_name(&default)
                ),
            ));
        };
        bundles.push(BundleFile {
            fs_root: config_fs_root(&file.path_root_relative),
            page_id: determine_page_id(&file.path_root_relative),
            path: file.path_root_relative,
            path_absolute: file.path_absolute,
            exports: values.clone(),
        });
    }
    // discovery order is not guaranteed; keep the pass deterministic
    bundles.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(bundles)
}

/// Find every single-value file under `root`, executing the ones whose key
/// carries an inline value. Each file is classified against the registry of
/// its own page's scope, so sibling subtrees may disagree on a key's shape;
/// a key unknown in that scope is a usage error.
pub async fn find_value_files(
    lister: &dyn FileLister,
    loader: &Arc<dyn ModuleLoader>,
    root: &Path,
    bundles: &[BundleFile],
) -> Result<Vec<ValueFile>> {
    let found = lister.list(&marker_glob(&format!("{CONFIG_MARKER}*")), root)?;

    let mut inline_candidates = Vec::new();
    let mut value_files = Vec::new();
    for file in found {
        let config_name = extract_config_name(&file.path_root_relative)?;
        if config_name == "config" {
            continue;
        }
        let page_id = determine_page_id(&file.path_root_relative);
        let bundles_relevant = relevant_bundle_files(&page_id, bundles);
        let registry = registry::build_registry(&bundles_relevant)?;
        let Some(definition) = registry::lookup_definition(&registry, &config_name) else {
            return Err(Error::usage(
                &file.path_root_relative,
                format!("defines an unknown config '{config_name}'"),
            ));
        };
        if definition.code {
            // the file itself is the code reference; no execution needed
            value_files.push(ValueFile {
                page_id,
                path: file.path_root_relative,
                path_absolute: file.path_absolute,
                config_name,
                value: None,
            });
        } else {
            inline_candidates.push((file, page_id, config_name));
        }
    }
    debug!(
        "discovered {} single-value files ({} carrying inline values)",
        value_files.len() + inline_candidates.len(),
        inline_candidates.len()
    );

    let files: Vec<UserFile> = inline_candidates
        .iter()
        .map(|(f, _, _)| f.clone())
        .collect();
    let loaded = load_all(loader, files).await?;
    for ((_, page_id, config_name), (file, exports)) in inline_candidates.into_iter().zip(loaded) {
        let Some(value) = exports.default else {
            return Err(Error::usage(
                &file.path_root_relative,
                format!(
                    "has no default export: a '+{config_name}' file must default-export the \
                     value of '{config_name}'"
                ),
            ));
        };
        value_files.push(ValueFile {
            page_id,
            path: file.path_root_relative,
            path_absolute: file.path_absolute,
            config_name,
            value: Some(value),
        });
    }
    value_files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(value_files)
}

/// Execute every file concurrently and join them all before reporting the
/// first failure; no partial results escape.
async fn load_all(
    loader: &Arc<dyn ModuleLoader>,
    files: Vec<UserFile>,
) -> Result<Vec<(UserFile, ModuleExports)>> {
    let mut tasks: JoinSet<(usize, UserFile, Result<ModuleExports>)> = JoinSet::new();
    for (position, file) in files.into_iter().enumerate() {
        let loader = Arc::clone(loader);
        tasks.spawn(async move {
            let exports = loader.load(&file.path_absolute).await;
            (position, file, exports)
        });
    }

    let mut results: Vec<Option<(UserFile, Result<ModuleExports>)>> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (position, file, exports) =
            joined.map_err(|e| Error::invariant(format!("declaration load task panicked: {e}")))?;
        if results.len() <= position {
            results.resize_with(position + 1, || None);
        }
        results[position] = Some((file, exports));
    }

    let mut loaded = Vec::with_capacity(results.len());
    for entry in results {
        let (file, exports) = entry
            .ok_or_else(|| Error::invariant("a declaration load task produced no result"))?;
        loaded.push((file, exports?));
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_config_name() {
        assert_eq!(extract_config_name("/pages/+title.js").expect("name"), "title");
        assert_eq!(
            extract_config_name("/pages/about/+onBeforeRender.ts").expect("name"),
            "onBeforeRender"
        );
        assert_eq!(extract_config_name("/pages/+config.js").expect("name"), "config");
    }

    #[test]
    fn test_extract_config_name_requires_marker() {
        let err = extract_config_name("/pages/title.js").expect_err("missing marker");
        assert!(matches!(err, Error::Invariant { .. }));
    }

    #[test]
    fn test_marker_glob_covers_script_extensions() {
        let pattern = marker_glob(BUNDLE_FILE_STEM);
        assert!(pattern.starts_with("**/+config.{"));
        assert!(pattern.contains("js"));
        assert!(pattern.contains("tsx"));
    }
}
