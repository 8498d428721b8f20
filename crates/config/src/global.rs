//! Framework-singleton configuration resolved at the tree root
//!
//! A small set of keys may be declared at most once across the whole tree,
//! in the root-most bundle file. They are resolved once per pass,
//! independently of per-page resolution.

use crate::index::{BundleFile, ValueFile};
use crate::registry::{ConfigDefinition, Registry};
use crate::resolver::resolve_config_source;
use pageconf_core::{ConfigEnv, Error, GlobalConfigData, Result};
use pageconf_utils::paths;
use std::path::Path;

/// Definitions of the framework-singleton keys
#[must_use]
pub fn global_definitions() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        "onBeforeRoute".to_string(),
        ConfigDefinition::code(ConfigEnv::Routing),
    );
    registry.insert(
        "onPrerenderStart".to_string(),
        ConfigDefinition::code(ConfigEnv::ServerOnly),
    );
    registry
}

/// Whether a key is restricted to a single root-most declaration
#[must_use]
pub fn is_global(config_name: &str) -> bool {
    matches!(config_name, "onBeforeRoute" | "onPrerenderStart")
}

/// The bundle file whose directory is an ancestor of every other bundle
/// file's directory, if a unique one exists.
#[must_use]
pub fn find_root_most_bundle(bundles: &[BundleFile]) -> Option<&BundleFile> {
    let candidate = bundles
        .iter()
        .min_by_key(|bundle| paths::dirname(&bundle.path).len())?;
    let candidate_dir = paths::dirname(&candidate.path);
    let is_common_ancestor = bundles.iter().all(|bundle| {
        crate::filesystem::is_ancestor(&candidate_dir, &paths::dirname(&bundle.path))
    });
    if is_common_ancestor {
        Some(candidate)
    } else {
        None
    }
}

/// Resolve the singleton keys against the root-most bundle file, checking
/// that no other bundle declares them.
pub fn resolve_global_configs(
    bundles: &[BundleFile],
    value_files: &[ValueFile],
    root: &Path,
) -> Result<GlobalConfigData> {
    let root_most = find_root_most_bundle(bundles);

    for bundle in bundles {
        for config_name in bundle.config_values().keys().filter(|k| is_global(k)) {
            let is_root_most = root_most.is_some_and(|global| global.path == bundle.path);
            if !is_root_most {
                let hint = match root_most {
                    Some(global) => {
                        format!("define '{config_name}' in {} instead", global.path)
                    }
                    None => format!(
                        "create a root-level bundle file (e.g. /pages/+config.js) and define \
                         '{config_name}' there instead"
                    ),
                };
                return Err(Error::usage_with_hint(
                    &bundle.path,
                    format!("defines the config '{config_name}' which is global"),
                    hint,
                ));
            }
        }
    }

    let value_files_relevant: Vec<&ValueFile> = value_files
        .iter()
        .filter(|vf| is_global(&vf.config_name))
        .collect();
    let bundles_in_scope: Vec<&BundleFile> = root_most.into_iter().collect();

    let mut global = GlobalConfigData::default();
    for (config_name, definition) in global_definitions() {
        let source = resolve_config_source(
            &config_name,
            &definition,
            &bundles_in_scope,
            root,
            &value_files_relevant,
        )?;
        match config_name.as_str() {
            "onBeforeRoute" => global.on_before_route = source,
            "onPrerenderStart" => global.on_prerender_start = source,
            other => {
                return Err(Error::invariant(format!(
                    "unhandled global config '{other}'"
                )))
            }
        }
    }
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{config_fs_root, determine_page_id};
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn bundle(path: &str, exports: Value) -> BundleFile {
        BundleFile {
            path: path.to_string(),
            path_absolute: PathBuf::from(format!("/project{path}")),
            fs_root: config_fs_root(path),
            page_id: determine_page_id(path),
            exports: exports.as_object().expect("object exports").clone(),
        }
    }

    #[test]
    fn test_find_root_most_bundle() {
        let bundles = vec![
            bundle("/pages/+config.js", json!({})),
            bundle("/pages/about/+config.js", json!({})),
        ];
        let root_most = find_root_most_bundle(&bundles).expect("root-most");
        assert_eq!(root_most.path, "/pages/+config.js");
    }

    #[test]
    fn test_no_unique_root_most_among_siblings() {
        let bundles = vec![
            bundle("/pages/a/+config.js", json!({})),
            bundle("/pages/b/+config.js", json!({})),
        ];
        assert!(find_root_most_bundle(&bundles).is_none());
    }

    #[test]
    fn test_singleton_outside_root_most_is_usage_error() {
        let bundles = vec![
            bundle("/pages/+config.js", json!({})),
            bundle(
                "/pages/about/+config.js",
                json!({ "onBeforeRoute": "./hook.js" }),
            ),
        ];
        let err = resolve_global_configs(&bundles, &[], Path::new("/"))
            .expect_err("singleton outside root");
        assert!(err.is_usage());
        assert!(err.to_string().contains("/pages/+config.js"));
    }

    #[test]
    fn test_singleton_with_no_root_most_is_usage_error() {
        let bundles = vec![
            bundle("/pages/a/+config.js", json!({ "onBeforeRoute": "./hook.js" })),
            bundle("/pages/b/+config.js", json!({})),
        ];
        let err = resolve_global_configs(&bundles, &[], Path::new("/"))
            .expect_err("no unique root-most");
        assert!(err.is_usage());
        assert!(err.to_string().contains("create a root-level bundle file"));
    }

    #[test]
    fn test_no_declarations_resolve_to_none() {
        let bundles = vec![bundle("/pages/+config.js", json!({}))];
        let global = resolve_global_configs(&bundles, &[], Path::new("/")).expect("resolve");
        assert!(global.on_before_route.is_none());
        assert!(global.on_prerender_start.is_none());
    }
}
