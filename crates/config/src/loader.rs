//! Resolution-pass orchestration
//!
//! One [`ConfigLoader::load`] call runs a complete pass: discover and load
//! every declaration file (concurrently, with a full join barrier), resolve
//! the framework singletons, then resolve every page. The result is
//! immutable; re-running against unchanged files yields an identical
//! [`Resolution`], so a dev-server can safely re-run the pass on every file
//! change.

use crate::collaborators::{FileLister, GlobFileLister, JsonModuleLoader, ModuleLoader};
use crate::filesystem::{
    determine_page_id, determine_route_from_filesystem, relevant_bundle_files,
};
use crate::global::resolve_global_configs;
use crate::index::{self, BundleFile, ValueFile};
use crate::registry;
use crate::resolver::resolve_config_source;
use crate::side_effects::apply_side_effects;
use pageconf_core::{
    ConfigSource, Error, GlobalConfigData, PageConfigData, Result, IS_ERROR_PAGE_CONFIG_NAME,
};
use pageconf_utils::paths;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The two read-only structures a resolution pass produces
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    #[serde(rename = "pageConfigs")]
    pub page_configs: Vec<PageConfigData>,
    pub global: GlobalConfigData,
}

/// Builder running one full resolution pass
pub struct ConfigLoader {
    /// Optional project root (defaults to the current directory)
    root: Option<PathBuf>,
    lister: Box<dyn FileLister>,
    module_loader: Arc<dyn ModuleLoader>,
}

impl ConfigLoader {
    /// Create a loader with the default on-disk collaborators
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            lister: Box::new(GlobFileLister::new()),
            module_loader: Arc::new(JsonModuleLoader::new()),
        }
    }

    /// Set the project root to resolve against
    #[must_use]
    pub fn root(mut self, root: PathBuf) -> Self {
        self.root = Some(root);
        self
    }

    /// Inject a file-discovery collaborator
    #[must_use]
    pub fn lister(mut self, lister: Box<dyn FileLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Inject a declaration-file execution collaborator
    #[must_use]
    pub fn module_loader(mut self, module_loader: Arc<dyn ModuleLoader>) -> Self {
        self.module_loader = module_loader;
        self
    }

    /// Run the resolution pass
    pub async fn load(self) -> Result<Resolution> {
        let root = self
            .root
            .or_else(|| std::env::current_dir().ok())
            .ok_or_else(|| Error::configuration("failed to determine the project root"))?;

        let bundles =
            index::find_bundle_files(self.lister.as_ref(), &self.module_loader, &root).await?;
        let value_files =
            index::find_value_files(self.lister.as_ref(), &self.module_loader, &root, &bundles)
                .await?;
        info!(
            "loaded {} bundle files and {} single-value files",
            bundles.len(),
            value_files.len()
        );

        let global = resolve_global_configs(&bundles, &value_files, &root)?;

        let mut page_configs = Vec::new();
        for page in collect_pages(&bundles, &value_files)? {
            page_configs.push(resolve_page(&page, &bundles, &value_files, &root)?);
        }
        info!("resolved {} pages", page_configs.len());

        Ok(Resolution {
            page_configs,
            global,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Quick helper to run a pass against a directory with default collaborators
pub async fn load_config_from(root: PathBuf) -> Result<Resolution> {
    ConfigLoader::new().root(root).load().await
}

/// One routable page discovered during the pass
#[derive(Debug)]
struct PageEntry {
    page_id: String,
    route_filesystem: String,
    route_defined_by: String,
}

/// Every page in the tree: bundle files that declare a concrete page, plus
/// the page identity of every single-value file.
fn collect_pages(bundles: &[BundleFile], value_files: &[ValueFile]) -> Result<Vec<PageEntry>> {
    let mut pages: Vec<PageEntry> = Vec::new();

    for bundle in bundles.iter().filter(|b| b.defines_page()) {
        pages.push(PageEntry {
            page_id: determine_page_id(&bundle.path),
            route_filesystem: determine_route_from_filesystem(&bundle.path),
            route_defined_by: bundle.path.clone(),
        });
    }

    for value_file in value_files {
        let page_id = determine_page_id(&value_file.path);
        let route_filesystem = determine_route_from_filesystem(&value_file.path);
        if let Some(existing) = pages.iter().find(|p| p.page_id == page_id) {
            if existing.route_filesystem != route_filesystem {
                return Err(Error::invariant(format!(
                    "page '{page_id}' derives route '{}' from {} but '{route_filesystem}' from \
                     {}",
                    existing.route_filesystem, existing.route_defined_by, value_file.path
                )));
            }
            continue;
        }
        pages.push(PageEntry {
            page_id,
            route_filesystem,
            route_defined_by: paths::dirname_normalized(&value_file.path),
        });
    }

    pages.sort_by(|a, b| a.page_id.cmp(&b.page_id));
    Ok(pages)
}

fn resolve_page(
    page: &PageEntry,
    bundles: &[BundleFile],
    value_files: &[ValueFile],
    root: &Path,
) -> Result<PageConfigData> {
    let bundles_relevant = relevant_bundle_files(&page.page_id, bundles);
    let value_files_relevant: Vec<&ValueFile> = value_files
        .iter()
        .filter(|vf| vf.page_id == page.page_id)
        .collect();
    let registry = registry::build_registry(&bundles_relevant)?;
    debug!(
        "resolving page '{}' against {} bundle files and {} single-value files",
        page.page_id,
        bundles_relevant.len(),
        value_files_relevant.len()
    );

    // every bundle in scope may only declare keys the scope's registry knows
    for bundle in &bundles_relevant {
        for config_name in bundle.config_values().keys() {
            if !registry::is_known_config(&registry, config_name) {
                return Err(Error::usage(
                    &bundle.path,
                    format!("defines an unknown config '{config_name}'"),
                ));
            }
        }
    }

    let mut sources: BTreeMap<String, ConfigSource> = BTreeMap::new();
    for (config_name, definition) in &registry {
        let resolved = resolve_config_source(
            config_name,
            definition,
            &bundles_relevant,
            root,
            &value_files_relevant,
        )?;
        if let Some(source) = resolved {
            sources.insert(config_name.clone(), source);
        }
    }

    let sources = apply_side_effects(&sources, &registry)?;

    let is_error_page = sources
        .get(IS_ERROR_PAGE_CONFIG_NAME)
        .and_then(ConfigSource::inline_value)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    Ok(PageConfigData {
        page_id: page.page_id.clone(),
        is_error_page,
        route_filesystem: if is_error_page {
            None
        } else {
            Some(page.route_filesystem.clone())
        },
        route_defined_by: page.route_defined_by.clone(),
        bundle_file_paths: bundles_relevant.iter().map(|b| b.path.clone()).collect(),
        sources,
    })
}
