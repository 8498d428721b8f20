//! Per-(page, key) resolution: precedence, code dereferencing, validation
//!
//! Precedence, highest first: a single-value file for the key in scope, then
//! the nearest-ancestor bundle declaration, then absence. Code-valued
//! declarations are dereferenced to an existing file under the project root,
//! probing the fixed script-extension list.

use crate::index::{BundleFile, ValueFile};
use crate::registry::ConfigDefinition;
use pageconf_core::constants::SCRIPT_EXTENSIONS;
use pageconf_core::{json_type_name, ConfigSource, ConfigValue, Error, Result};
use pageconf_utils::paths;
use serde_json::Value;
use std::path::Path;
use tracing::warn;

/// Resolve one configuration key for one page. `bundles_relevant` must be
/// sorted deepest-first (see [`crate::filesystem::relevant_bundle_files`]).
/// Returns `Ok(None)` when no declaration in scope sets the key.
pub fn resolve_config_source(
    config_name: &str,
    definition: &ConfigDefinition,
    bundles_relevant: &[&BundleFile],
    root: &Path,
    value_files_relevant: &[&ValueFile],
) -> Result<Option<ConfigSource>> {
    // 1. A single-value file always outranks bundle declarations.
    let value_files: Vec<&&ValueFile> = value_files_relevant
        .iter()
        .filter(|vf| vf.config_name == config_name)
        .collect();
    if let Some(value_file) = value_files.first() {
        if value_files.len() > 1 {
            let conflicting: Vec<&str> = value_files.iter().map(|vf| vf.path.as_str()).collect();
            return Err(Error::invariant(format!(
                "multiple single-value files for config '{config_name}' in the same scope: {}",
                conflicting.join(", ")
            )));
        }
        let value = if definition.code {
            ConfigValue::Code(value_file.path.clone())
        } else {
            let inline = value_file.value.clone().ok_or_else(|| {
                Error::invariant(format!(
                    "single-value file '{}' for inline config '{config_name}' was never executed",
                    value_file.path
                ))
            })?;
            if let Some(validate) = definition.validator {
                validate(&inline, &value_file.path)?;
            }
            ConfigValue::Inline(inline)
        };
        return Ok(Some(ConfigSource {
            defined_by: value_file.path.clone(),
            env: definition.env,
            value,
        }));
    }

    // 2. Nearest-ancestor bundle declaration.
    let Some((bundle, raw)) = nearest_bundle_value(config_name, bundles_relevant)? else {
        return Ok(None);
    };
    if let Some(validate) = definition.validator {
        validate(raw, &bundle.path)?;
    }
    if definition.code {
        let Some(reference) = raw.as_str() else {
            return Err(Error::usage(
                &bundle.path,
                format!(
                    "sets the config '{config_name}' to a value with an invalid type `{}` but \
                     it should be a `string` instead",
                    json_type_name(raw)
                ),
            ));
        };
        let code_path = resolve_code_file(reference, &bundle.path, root, config_name)?;
        Ok(Some(ConfigSource {
            defined_by: code_path.clone(),
            env: definition.env,
            value: ConfigValue::Code(code_path),
        }))
    } else {
        Ok(Some(ConfigSource {
            defined_by: bundle.path.clone(),
            env: definition.env,
            value: ConfigValue::Inline(raw.clone()),
        }))
    }
}

/// The declaration of `config_name` from the nearest ancestor bundle. Two
/// ancestors at the same depth both declaring the key is a usage error.
fn nearest_bundle_value<'a>(
    config_name: &str,
    bundles_relevant: &[&'a BundleFile],
) -> Result<Option<(&'a BundleFile, &'a Value)>> {
    let mut defining = bundles_relevant
        .iter()
        .filter_map(|bundle| {
            bundle
                .config_values()
                .get(config_name)
                .map(|value| (*bundle, value))
        });
    let Some((nearest, value)) = defining.next() else {
        return Ok(None);
    };
    if let Some((contender, _)) = defining.next() {
        if paths::path_depth(&contender.fs_root) == paths::path_depth(&nearest.fs_root) {
            return Err(Error::usage_with_hint(
                &contender.path,
                format!("defines the config '{config_name}' which {} already defines at the same depth", nearest.path),
                "remove one of the two declarations",
            ));
        }
    }
    Ok(Some((nearest, value)))
}

/// Dereference a code-valued declaration to a project-root-relative path of
/// an existing file, probing the known script extensions.
fn resolve_code_file(
    reference: &str,
    declaring_file: &str,
    root: &Path,
    config_name: &str,
) -> Result<String> {
    let reference_posix = paths::to_posix(reference);
    let declaring_dir = paths::dirname_normalized(declaring_file);
    let joined = if reference_posix.starts_with('/') {
        paths::normalize_posix(&reference_posix)
    } else {
        paths::posix_join(&declaring_dir, &reference_posix)
    };

    if exists_under_root(root, &joined) {
        return Ok(joined);
    }
    for extension in SCRIPT_EXTENSIONS {
        let candidate = format!("{joined}.{extension}");
        if exists_under_root(root, &candidate) {
            warn!(
                "{declaring_file} sets the config '{config_name}' to '{reference}' but the \
                 matched file is '{candidate}': don't omit the file extension '.{extension}'"
            );
            return Ok(candidate);
        }
    }

    let hint = code_reference_hint(reference, &reference_posix, &declaring_dir);
    match hint {
        Some(hint) => Err(Error::usage_with_hint(
            declaring_file,
            format!(
                "sets the config '{config_name}' to '{reference}' but no file was found at \
                 '{joined}'"
            ),
            hint,
        )),
        None => Err(Error::usage(
            declaring_file,
            format!(
                "sets the config '{config_name}' to '{reference}' but no file was found at \
                 '{joined}'"
            ),
        )),
    }
}

fn exists_under_root(root: &Path, root_relative: &str) -> bool {
    root.join(root_relative.trim_start_matches('/')).is_file()
}

/// Best-effort corrective suggestion for an unresolvable code reference
fn code_reference_hint(
    reference: &str,
    reference_posix: &str,
    declaring_dir: &str,
) -> Option<String> {
    if !paths::is_posix(reference) {
        return Some(format!(
            "replace backslashes '\\' with forward slashes '/': '{reference_posix}'"
        ));
    }
    if reference_posix.starts_with('/') {
        return Some(format!(
            "use a relative path (starting with './' or '../') relative to {declaring_dir}"
        ));
    }
    if !reference_posix.starts_with("./") && !reference_posix.starts_with("../") {
        return Some(format!("prefix the path with './': './{reference_posix}'"));
    }
    None
}
