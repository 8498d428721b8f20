//! Configuration-key definitions: built-ins, per-directory overrides, merge
//!
//! Every resolvable key has a [`ConfigDefinition`]. The engine seeds the
//! registry with a fixed built-in table; each bundle file may extend or
//! override it through the reserved `configDefinitions` export. Overrides
//! are shallow field merges, descendant over ancestor, so a descendant can
//! replace a single attribute and inherit the rest. The registry does not
//! detect cyclic side-effect graphs; side-effect graphs are assumed shallow.

use crate::global;
use crate::index::BundleFile;
use pageconf_core::constants::CONFIG_DEFINITIONS_KEY;
use pageconf_core::{json_type_name, ConfigEnv, Error, Result, SideEffectChange};
use serde_json::Value;
use std::collections::BTreeMap;

/// Validates one inline configuration value. Arguments: the value and the
/// root-relative path of the file that declared it.
pub type Validator = fn(&Value, &str) -> Result<()>;

/// Computes rewrites of sibling configuration from one inline value.
/// Arguments: the value and the root-relative path of the declaring file.
pub type SideEffect = fn(&Value, &str) -> Result<Vec<SideEffectChange>>;

/// Definition of one configuration key
#[derive(Debug, Clone)]
pub struct ConfigDefinition {
    /// Environment classification of the resolved value
    pub env: ConfigEnv,
    /// Whether the value must reference loadable code
    pub code: bool,
    pub validator: Option<Validator>,
    pub side_effect: Option<SideEffect>,
}

impl ConfigDefinition {
    /// Plain inline definition without validator or side-effect
    #[must_use]
    pub fn inline(env: ConfigEnv) -> Self {
        Self {
            env,
            code: false,
            validator: None,
            side_effect: None,
        }
    }

    /// Definition whose value must reference loadable code
    #[must_use]
    pub fn code(env: ConfigEnv) -> Self {
        Self {
            env,
            code: true,
            validator: None,
            side_effect: None,
        }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn with_side_effect(mut self, side_effect: SideEffect) -> Self {
        self.side_effect = Some(side_effect);
        self
    }
}

/// Key name to definition. Ordered so resolution and side-effect passes are
/// deterministic across runs.
pub type Registry = BTreeMap<String, ConfigDefinition>;

/// The fixed built-in definition table
#[must_use]
pub fn builtin_definitions() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        "Page".to_string(),
        ConfigDefinition::code(ConfigEnv::ServerAndClient),
    );
    registry.insert(
        "route".to_string(),
        ConfigDefinition::inline(ConfigEnv::Routing).with_validator(validate_route),
    );
    registry.insert(
        "isErrorPage".to_string(),
        ConfigDefinition::inline(ConfigEnv::Config).with_validator(validate_is_error_page),
    );
    registry.insert(
        "passToClient".to_string(),
        ConfigDefinition::inline(ConfigEnv::ServerOnly).with_validator(validate_pass_to_client),
    );
    registry.insert(
        "clientRouting".to_string(),
        ConfigDefinition::inline(ConfigEnv::Config)
            .with_validator(validate_client_routing)
            .with_side_effect(client_routing_side_effect),
    );
    registry.insert(
        "prerender".to_string(),
        ConfigDefinition::inline(ConfigEnv::Config).with_validator(validate_prerender),
    );
    registry.insert(
        "onRenderHtml".to_string(),
        ConfigDefinition::code(ConfigEnv::ServerOnly),
    );
    registry.insert(
        "onRenderClient".to_string(),
        ConfigDefinition::code(ConfigEnv::ClientOnly),
    );
    registry.insert(
        "onBeforeRender".to_string(),
        ConfigDefinition::code(ConfigEnv::ServerOnly),
    );
    registry.insert(
        "onHydrationEnd".to_string(),
        ConfigDefinition::code(ConfigEnv::ClientOnly),
    );
    registry.insert(
        "onPageTransitionStart".to_string(),
        ConfigDefinition::code(ConfigEnv::ClientOnly),
    );
    registry.insert(
        "onPageTransitionEnd".to_string(),
        ConfigDefinition::code(ConfigEnv::ClientOnly),
    );
    registry
}

/// Build the registry for a set of bundle files. Bundles are applied
/// root-to-leaf so descendant overrides win.
pub fn build_registry(bundles: &[&BundleFile]) -> Result<Registry> {
    let mut registry = builtin_definitions();
    let mut ordered: Vec<&BundleFile> = bundles.to_vec();
    ordered.sort_by(|a, b| {
        pageconf_utils::paths::path_depth(&a.fs_root)
            .cmp(&pageconf_utils::paths::path_depth(&b.fs_root))
            .then_with(|| a.path.cmp(&b.path))
    });
    for bundle in ordered {
        let Some(definitions) = bundle.config_values().get(CONFIG_DEFINITIONS_KEY) else {
            continue;
        };
        let Some(definitions) = definitions.as_object() else {
            return Err(Error::usage(
                &bundle.path,
                format!(
                    "sets the config '{CONFIG_DEFINITIONS_KEY}' to a value with an invalid type \
                     `{}`: it should be an object instead",
                    json_type_name(definitions)
                ),
            ));
        };
        for (config_name, patch) in definitions {
            let merged = merge_config_definition(
                registry.get(config_name),
                config_name,
                patch,
                &bundle.path,
            )?;
            registry.insert(config_name.clone(), merged);
        }
    }
    Ok(registry)
}

/// Shallow merge of a user-supplied definition patch over an existing
/// definition. A patch for an unknown key must at least classify its
/// environment; validators and side-effects can only come from built-ins.
fn merge_config_definition(
    existing: Option<&ConfigDefinition>,
    config_name: &str,
    patch: &Value,
    bundle_path: &str,
) -> Result<ConfigDefinition> {
    let Some(patch) = patch.as_object() else {
        return Err(Error::usage(
            bundle_path,
            format!(
                "sets '{CONFIG_DEFINITIONS_KEY}.{config_name}' to a value with an invalid type \
                 `{}`: it should be an object instead",
                json_type_name(patch)
            ),
        ));
    };

    let mut env = existing.map(|def| def.env);
    let mut code = existing.map(|def| def.code);
    for (field, value) in patch {
        match field.as_str() {
            "env" => {
                let Some(spelling) = value.as_str() else {
                    return Err(Error::usage(
                        bundle_path,
                        format!(
                            "sets '{CONFIG_DEFINITIONS_KEY}.{config_name}.env' to a value with an \
                             invalid type `{}`: it should be a string instead",
                            json_type_name(value)
                        ),
                    ));
                };
                let Some(parsed) = ConfigEnv::parse(spelling) else {
                    return Err(Error::usage_with_hint(
                        bundle_path,
                        format!(
                            "sets '{CONFIG_DEFINITIONS_KEY}.{config_name}.env' to an invalid \
                             value '{spelling}'"
                        ),
                        "valid values are 'client-only', 'server-only', 'server-and-client', \
                         'routing', and 'config'",
                    ));
                };
                env = Some(parsed);
            }
            "code" => {
                let Some(flag) = value.as_bool() else {
                    return Err(Error::usage(
                        bundle_path,
                        format!(
                            "sets '{CONFIG_DEFINITIONS_KEY}.{config_name}.code' to a value with \
                             an invalid type `{}`: it should be a boolean instead",
                            json_type_name(value)
                        ),
                    ));
                };
                code = Some(flag);
            }
            unknown => {
                return Err(Error::usage(
                    bundle_path,
                    format!(
                        "sets '{CONFIG_DEFINITIONS_KEY}.{config_name}.{unknown}' which is not a \
                         known definition property"
                    ),
                ));
            }
        }
    }

    let Some(env) = env else {
        return Err(Error::usage(
            bundle_path,
            format!(
                "defines the new config '{config_name}' without an 'env' classification in \
                 '{CONFIG_DEFINITIONS_KEY}.{config_name}'"
            ),
        ));
    };
    let code = code.unwrap_or(false);
    let side_effect = existing.and_then(|def| def.side_effect);
    // keys carrying a side-effect must stay resolvable at config time
    if side_effect.is_some() {
        if env != ConfigEnv::Config {
            return Err(Error::usage(
                bundle_path,
                format!(
                    "reclassifies the config '{config_name}' as '{env}' but its side-effect \
                     requires the 'config' classification"
                ),
            ));
        }
        if code {
            return Err(Error::usage(
                bundle_path,
                format!(
                    "marks the config '{config_name}' as code-referencing but its side-effect \
                     requires an inline value"
                ),
            ));
        }
    }
    Ok(ConfigDefinition {
        env,
        code,
        validator: existing.and_then(|def| def.validator),
        side_effect,
    })
}

/// Look up a definition, falling back to the framework-singleton table.
/// Singleton keys are valid declarations even though they never resolve per
/// page.
#[must_use]
pub fn lookup_definition(registry: &Registry, config_name: &str) -> Option<ConfigDefinition> {
    registry
        .get(config_name)
        .cloned()
        .or_else(|| global::global_definitions().remove(config_name))
}

/// Whether a key name is a valid declaration for the given registry
#[must_use]
pub fn is_known_config(registry: &Registry, config_name: &str) -> bool {
    config_name == CONFIG_DEFINITIONS_KEY
        || registry.contains_key(config_name)
        || global::is_global(config_name)
}

fn expect_bool(config_name: &str, value: &Value, file: &str) -> Result<()> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err(Error::usage(
            file,
            format!(
                "sets the config '{config_name}' to a value with an invalid type \
                 `{}`: it should be a boolean instead",
                json_type_name(value)
            ),
        ))
    }
}

fn validate_route(value: &Value, file: &str) -> Result<()> {
    match value.as_str() {
        Some(route) if route.starts_with('/') => Ok(()),
        Some(route) => Err(Error::usage_with_hint(
            file,
            format!("sets the config 'route' to '{route}'"),
            "route strings must start with '/'",
        )),
        None => Err(Error::usage(
            file,
            format!(
                "sets the config 'route' to a value with an invalid type `{}`: it should be a \
                 string instead",
                json_type_name(value)
            ),
        )),
    }
}

fn validate_is_error_page(value: &Value, file: &str) -> Result<()> {
    expect_bool("isErrorPage", value, file)
}

fn validate_client_routing(value: &Value, file: &str) -> Result<()> {
    expect_bool("clientRouting", value, file)
}

fn validate_prerender(value: &Value, file: &str) -> Result<()> {
    expect_bool("prerender", value, file)
}

fn validate_pass_to_client(value: &Value, file: &str) -> Result<()> {
    let valid = value
        .as_array()
        .is_some_and(|entries| entries.iter().all(Value::is_string));
    if valid {
        Ok(())
    } else {
        Err(Error::usage(
            file,
            format!(
                "sets the config 'passToClient' to a value with an invalid type `{}`: it should \
                 be an array of strings instead",
                json_type_name(value)
            ),
        ))
    }
}

/// With client routing enabled, `onBeforeRender` runs on both sides so page
/// navigations can fetch data without a full reload.
fn client_routing_side_effect(value: &Value, _file: &str) -> Result<Vec<SideEffectChange>> {
    if value.as_bool() == Some(true) {
        Ok(vec![SideEffectChange::OverrideEnv {
            target: "onBeforeRender".to_string(),
            env: ConfigEnv::ServerAndClient,
        }])
    } else {
        Ok(Vec::new())
    }
}
