//! Single-pass application of declared configuration side-effects
//!
//! After primary resolution, keys whose definition carries a side-effect may
//! rewrite sibling sources: reclassify another key's environment or replace
//! its value. Triggers are read from the input map and rewrites land in a
//! fresh map, in one left-to-right pass over the registry order; a rewrite
//! never triggers another key's side-effect (documented limitation).

use crate::registry::Registry;
use pageconf_core::{ConfigEnv, ConfigSource, ConfigValue, Error, Result, SideEffectChange};
use std::collections::BTreeMap;

/// Apply every declared side-effect once, producing a new source map
pub fn apply_side_effects(
    sources: &BTreeMap<String, ConfigSource>,
    registry: &Registry,
) -> Result<BTreeMap<String, ConfigSource>> {
    let mut modified = sources.clone();

    for (config_name, definition) in registry {
        let Some(side_effect) = definition.side_effect else {
            continue;
        };
        // registry construction rejects this shape; reaching it here means a
        // caller assembled definitions by hand
        if definition.env != ConfigEnv::Config {
            return Err(Error::invariant(format!(
                "config '{config_name}' declares a side-effect but is classified \
                 '{}' instead of 'config'",
                definition.env
            )));
        }
        let Some(trigger) = sources.get(config_name) else {
            continue;
        };
        let Some(trigger_value) = trigger.inline_value() else {
            return Err(Error::invariant(format!(
                "side-effect config '{config_name}' resolved to a code reference"
            )));
        };

        let changes = side_effect(trigger_value, &trigger.defined_by)?;
        for change in changes {
            apply_change(&mut modified, registry, config_name, trigger, change)?;
        }
    }

    Ok(modified)
}

fn apply_change(
    modified: &mut BTreeMap<String, ConfigSource>,
    registry: &Registry,
    config_name: &str,
    trigger: &ConfigSource,
    change: SideEffectChange,
) -> Result<()> {
    match change {
        SideEffectChange::OverrideEnv { target, env } => {
            let Some(target_source) = modified.get_mut(&target) else {
                return Err(Error::usage(
                    &trigger.defined_by,
                    format!(
                        "the side-effect of config '{config_name}' reclassifies config \
                         '{target}' which is not set for this page"
                    ),
                ));
            };
            target_source.env = env;
        }
        SideEffectChange::OverrideValue { target, value } => {
            if !registry.contains_key(&target) {
                return Err(Error::usage(
                    &trigger.defined_by,
                    format!(
                        "the side-effect of config '{config_name}' rewrites unknown config \
                         '{target}'"
                    ),
                ));
            }
            let Some(target_source) = modified.get_mut(&target) else {
                return Err(Error::usage(
                    &trigger.defined_by,
                    format!(
                        "the side-effect of config '{config_name}' rewrites config '{target}' \
                         which is not set for this page"
                    ),
                ));
            };
            if !target_source.is_inline() {
                return Err(Error::usage(
                    &trigger.defined_by,
                    format!(
                        "the side-effect of config '{config_name}' rewrites config '{target}' \
                         whose value is a code reference, not an inline value"
                    ),
                ));
            }
            // keep the defining file and environment, replace only the value
            target_source.value = ConfigValue::Inline(value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{builtin_definitions, ConfigDefinition};
    use pageconf_core::Result;
    use serde_json::{json, Value};

    fn inline_source(defined_by: &str, env: ConfigEnv, value: Value) -> ConfigSource {
        ConfigSource {
            defined_by: defined_by.to_string(),
            env,
            value: ConfigValue::Inline(value),
        }
    }

    fn rewrite_bar(_value: &Value, _file: &str) -> Result<Vec<SideEffectChange>> {
        Ok(vec![SideEffectChange::OverrideValue {
            target: "bar".to_string(),
            value: json!("Y"),
        }])
    }

    // fires only once bar's value is "Y", i.e. only if rewrites re-triggered it
    fn rewrite_baz_when_y(value: &Value, _file: &str) -> Result<Vec<SideEffectChange>> {
        if value == &json!("Y") {
            Ok(vec![SideEffectChange::OverrideValue {
                target: "baz".to_string(),
                value: json!("Z"),
            }])
        } else {
            Ok(Vec::new())
        }
    }

    fn chained_registry() -> Registry {
        let mut registry = Registry::new();
        registry.insert(
            "foo".to_string(),
            ConfigDefinition::inline(ConfigEnv::Config).with_side_effect(rewrite_bar),
        );
        registry.insert(
            "bar".to_string(),
            ConfigDefinition::inline(ConfigEnv::Config).with_side_effect(rewrite_baz_when_y),
        );
        registry.insert("baz".to_string(), ConfigDefinition::inline(ConfigEnv::Config));
        registry
    }

    #[test]
    fn test_single_pass_does_not_chain() {
        let registry = chained_registry();
        let mut sources = BTreeMap::new();
        sources.insert(
            "foo".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!("X")),
        );
        sources.insert(
            "bar".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!("original-bar")),
        );
        sources.insert(
            "baz".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!("original-baz")),
        );

        let modified = apply_side_effects(&sources, &registry).expect("apply");
        // foo rewrote bar's value
        assert_eq!(modified["bar"].inline_value(), Some(&json!("Y")));
        // bar's side-effect saw its original value, never the rewritten "Y",
        // so baz is untouched: rewrites are not re-processed
        assert_eq!(modified["baz"].inline_value(), Some(&json!("original-baz")));
        // defining file and env of the target are untouched
        assert_eq!(modified["bar"].defined_by, "/pages/+config.js");
        assert_eq!(modified["bar"].env, ConfigEnv::Config);
    }

    #[test]
    fn test_trigger_without_source_is_skipped() {
        let registry = chained_registry();
        let mut sources = BTreeMap::new();
        sources.insert(
            "bar".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!("original-bar")),
        );
        sources.insert(
            "baz".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!("original-baz")),
        );
        let modified = apply_side_effects(&sources, &registry).expect("apply");
        // foo unset: its side-effect never fires
        assert_eq!(modified["bar"].inline_value(), Some(&json!("original-bar")));
    }

    #[test]
    fn test_override_env() {
        let registry = builtin_definitions();
        let mut sources = BTreeMap::new();
        sources.insert(
            "clientRouting".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!(true)),
        );
        sources.insert(
            "onBeforeRender".to_string(),
            ConfigSource {
                defined_by: "/pages/hooks.js".to_string(),
                env: ConfigEnv::ServerOnly,
                value: ConfigValue::Code("/pages/hooks.js".to_string()),
            },
        );
        let modified = apply_side_effects(&sources, &registry).expect("apply");
        assert_eq!(modified["onBeforeRender"].env, ConfigEnv::ServerAndClient);
        // the value shape is untouched
        assert_eq!(modified["onBeforeRender"].code_path(), Some("/pages/hooks.js"));
    }

    #[test]
    fn test_missing_target_is_usage_error() {
        let registry = chained_registry();
        let mut sources = BTreeMap::new();
        sources.insert(
            "foo".to_string(),
            inline_source("/pages/+config.js", ConfigEnv::Config, json!("X")),
        );
        let err = apply_side_effects(&sources, &registry).expect_err("missing target");
        assert!(err.is_usage());
        assert!(err.to_string().contains("'bar'"));
    }

    #[test]
    fn test_code_reference_trigger_is_invariant_error() {
        let mut registry = Registry::new();
        registry.insert(
            "foo".to_string(),
            ConfigDefinition::inline(ConfigEnv::Config).with_side_effect(rewrite_bar),
        );
        let mut sources = BTreeMap::new();
        sources.insert(
            "foo".to_string(),
            ConfigSource {
                defined_by: "/pages/+foo.js".to_string(),
                env: ConfigEnv::Config,
                value: ConfigValue::Code("/pages/+foo.js".to_string()),
            },
        );
        let err = apply_side_effects(&sources, &registry).expect_err("code trigger");
        assert!(matches!(err, Error::Invariant { .. }));
    }

    #[test]
    fn test_side_effect_requires_config_env() {
        let mut registry = Registry::new();
        registry.insert(
            "foo".to_string(),
            ConfigDefinition::inline(ConfigEnv::ServerOnly).with_side_effect(rewrite_bar),
        );
        let sources = BTreeMap::new();
        let err = apply_side_effects(&sources, &registry).expect_err("wrong env");
        assert!(matches!(err, Error::Invariant { .. }));
        assert!(err.to_string().contains("'server-only'"));
    }
}
