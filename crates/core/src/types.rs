use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Environment classification of a configuration key: where its value is
/// needed at runtime, or whether it only matters at config-resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigEnv {
    #[serde(rename = "client-only")]
    ClientOnly,
    #[serde(rename = "server-only")]
    ServerOnly,
    #[serde(rename = "server-and-client")]
    ServerAndClient,
    #[serde(rename = "routing")]
    Routing,
    #[serde(rename = "config")]
    Config,
}

impl ConfigEnv {
    /// Parse the user-facing spelling used inside `configDefinitions`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client-only" => Some(Self::ClientOnly),
            "server-only" => Some(Self::ServerOnly),
            "server-and-client" => Some(Self::ServerAndClient),
            "routing" => Some(Self::Routing),
            "config" => Some(Self::Config),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientOnly => "client-only",
            Self::ServerOnly => "server-only",
            Self::ServerAndClient => "server-and-client",
            Self::Routing => "routing",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ConfigEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved shape of one configuration value: exactly one of an inline
/// literal or a project-root-relative reference to loadable code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ConfigValue {
    /// Inline literal carried by the declaring file
    Inline(Value),
    /// Project-root-relative posix path to loadable code
    Code(String),
}

/// The resolved unit for one configuration key on one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSource {
    /// Root-relative posix path of the file that supplied the value
    #[serde(rename = "definedBy")]
    pub defined_by: String,
    /// Environment classification, after any side-effect rewrites
    pub env: ConfigEnv,
    #[serde(flatten)]
    pub value: ConfigValue,
}

impl ConfigSource {
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.value, ConfigValue::Inline(_))
    }

    /// The inline value, if this source carries one
    #[must_use]
    pub fn inline_value(&self) -> Option<&Value> {
        match &self.value {
            ConfigValue::Inline(value) => Some(value),
            ConfigValue::Code(_) => None,
        }
    }

    /// The code-reference path, if this source carries one
    #[must_use]
    pub fn code_path(&self) -> Option<&str> {
        match &self.value {
            ConfigValue::Code(path) => Some(path),
            ConfigValue::Inline(_) => None,
        }
    }
}

/// Resolved configuration for one routable page
#[derive(Debug, Clone, Serialize)]
pub struct PageConfigData {
    /// Normalized, root-anchored path identifying the page
    #[serde(rename = "pageId")]
    pub page_id: String,
    #[serde(rename = "isErrorPage")]
    pub is_error_page: bool,
    /// Filesystem-derived route, or `None` for a generic error page
    #[serde(rename = "routeFilesystem")]
    pub route_filesystem: Option<String>,
    /// The file or directory that made this page exist
    #[serde(rename = "routeDefinedBy")]
    pub route_defined_by: String,
    /// Bundle files that contributed to this page, deepest first
    #[serde(rename = "bundleFilePaths")]
    pub bundle_file_paths: Vec<String>,
    /// Resolved source per configuration key
    pub sources: BTreeMap<String, ConfigSource>,
}

/// Resolved framework-singleton configuration, declared at most once at the
/// root of the tree
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalConfigData {
    #[serde(rename = "onBeforeRoute")]
    pub on_before_route: Option<ConfigSource>,
    #[serde(rename = "onPrerenderStart")]
    pub on_prerender_start: Option<ConfigSource>,
}

/// One rewrite produced by a configuration side-effect. Closed union: unknown
/// shapes cannot be represented, so they are rejected at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffectChange {
    /// Reclassify the environment of another key's resolved source
    OverrideEnv { target: String, env: ConfigEnv },
    /// Replace the value of another key's resolved source, keeping its
    /// shape, defining file, and environment
    OverrideValue { target: String, value: Value },
}

/// Human-readable name of a JSON value's type, for error messages
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_env_parse_roundtrip() {
        for env in [
            ConfigEnv::ClientOnly,
            ConfigEnv::ServerOnly,
            ConfigEnv::ServerAndClient,
            ConfigEnv::Routing,
            ConfigEnv::Config,
        ] {
            assert_eq!(ConfigEnv::parse(env.as_str()), Some(env));
        }
        assert_eq!(ConfigEnv::parse("server"), None);
    }

    #[test]
    fn test_config_source_shape_accessors() {
        let inline = ConfigSource {
            defined_by: "/pages/+config.js".to_string(),
            env: ConfigEnv::ServerOnly,
            value: ConfigValue::Inline(json!("About")),
        };
        assert!(inline.is_inline());
        assert_eq!(inline.inline_value(), Some(&json!("About")));
        assert_eq!(inline.code_path(), None);

        let code = ConfigSource {
            defined_by: "/pages/About.js".to_string(),
            env: ConfigEnv::ServerAndClient,
            value: ConfigValue::Code("/pages/About.js".to_string()),
        };
        assert!(!code.is_inline());
        assert_eq!(code.code_path(), Some("/pages/About.js"));
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(42)), "number");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
        assert_eq!(json_type_name(&json!(null)), "null");
    }
}
