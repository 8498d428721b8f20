//! Constants used throughout the pageconf codebase

// Declaration filename conventions
pub const CONFIG_MARKER: &str = "+";
pub const BUNDLE_FILE_STEM: &str = "+config";

// Reserved key inside a bundle file's export holding per-key definition overrides
pub const CONFIG_DEFINITIONS_KEY: &str = "configDefinitions";

// Config keys that make a bundle file define a concrete page
pub const PAGE_CONFIG_NAME: &str = "Page";
pub const ROUTE_CONFIG_NAME: &str = "route";
pub const IS_ERROR_PAGE_CONFIG_NAME: &str = "isErrorPage";

// Extensions probed when dereferencing a code-valued config
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "mjs", "cjs"];

// Directories never scanned for declaration files
pub const IGNORED_DIRECTORIES: &[&str] = &["node_modules"];

// Grouping segment stripped before ownership comparisons
pub const RENDERER_SEGMENT: &str = "renderer";

// Segments that carry no meaning for filesystem routing
pub const ROUTE_IGNORED_SEGMENTS: &[&str] = &["pages", "index", "src", "renderer"];

// Environment variable controlling log filtering
pub const PAGECONF_LOG_VAR: &str = "PAGECONF_LOG";
