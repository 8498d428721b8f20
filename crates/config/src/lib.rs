//! Page-configuration resolution engine.
//!
//! Given the declaration files discovered in a project's directory tree,
//! this crate determines which directory owns which page, which file
//! supplies each configuration key for each page, how code-valued
//! declarations dereference to importable paths, and how declared
//! side-effects rewrite sibling configuration. File discovery and
//! declaration-file execution are injected collaborators
//! ([`collaborators::FileLister`] and [`collaborators::ModuleLoader`]); the
//! engine itself is pure over the loaded indices.
//!
//! Entry point: [`loader::ConfigLoader`], which runs one full resolution
//! pass and returns an immutable [`loader::Resolution`].

pub mod collaborators;
pub mod filesystem;
pub mod global;
pub mod index;
pub mod loader;
pub mod registry;
pub mod resolver;
pub mod side_effects;

pub use collaborators::{
    FileLister, GlobFileLister, JsonModuleLoader, ModuleExports, ModuleLoader, UserFile,
};
pub use index::{BundleFile, ValueFile};
pub use loader::{ConfigLoader, Resolution};
pub use registry::{ConfigDefinition, Registry, SideEffect, Validator};
