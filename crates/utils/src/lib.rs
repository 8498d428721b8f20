//! Shared utilities for the pageconf workspace.
//!
//! Currently this is posix path bookkeeping: every declaration file is
//! tracked by a root-relative, slash-separated path, and all ownership and
//! precedence decisions are string comparisons over those paths.

pub mod paths;
