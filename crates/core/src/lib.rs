//! Core domain types, errors, and constants for the `pageconf` engine.
//!
//! This crate establishes the foundational data structures and error handling
//! mechanisms used throughout the codebase.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing all possible failure modes. Author mistakes (usage errors)
//!   are kept distinct from engine defects (invariant errors) so callers can
//!   apply different reporting policies.
//! - **`types`**: Domain types for resolved configuration: `ConfigEnv`,
//!   `ConfigSource`, `PageConfigData`, and friends.
//! - **`constants`**: Filename conventions and other shared constants. The
//!   declaration-file markers must stay bit-exact for interop.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
