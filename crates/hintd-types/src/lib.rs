//! Foundation types for hintd.
//!
//! Shared by every hintd crate: the error enum, the station configuration
//! loaded from TOML, the traits at the boundary to the external playback and
//! caption engines, and the cooperative shutdown signal.

pub mod backend;
pub mod config;
pub mod error;
pub mod shutdown;
