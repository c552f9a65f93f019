//! # Curricula
//!
//! Library half of the `curricula` binary, exposed for integration tests.
//!
//! - [`cli`]: clap command tree and command implementations
//! - [`config`]: optional `curricula.toml`
//! - [`foraging`]: the bundled dynamic-foraging domain package

pub mod cli;
pub mod config;
pub mod foraging;
