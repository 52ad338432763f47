//! CLI subcommand implementations.

pub mod dump;
pub mod inspect;
pub mod sample;
