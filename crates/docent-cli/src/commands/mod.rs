//! CLI commands

pub mod beat;
pub mod simulate;
pub mod topics;
