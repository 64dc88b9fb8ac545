//! Mugs library.
//!
//! This crate provides the core of the mugs shell: extension discovery and
//! compilation, the artifact and metadata caches, the command registry, the
//! extension lifecycle operations, the store and verified-hash checks, and the
//! builtin commands.

pub mod aliases;
pub mod cache;
pub mod command;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod hash;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod messages;
pub mod registry;
pub mod report;
pub mod shell;
pub mod store;
pub mod verified;

#[cfg(test)]
mod testing;
