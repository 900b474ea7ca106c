//! Taskdeps - task tracking with a dependency-graph integrity engine.
//!
//! This crate provides both a CLI application and a library. The library
//! side is organised around two collaborators and the engine that sits on
//! top of them:
//!
//! - [`store`]: the persistence collaborator ([`store::Repository`] per
//!   entity kind, with in-memory and JSONL-backed implementations)
//! - [`cache`]: the string-keyed TTL cache collaborator ([`cache::Cache`])
//! - [`validator`]: duplicate and cycle checks for dependency edges
//! - [`accessor`]: read-through/write-through cache discipline per entity kind
//! - [`engine`]: the controller-facing API composing all of the above
//!
//! The `taskdeps` binary drives a [`TaskGraph`] over JSONL files through
//! [`app::App`] and the [`cli`] module.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod accessor;
pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;
pub mod validator;

// Public CLI module (needed by binary)
pub mod app;
pub mod cli;
pub mod output;

// Command implementations
pub mod commands;

pub use engine::TaskGraph;
pub use error::{Error, Result};
