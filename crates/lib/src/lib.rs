//! sysprov-lib: declarative provisioning engine for freshly installed systems.
//!
//! The crate is organised leaf-first:
//! - `outcome`: attempt history and final status per operation
//! - `retry`: failure policies and the retry/skip/abort decision
//! - `facts`: the immutable host snapshot gathered at session start
//! - `action` / `registry`: declarative operations and their ordering
//! - `execute`: sequential execution of a registry
//! - `session`: the top-level orchestrator

pub mod action;
pub mod consts;
pub mod error;
pub mod execute;
pub mod facts;
pub mod outcome;
pub mod platform;
pub mod profile;
pub mod registry;
pub mod retry;
pub mod session;
pub mod util;

pub use error::ProvisionError;
