//! Declarative actions attached to operations.
//!
//! An action says what to do; [`crate::execute`] does it.

mod types;

pub use types::{Action, ExecOpts};
