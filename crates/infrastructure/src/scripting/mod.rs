//! Boa-backed script sandbox.
//!
//! Scripts run on a dedicated worker thread with a fresh interpreter per run.
//! Only the enumerated bindings in [`bindings`] are visible to user code;
//! `Date` and `Math` are replaced by host-controlled subsets.

mod bindings;
mod convert;
mod engine;
mod error;
mod session;

pub use engine::BoaScriptEngine;
pub use error::ScriptError;
