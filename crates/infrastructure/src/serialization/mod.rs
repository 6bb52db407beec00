//! JSON and YAML (de)serialization shared by the loader and the CLI reports.
//!
//! Maps are `IndexMap`s throughout, so output follows the order in which
//! variables, headers and tests were written.

mod json;

pub use json::*;
