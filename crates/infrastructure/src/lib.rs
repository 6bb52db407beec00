//! Scriptbox Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer: the Boa script sandbox, the reqwest
//! HTTP client and the collection file loader.

pub mod adapters;
pub mod persistence;
pub mod scripting;
pub mod serialization;

pub use adapters::ReqwestHttpClient;
pub use persistence::{CollectionError, CollectionLoader};
pub use scripting::{BoaScriptEngine, ScriptError};
pub use serialization::{SerializationError, from_json, from_yaml, to_json_stable};
