//! Scriptbox Application - Use cases and ports
//!
//! This crate defines the application layer with:
//! - The shared environment store and the test recorder scripts write to
//! - Port traits (interfaces for the script engine and HTTP client)
//! - Use case orchestration
//! - Application-level error handling

pub mod environment;
pub mod error;
pub mod execute_request;
pub mod ports;
pub mod recorder;
pub mod use_cases;

pub use environment::EnvironmentStore;
pub use error::{ApplicationError, ApplicationResult};
pub use execute_request::{ExecuteRequest, ExecuteRequestError, ExecuteResult, RequestOutcome};
pub use ports::{CancellationReceiver, CancellationToken, HttpClient, HttpClientError, ScriptEngine};
pub use recorder::{TestFailure, TestRecorder};
pub use use_cases::{RequestReport, RunCollection, RunCollectionInput, RunCollectionOutput};
