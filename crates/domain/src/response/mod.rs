//! HTTP responses and the read-only snapshot scripts inspect.

mod context;
mod spec;

pub use context::ResponseContext;
pub use spec::{ResponseSpec, StatusCode};
