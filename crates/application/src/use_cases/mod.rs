//! Application use cases (business logic orchestration).

mod run_collection;

pub use run_collection::*;
