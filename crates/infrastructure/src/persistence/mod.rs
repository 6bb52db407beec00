//! File-backed storage.

mod collection_loader;

pub use collection_loader::{CollectionError, CollectionLoader};
