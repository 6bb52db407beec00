//! Port implementations backed by third-party libraries.

mod reqwest_client;

pub use reqwest_client::ReqwestHttpClient;
