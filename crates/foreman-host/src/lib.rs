//! Implementations of the execution-host boundary: an HTTP client against
//! the real substrate and a scripted mock for deterministic tests.

pub mod http;
pub mod mock;

pub use http::HttpHost;
pub use mock::{MockDelivery, MockHost};
