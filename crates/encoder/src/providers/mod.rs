//! Encoder provider implementations.

pub mod hash;
pub mod http;

pub use hash::HashEncoder;
pub use http::HttpEncoder;
