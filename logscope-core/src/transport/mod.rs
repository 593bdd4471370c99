//! Concrete [`NodeTransport`](crate::bridge::NodeTransport) implementations.

pub mod http;

pub use http::HttpNodeTransport;
