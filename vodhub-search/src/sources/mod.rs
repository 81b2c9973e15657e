//! Source client implementations.
//!
//! [`ApiSourceClient`] speaks the `?ac=videolist&wd=` JSON protocol shared
//! by most public video content-index sites.

pub mod api;

pub use api::ApiSourceClient;
