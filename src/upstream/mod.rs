//! Read-only access to the time-series backend
//!
//! ```text
//! QueryBuilder ─► UpstreamClient (GET /api/v1/query, /api/v1/label/…/values) ─► ResponseParser
//! ```

pub mod client;
pub mod parser;
pub mod query;

pub use client::{HttpUpstream, RawResponse, UpstreamClient, UpstreamError};
pub use parser::ResponseParser;
pub use query::QueryBuilder;
