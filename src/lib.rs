//! Streaming path-based extraction of structured data from HTML
//!
//! Provides:
//! - a lenient HTML tokenizer emitting open/close/text events (`markup`)
//! - the single-pass capture engine driven by ancestor-path patterns (`path`)
//! - typed field mapping and the Amazon Prime Video movie extractor (`extractors`)
//! - page fetching, configuration and the HTTP movie service

pub mod config;
pub mod extractors;
pub mod fetch;
pub mod markup;
pub mod path;
pub mod server;

pub use extractors::*;
pub use path::*;
