//! Site-specific extraction
//!
//! Extractors own a fixed set of field patterns and map the captures of a
//! pass onto a typed record.

mod amazon_prime;
mod fields;

pub use amazon_prime::*;
pub use fields::*;

use serde::Serialize;

use crate::path::ParseError;

/// Turns a page into a typed record.
///
/// Implementations hold only immutable pattern registrations, so a single
/// instance can be shared by concurrent requests.
pub trait PageExtractor: Send + Sync {
    type Output: Serialize;

    fn extract(&self, html: &str) -> Result<Self::Output, ParseError>;
}
