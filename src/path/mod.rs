//! Path-based capture engine
//!
//! Fields are declared as patterns over the ancestor chain of a node
//! (tag, sibling position, attributes). A single forward pass over the markup
//! events tracks that chain on a stack and collects matching nodes per field,
//! without ever building a document tree.
//!
//! ```ignore
//! let parser = PathParser::new().with_capture(
//!     "items",
//!     vec![PatternElement::tag("ul").branch(1), PatternElement::tag("li")],
//! );
//! let store = parser.parse_html(html)?;
//! for item in store.entries("items") { /* ... */ }
//! ```

mod capture;
mod matcher;
mod parser;
mod pattern;
mod stack;

pub use capture::{CaptureEntry, CaptureStore};
pub use matcher::{element_matches, matches};
pub use parser::{ParseError, PathParser};
pub use pattern::{NodeTest, Pattern, PatternElement, TEXT_SENTINEL};
pub use stack::{Node, PathElement, PathStack};
