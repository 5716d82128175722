//! Markup tokenization
//!
//! Turns documents into the flat event stream the path engine walks.

mod entities;
mod event;
mod html_tokenizer;

pub use event::*;
pub use html_tokenizer::HtmlTokenizer;
