//! Streaming path-based capture
//!
//! [`PathParser`] walks a markup event stream once, keeping only the chain of
//! open ancestors, and records every node whose path ends the way a registered
//! pattern describes.

use thiserror::Error;
use tracing::{debug, trace};

use super::capture::CaptureStore;
use super::matcher::matches;
use super::pattern::Pattern;
use super::stack::{Node, PathStack};
use crate::markup::{EventSource, HtmlTokenizer, MarkupEvent, StreamError};

/// Failure of a parse pass. No partial captures are returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("close of <{tag}> with no open element")]
    StructuralViolation { tag: String },
}

/// Set of named patterns plus the event loop that applies them.
///
/// Registrations are only changed through `&mut self`; parsing takes `&self`
/// and keeps all pass state local, so one parser can serve any number of
/// concurrent passes.
#[derive(Debug, Clone, Default)]
pub struct PathParser {
    registrations: Vec<(String, Pattern)>,
}

// Sharing a parser across threads is part of its contract.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PathParser>();
};

impl PathParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern` under `field`.
    ///
    /// Registering an existing field replaces its pattern but keeps its
    /// position in the registration order.
    pub fn capture(&mut self, field: impl Into<String>, pattern: impl Into<Pattern>) -> &mut Self {
        let field = field.into();
        let pattern = pattern.into();
        match self.registrations.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = pattern,
            None => self.registrations.push((field, pattern)),
        }
        self
    }

    /// Builder form of [`capture`](Self::capture)
    pub fn with_capture(mut self, field: impl Into<String>, pattern: impl Into<Pattern>) -> Self {
        self.capture(field, pattern);
        self
    }

    pub fn pattern(&self, field: &str) -> Option<&Pattern> {
        self.registrations
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, pattern)| pattern)
    }

    /// Registered fields in registration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.registrations
            .iter()
            .map(|(name, pattern)| (name.as_str(), pattern))
    }

    /// Tokenize `html` and run a capture pass over it.
    pub fn parse_html(&self, html: &str) -> Result<CaptureStore, ParseError> {
        self.parse(HtmlTokenizer::new(html))
    }

    /// Run a single capture pass over `source`.
    pub fn parse<S: EventSource>(&self, mut source: S) -> Result<CaptureStore, ParseError> {
        let mut stack = PathStack::new();
        let mut store = CaptureStore::with_fields(self.registrations.iter().map(|(name, _)| name.as_str()));
        let mut events = 0usize;

        loop {
            let event = source.next_event()?;
            events += 1;

            match event {
                MarkupEvent::Open { name, attributes } => {
                    self.visit(&mut stack, &mut store, Node::Element { tag: name, attributes });
                }
                MarkupEvent::SelfClosing { name, attributes } => {
                    self.visit(
                        &mut stack,
                        &mut store,
                        Node::Element {
                            tag: name.clone(),
                            attributes,
                        },
                    );
                    retire(&mut stack, &name)?;
                }
                MarkupEvent::Text(content) => {
                    if content.trim().is_empty() {
                        continue;
                    }
                    self.visit(&mut stack, &mut store, Node::Text(content));
                    retire(&mut stack, "text")?;
                }
                MarkupEvent::Close { name } => {
                    retire(&mut stack, &name)?;
                }
                MarkupEvent::EndOfInput => {
                    debug!(
                        events,
                        fields = store.len(),
                        captures = store.capture_count(),
                        "capture pass finished"
                    );
                    return Ok(store);
                }
            }
        }
    }

    /// Push `node` and record it under every field whose pattern it satisfies.
    fn visit(&self, stack: &mut PathStack, store: &mut CaptureStore, node: Node) {
        stack.push(node);
        let path = stack.elements();
        let Some(current) = path.last() else {
            return;
        };

        for (index, (field, pattern)) in self.registrations.iter().enumerate() {
            if matches(path, pattern) {
                trace!(field = field.as_str(), depth = path.len(), node = %current, "captured");
                store.push(index, current.clone());
            }
        }
    }
}

fn retire(stack: &mut PathStack, tag: &str) -> Result<(), ParseError> {
    stack
        .pop()
        .map(|_| ())
        .ok_or_else(|| ParseError::StructuralViolation {
            tag: tag.to_string(),
        })
}
