//! Markup events consumed by the path engine

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single `key="value"` pair on an element, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One event of a forward-only markup stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    /// Start tag that may have children
    Open {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// End tag
    Close { name: String },
    /// Character data between tags
    Text(String),
    /// Element that cannot have children (`<img>`, `<div/>`)
    SelfClosing {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Clean end of the document
    EndOfInput,
}

impl MarkupEvent {
    pub fn open(name: impl Into<String>) -> Self {
        MarkupEvent::Open {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn open_with(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        MarkupEvent::Open {
            name: name.into(),
            attributes,
        }
    }

    pub fn close(name: impl Into<String>) -> Self {
        MarkupEvent::Close { name: name.into() }
    }

    pub fn text(content: impl Into<String>) -> Self {
        MarkupEvent::Text(content.into())
    }

    pub fn self_closing(name: impl Into<String>) -> Self {
        MarkupEvent::SelfClosing {
            name: name.into(),
            attributes: Vec::new(),
        }
    }
}

impl fmt::Display for MarkupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupEvent::Open { name, attributes } => {
                write!(f, "<{}", name)?;
                write_attributes(f, attributes)?;
                f.write_str(">")
            }
            MarkupEvent::SelfClosing { name, attributes } => {
                write!(f, "<{}", name)?;
                write_attributes(f, attributes)?;
                f.write_str("/>")
            }
            MarkupEvent::Close { name } => write!(f, "</{}>", name),
            MarkupEvent::Text(content) => f.write_str(content),
            MarkupEvent::EndOfInput => Ok(()),
        }
    }
}

pub(crate) fn write_attributes(f: &mut fmt::Formatter<'_>, attributes: &[Attribute]) -> fmt::Result {
    for attr in attributes {
        write!(f, " {}=\"{}\"", attr.key, attr.value)?;
    }
    Ok(())
}

/// Fault reported by a markup stream
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed markup at byte {position}: {source}")]
    Malformed {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("markup stream failed: {0}")]
    Other(String),
}

/// Pull-based source of markup events.
///
/// Implementations must keep open/close events properly nested; the engine
/// treats a close with nothing open as a broken contract.
pub trait EventSource {
    fn next_event(&mut self) -> Result<MarkupEvent, StreamError>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_event(&mut self) -> Result<MarkupEvent, StreamError> {
        (**self).next_event()
    }
}

/// Adapts an iterator of already decoded events into an [`EventSource`].
///
/// Yields `EndOfInput` forever once the iterator is exhausted.
pub struct EventIter<I> {
    inner: I,
}

impl<I> EventIter<I>
where
    I: Iterator<Item = MarkupEvent>,
{
    pub fn new(events: impl IntoIterator<IntoIter = I, Item = MarkupEvent>) -> Self {
        Self {
            inner: events.into_iter(),
        }
    }
}

impl<I> EventSource for EventIter<I>
where
    I: Iterator<Item = MarkupEvent>,
{
    fn next_event(&mut self) -> Result<MarkupEvent, StreamError> {
        Ok(self.inner.next().unwrap_or(MarkupEvent::EndOfInput))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_iter_ends_cleanly() {
        let mut source = EventIter::new(vec![MarkupEvent::open("p"), MarkupEvent::close("p")]);
        assert_eq!(source.next_event().unwrap(), MarkupEvent::open("p"));
        assert_eq!(source.next_event().unwrap(), MarkupEvent::close("p"));
        assert_eq!(source.next_event().unwrap(), MarkupEvent::EndOfInput);
        assert_eq!(source.next_event().unwrap(), MarkupEvent::EndOfInput);
    }

    #[test]
    fn test_display() {
        let event = MarkupEvent::open_with("li", vec![Attribute::new("data-foo", "bar")]);
        assert_eq!(event.to_string(), "<li data-foo=\"bar\">");
        assert_eq!(MarkupEvent::self_closing("br").to_string(), "<br/>");
        assert_eq!(MarkupEvent::close("li").to_string(), "</li>");
    }
}
