//! Ancestor path tracking
//!
//! The path stack holds the chain of currently open nodes, each tagged with
//! its 1-based position among its siblings. Sibling counting only needs the
//! branch of the most recently closed sibling, so a single counter is enough.

use serde::Serialize;
use std::fmt;

use crate::markup::{write_attributes, Attribute};

/// Payload of a node on the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Element {
        tag: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

/// A node on the path together with its sibling index.
///
/// The same record is handed to callers as a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathElement {
    pub branch: usize,
    pub node: Node,
}

impl PathElement {
    pub fn is_text(&self) -> bool {
        matches!(self.node, Node::Text(_))
    }

    /// Element tag name, `None` for text nodes
    pub fn tag(&self) -> Option<&str> {
        match &self.node {
            Node::Element { tag, .. } => Some(tag),
            Node::Text(_) => None,
        }
    }

    /// Text content, `None` for elements
    pub fn text(&self) -> Option<&str> {
        match &self.node {
            Node::Element { .. } => None,
            Node::Text(content) => Some(content),
        }
    }

    /// Text content for text nodes, tag name for elements
    pub fn data(&self) -> &str {
        match &self.node {
            Node::Element { tag, .. } => tag,
            Node::Text(content) => content,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match &self.node {
            Node::Element { attributes, .. } => attributes,
            Node::Text(_) => &[],
        }
    }

    /// First value of attribute `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Element { tag, attributes } => {
                write!(f, "<{}", tag)?;
                write_attributes(f, attributes)?;
                f.write_str(">")
            }
            Node::Text(content) => f.write_str(content),
        }
    }
}

/// Stack of open ancestors plus the running sibling counter.
#[derive(Debug, Default)]
pub struct PathStack {
    elements: Vec<PathElement>,
    /// Branch of the last node retired at the current depth
    last_branch: usize,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `node` as the next sibling at the current depth. Its own children
    /// will start counting from 1.
    pub fn push(&mut self, node: Node) -> &PathElement {
        let branch = self.last_branch + 1;
        self.last_branch = 0;
        self.elements.push(PathElement { branch, node });
        &self.elements[self.elements.len() - 1]
    }

    /// Retire the innermost node, remembering its branch for the next sibling.
    /// Returns `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<PathElement> {
        let element = self.elements.pop()?;
        self.last_branch = element.branch;
        Some(element)
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
