//! Search patterns
//!
//! A pattern is a list of element specifiers written root-to-leaf. The last
//! specifier describes the node to capture, the ones before it describe its
//! nearest ancestors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag name that stands for a text node rather than an element
pub const TEXT_SENTINEL: &str = "text";

/// What kind of node a specifier accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeTest {
    /// Element with exactly this tag name
    Element(String),
    /// Non-blank text node
    Text,
}

impl From<String> for NodeTest {
    fn from(tag: String) -> Self {
        if tag == TEXT_SENTINEL {
            NodeTest::Text
        } else {
            NodeTest::Element(tag)
        }
    }
}

impl From<&str> for NodeTest {
    fn from(tag: &str) -> Self {
        NodeTest::from(tag.to_string())
    }
}

impl From<NodeTest> for String {
    fn from(test: NodeTest) -> Self {
        match test {
            NodeTest::Element(tag) => tag,
            NodeTest::Text => TEXT_SENTINEL.to_string(),
        }
    }
}

/// One specifier in a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternElement {
    pub tag: NodeTest,
    /// 1-based sibling position; 0 accepts any position
    #[serde(default)]
    pub branch: usize,
    /// Attributes the node must carry with exactly these values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl PatternElement {
    /// Element specifier at any sibling position
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            tag: NodeTest::from(name.into()),
            branch: 0,
            attributes: BTreeMap::new(),
        }
    }

    /// Text node specifier at any sibling position
    pub fn text() -> Self {
        Self {
            tag: NodeTest::Text,
            branch: 0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn branch(mut self, branch: usize) -> Self {
        self.branch = branch;
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_wildcard_branch(&self) -> bool {
        self.branch == 0
    }
}

impl fmt::Display for PatternElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            NodeTest::Element(tag) => f.write_str(tag)?,
            NodeTest::Text => f.write_str(TEXT_SENTINEL)?,
        }
        for (key, value) in &self.attributes {
            write!(f, "[{}={}]", key, value)?;
        }
        if self.branch > 0 {
            write!(f, "#{}", self.branch)?;
        }
        Ok(())
    }
}

/// Ordered root-to-leaf sequence of specifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern {
    elements: Vec<PatternElement>,
}

impl Pattern {
    pub fn new(elements: Vec<PatternElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl From<Vec<PatternElement>> for Pattern {
    fn from(elements: Vec<PatternElement>) -> Self {
        Self::new(elements)
    }
}

impl FromIterator<PatternElement> for Pattern {
    fn from_iter<T: IntoIterator<Item = PatternElement>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}
