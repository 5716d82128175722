//! Suffix matching of a path against a pattern

use super::pattern::{NodeTest, Pattern, PatternElement};
use super::stack::{Node, PathElement};

/// Check whether the innermost part of `path` satisfies `pattern`.
///
/// Both are compared from their last element backwards for as many steps as
/// the shorter of the two allows, so ancestors beyond the pattern's length are
/// never looked at and pattern elements above the document root are not
/// required to exist.
pub fn matches(path: &[PathElement], pattern: &Pattern) -> bool {
    path.iter()
        .rev()
        .zip(pattern.elements().iter().rev())
        .all(|(node, spec)| element_matches(node, spec))
}

/// Compare a single path element with a single specifier.
pub fn element_matches(node: &PathElement, spec: &PatternElement) -> bool {
    if !spec.is_wildcard_branch() && spec.branch != node.branch {
        return false;
    }

    match (&spec.tag, &node.node) {
        (NodeTest::Text, Node::Text(_)) => spec.attributes.is_empty(),
        (NodeTest::Element(expected), Node::Element { tag, attributes }) => {
            expected == tag
                && spec.attributes.iter().all(|(key, value)| {
                    attributes
                        .iter()
                        .any(|attr| &attr.key == key && &attr.value == value)
                })
        }
        _ => false,
    }
}
