//! Typed field mapping
//!
//! Turns the raw captures of a pass into typed values, one per declared field.

use serde::{Deserialize, Serialize};

use crate::path::{CaptureEntry, CaptureStore, ParseError, PathParser, Pattern};

/// Shape of a resolved field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Last captured value
    #[default]
    Text,
    /// Last captured value as a base-10 integer
    Integer,
    /// Every captured value in document order
    List,
}

/// Resolved value of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    List(Vec<String>),
}

/// Per-value transformation applied after reading the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    Lowercase,
    Uppercase,
    /// Product identifier following `/dp/`, `/detail/` or `/product/` in a URL
    ProductId,
}

impl Transform {
    /// Apply to one value; `None` drops the value
    pub fn apply(self, value: &str) -> Option<String> {
        match self {
            Transform::Trim => Some(value.trim().to_string()),
            Transform::Lowercase => Some(value.to_lowercase()),
            Transform::Uppercase => Some(value.to_uppercase()),
            Transform::ProductId => product_id(value).map(String::from),
        }
    }
}

const PRODUCT_ID_MARKERS: &[&str] = &["dp", "detail", "product"];
const PRODUCT_ID_LEN: usize = 10;

/// Find the product identifier in a product URL or path.
///
/// Identifiers are 10 ASCII alphanumerics and directly follow one of the
/// marker segments, e.g. `/gp/video/detail/B08KP1ABCD/ref=xyz`.
pub fn product_id(url: &str) -> Option<&str> {
    let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if !PRODUCT_ID_MARKERS.contains(&segment) {
            continue;
        }
        if let Some(candidate) = segments.clone().next() {
            if candidate.len() == PRODUCT_ID_LEN && candidate.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Declaration of a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub pattern: Pattern,
    #[serde(default)]
    pub kind: FieldKind,
    /// Read this attribute instead of the node's data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, pattern: impl Into<Pattern>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            kind,
            attribute: None,
            transform: None,
        }
    }

    pub fn attribute(mut self, key: impl Into<String>) -> Self {
        self.attribute = Some(key.into());
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Read and transform the value of one capture
    fn value_of(&self, entry: &CaptureEntry) -> Option<String> {
        let raw = match &self.attribute {
            Some(key) => entry.attribute(key)?,
            None => entry.data(),
        };
        match self.transform {
            Some(transform) => transform.apply(raw),
            None => Some(raw.to_string()),
        }
    }

    /// Resolve this field's captures into a typed value
    pub fn resolve(&self, entries: &[CaptureEntry]) -> FieldValue {
        match self.kind {
            FieldKind::Text => FieldValue::Text(
                entries
                    .iter()
                    .rev()
                    .find_map(|entry| self.value_of(entry))
                    .unwrap_or_default(),
            ),
            FieldKind::Integer => FieldValue::Integer(
                entries
                    .iter()
                    .rev()
                    .find_map(|entry| self.value_of(entry))
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(0),
            ),
            FieldKind::List => FieldValue::List(
                entries
                    .iter()
                    .filter_map(|entry| self.value_of(entry))
                    .collect(),
            ),
        }
    }
}

/// A set of field declarations, usually loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub fields: Vec<FieldSpec>,
}

impl ExtractionRequest {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Parser with one registration per field, in declaration order
    pub fn parser(&self) -> PathParser {
        let mut parser = PathParser::new();
        for field in &self.fields {
            parser.capture(field.name.as_str(), field.pattern.clone());
        }
        parser
    }

    /// Map a finished pass onto the declared fields
    pub fn resolve(&self, store: &CaptureStore) -> ExtractedFields {
        ExtractedFields {
            values: self
                .fields
                .iter()
                .map(|field| (field.name.clone(), field.resolve(store.entries(&field.name))))
                .collect(),
        }
    }

    /// Build a parser, run it over `html` and resolve the result
    pub fn extract(&self, html: &str) -> Result<ExtractedFields, ParseError> {
        let store = self.parser().parse_html(html)?;
        Ok(self.resolve(&store))
    }
}

/// Resolved fields in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    values: Vec<(String, FieldValue)>,
}

impl ExtractedFields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            FieldValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for ExtractedFields {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PatternElement;

    const HTML: &str = r#"
    <div class="product">
        <h2>Old name</h2>
        <h2> New name </h2>
        <span class="year">2013</span>
        <span class="year">soon</span>
        <ul>
            <li><a href="/gp/video/detail/B00K19SD8Q/ref=atv_1">One</a></li>
            <li><a href="/dp/B08MZ3B1KC?tag=x">Two</a></li>
            <li><a href="/help">Help</a></li>
        </ul>
    </div>
    "#;

    #[test]
    fn test_product_id() {
        assert_eq!(product_id("/gp/video/detail/B08KP1ABCD/ref=atv_dp"), Some("B08KP1ABCD"));
        assert_eq!(product_id("https://www.amazon.de/dp/B08MZ3B1KC?ref=x"), Some("B08MZ3B1KC"));
        assert_eq!(product_id("https://www.amazon.de/gp/product/B00K19SD8Q"), Some("B00K19SD8Q"));
        assert_eq!(product_id("/gp/video/detail/short/ref"), None);
        assert_eq!(product_id("/gp/help/customer"), None);
        assert_eq!(product_id(""), None);
    }

    #[test]
    fn test_transforms() {
        assert_eq!(Transform::Trim.apply("  a b "), Some("a b".to_string()));
        assert_eq!(Transform::Lowercase.apply("ABC"), Some("abc".to_string()));
        assert_eq!(Transform::Uppercase.apply("abc"), Some("ABC".to_string()));
        assert_eq!(Transform::ProductId.apply("/nothing/here"), None);
    }

    #[test]
    fn test_case_transforms_from_request() {
        let json = r#"{"fields": [
            {"name": "upper", "transform": "uppercase", "pattern": [{"tag": "h2", "branch": 1}, {"tag": "text"}]},
            {"name": "lower", "transform": "lowercase", "pattern": [{"tag": "h2", "branch": 1}, {"tag": "text"}]}
        ]}"#;
        let request: ExtractionRequest = serde_json::from_str(json).unwrap();
        let fields = request.extract(HTML).unwrap();
        assert_eq!(fields.text("upper"), Some("OLD NAME"));
        assert_eq!(fields.text("lower"), Some("old name"));
    }

    #[test]
    fn test_resolve_kinds() {
        let request = ExtractionRequest::new(vec![
            FieldSpec::new(
                "name",
                FieldKind::Text,
                vec![PatternElement::tag("h2"), PatternElement::text()],
            )
            .transform(Transform::Trim),
            FieldSpec::new(
                "first_year",
                FieldKind::Integer,
                vec![PatternElement::tag("span").branch(3), PatternElement::text()],
            ),
            FieldSpec::new(
                "last_year",
                FieldKind::Integer,
                vec![PatternElement::tag("span").attr("class", "year"), PatternElement::text()],
            ),
            FieldSpec::new("ids", FieldKind::List, vec![PatternElement::tag("li"), PatternElement::tag("a")])
                .attribute("href")
                .transform(Transform::ProductId),
            FieldSpec::new("missing", FieldKind::List, vec![PatternElement::tag("table")]),
        ]);

        let fields = request.extract(HTML).unwrap();
        assert_eq!(fields.text("name"), Some("New name"));
        assert_eq!(fields.integer("first_year"), Some(2013));
        // "soon" is the last capture and does not parse
        assert_eq!(fields.integer("last_year"), Some(0));
        assert_eq!(
            fields.list("ids"),
            Some(&["B00K19SD8Q".to_string(), "B08MZ3B1KC".to_string()][..])
        );
        assert_eq!(fields.list("missing"), Some(&[][..]));
        assert_eq!(fields.text("ids"), None);
    }

    #[test]
    fn test_deserialize_request_and_serialize_result() {
        let json = r#"{
            "fields": [
                {"name": "name", "pattern": [{"tag": "h2", "branch": 2}, {"tag": "text"}], "transform": "trim"},
                {"name": "links", "kind": "list", "attribute": "href",
                 "pattern": [{"tag": "ul"}, {"tag": "li"}, {"tag": "a"}]}
            ]
        }"#;
        let request: ExtractionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.fields[0].kind, FieldKind::Text);
        assert_eq!(request.fields[1].attribute.as_deref(), Some("href"));

        let fields = request.extract(HTML).unwrap();
        let output = serde_json::to_string(&fields).unwrap();
        assert_eq!(
            output,
            r#"{"name":"New name","links":["/gp/video/detail/B00K19SD8Q/ref=atv_1","/dp/B08MZ3B1KC?tag=x","/help"]}"#
        );
    }
}
