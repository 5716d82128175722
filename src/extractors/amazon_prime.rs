//! Amazon Prime Video movie pages

use serde::Serialize;

use super::fields::{ExtractionRequest, ExtractedFields, FieldKind, FieldSpec, Transform};
use super::PageExtractor;
use crate::path::{ParseError, PathParser, PatternElement};

/// Movie details scraped from a product page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmazonPrimeMovie {
    pub title: String,
    pub release_year: i32,
    pub actors: Vec<String>,
    pub poster: String,
    pub similar_ids: Vec<String>,
}

impl From<&ExtractedFields> for AmazonPrimeMovie {
    fn from(fields: &ExtractedFields) -> Self {
        Self {
            title: fields.text("title").unwrap_or_default().to_string(),
            release_year: fields
                .integer("release_year")
                .and_then(|year| i32::try_from(year).ok())
                .unwrap_or(0),
            actors: fields.list("actors").unwrap_or_default().to_vec(),
            poster: fields.text("poster").unwrap_or_default().to_string(),
            similar_ids: fields.list("similar_ids").unwrap_or_default().to_vec(),
        }
    }
}

/// Knows where movie fields live on an amazon.de product page.
#[derive(Debug, Clone)]
pub struct AmazonPrimeExtractor {
    request: ExtractionRequest,
    parser: PathParser,
}

impl AmazonPrimeExtractor {
    pub fn new() -> Self {
        let request = ExtractionRequest::new(movie_fields());
        let parser = request.parser();
        Self { request, parser }
    }

    pub fn request(&self) -> &ExtractionRequest {
        &self.request
    }
}

impl Default for AmazonPrimeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor for AmazonPrimeExtractor {
    type Output = AmazonPrimeMovie;

    fn extract(&self, html: &str) -> Result<AmazonPrimeMovie, ParseError> {
        let store = self.parser.parse_html(html)?;
        let fields = self.request.resolve(&store);
        Ok(AmazonPrimeMovie::from(&fields))
    }
}

fn movie_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            "title",
            FieldKind::Text,
            vec![
                PatternElement::tag("h1").attr("data-automation-id", "title"),
                PatternElement::text().branch(1),
            ],
        ),
        FieldSpec::new(
            "release_year",
            FieldKind::Integer,
            vec![
                PatternElement::tag("span").attr("data-automation-id", "release-year-badge"),
                PatternElement::text(),
            ],
        ),
        FieldSpec::new(
            "actors",
            FieldKind::List,
            vec![
                PatternElement::tag("div").attr("data-automation-id", "meta-info"),
                PatternElement::tag("div"),
                PatternElement::tag("dl").branch(2),
                PatternElement::tag("dd").branch(2),
                PatternElement::tag("a"),
                PatternElement::text().branch(1),
            ],
        ),
        FieldSpec::new(
            "similar_ids",
            FieldKind::List,
            vec![
                PatternElement::tag("ul").branch(1),
                PatternElement::tag("li"),
                PatternElement::tag("div").branch(1),
                PatternElement::tag("div").branch(1),
                PatternElement::tag("a").branch(1),
            ],
        )
        .attribute("href")
        .transform(Transform::ProductId),
        FieldSpec::new(
            "poster",
            FieldKind::Text,
            vec![
                PatternElement::tag("div").branch(2),
                PatternElement::tag("img").attr("id", "atf-full"),
            ],
        )
        .attribute("src"),
    ]
}
