//! Lenient HTML tokenizer
//!
//! Wraps quick-xml's pull reader and smooths over the places where HTML is not
//! XML: void elements, raw-text elements, stray or missing end tags, bare `<`
//! and `&` in text and named character references. Nesting of the emitted
//! events is always balanced.

use std::collections::VecDeque;

use quick_xml::errors::{IllFormedError, SyntaxError};
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

use super::entities::resolve_html_entity;
use super::event::{Attribute, EventSource, MarkupEvent, StreamError};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes",
];

/// Raw-text elements whose content still has character references decoded
const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

/// Elements whose start closes an open `<p>`
const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr",
    "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Longest `&name;` considered a character reference
const MAX_REFERENCE_LEN: usize = 32;

/// Event source over an in-memory HTML document.
pub struct HtmlTokenizer<'a> {
    input: &'a str,
    reader: Reader<&'a [u8]>,
    /// Elements opened by this tokenizer and not yet closed
    open: Vec<String>,
    pending: VecDeque<MarkupEvent>,
    /// The next text event continues the last pending one
    joining_text: bool,
    finished: bool,
}

impl<'a> HtmlTokenizer<'a> {
    pub fn new(html: &'a str) -> Self {
        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;

        Self {
            input: html,
            reader,
            open: Vec::new(),
            pending: VecDeque::new(),
            joining_text: false,
            finished: false,
        }
    }

    /// Byte offset of the first unread byte
    fn offset(&self) -> usize {
        self.input.len() - self.reader.get_ref().len()
    }

    /// Continue reading at byte `offset` of the input.
    fn rewind(&mut self, offset: usize) {
        let input = self.input;
        *self.reader.get_mut() = &input.as_bytes()[offset..];
    }

    fn malformed(&self, source: quick_xml::Error) -> StreamError {
        StreamError::Malformed {
            position: self.offset() as u64,
            source,
        }
    }

    /// Queue text, merging it into the previous text event when that one was
    /// interrupted by a literal `<`.
    fn push_text(&mut self, text: String) {
        if std::mem::take(&mut self.joining_text) {
            if let Some(MarkupEvent::Text(previous)) = self.pending.back_mut() {
                previous.push_str(&text);
                return;
            }
        }
        self.pending.push_back(MarkupEvent::Text(text));
    }

    /// Read one reader event and queue the markup events it stands for.
    fn advance(&mut self) -> Result<(), StreamError> {
        let before = self.offset();
        let event = match self.reader.read_event() {
            Ok(event) => event,
            Err(quick_xml::Error::Syntax(SyntaxError::UnclosedTag)) => {
                // A `<` with no `>` after it: the rest of the input is text.
                let input = self.input;
                let lt = before.saturating_sub(1);
                let rest = match input[lt..].find('<') {
                    Some(found) => &input[lt + found..],
                    None => &input[before..],
                };
                let text = decode_str(rest);
                self.joining_text = true;
                self.push_text(text);
                self.finished = true;
                return Ok(());
            }
            Err(e) => return Err(self.malformed(e)),
        };

        if !matches!(event, Event::Text(_)) {
            self.joining_text = false;
        }
        match event {
            Event::Start(start) => {
                if is_tag_name(&start) {
                    self.start_element(&start)?;
                } else {
                    self.literal_lt(start.len() + 2);
                }
            }
            Event::Empty(start) => {
                if is_tag_name(&start) {
                    let name = element_name(start.name());
                    self.close_implied(&name);
                    self.pending.push_back(MarkupEvent::SelfClosing {
                        attributes: element_attributes(&start),
                        name,
                    });
                } else {
                    self.literal_lt(start.len() + 3);
                }
            }
            Event::End(end) => self.end_element(&element_name(end.name())),
            Event::Text(text) => {
                let text = decode_text(&text);
                self.push_text(text);
            }
            Event::CData(data) => {
                let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                self.pending.push_back(MarkupEvent::Text(content));
            }
            Event::Eof => self.finished = true,
            // comments, doctype, declarations and processing instructions
            _ => {}
        }
        Ok(())
    }

    /// The reader took a `<` that does not open a tag, such as `5 < 6`, for a
    /// start tag `tag_len` bytes long. Keep the `<` as text and read on right
    /// after it.
    fn literal_lt(&mut self, tag_len: usize) {
        let lt = self.offset().saturating_sub(tag_len);
        self.joining_text = true;
        self.push_text("<".to_string());
        self.joining_text = true;
        self.rewind(lt + 1);
    }

    fn start_element(&mut self, start: &BytesStart<'a>) -> Result<(), StreamError> {
        let name = element_name(start.name());
        let attributes = element_attributes(start);
        self.close_implied(&name);

        if VOID_ELEMENTS.contains(&name.as_str()) {
            self.pending
                .push_back(MarkupEvent::SelfClosing { name, attributes });
            return Ok(());
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let content = self.read_raw_text(&name)?;
            let content = if ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                decode_str(content)
            } else {
                content.to_string()
            };

            self.pending.push_back(MarkupEvent::Open {
                name: name.clone(),
                attributes,
            });
            if !content.is_empty() {
                self.pending.push_back(MarkupEvent::Text(content));
            }
            self.pending.push_back(MarkupEvent::Close { name });
            return Ok(());
        }

        self.open.push(name.clone());
        self.pending
            .push_back(MarkupEvent::Open { name, attributes });
        Ok(())
    }

    /// Content of a raw-text element up to its end tag, matched without
    /// regard to case. The reader resumes after the end tag.
    fn read_raw_text(&mut self, name: &str) -> Result<&'a str, StreamError> {
        let input = self.input;
        let start = self.offset();
        let Some((content_end, resume)) = find_end_tag(&input.as_bytes()[start..], name) else {
            let missing = IllFormedError::MissingEndTag(name.to_string());
            return Err(self.malformed(quick_xml::Error::IllFormed(missing)));
        };
        self.rewind(start + resume);
        Ok(&input[start..start + content_end])
    }

    /// Close open elements whose end tag HTML lets authors omit when `name`
    /// starts, e.g. `<li>` inside an unclosed `<li>`.
    fn close_implied(&mut self, name: &str) {
        while let Some(top) = self.open.last() {
            if !closes_implicitly(top, name) {
                break;
            }
            if let Some(closed) = self.open.pop() {
                self.pending.push_back(MarkupEvent::Close { name: closed });
            }
        }
    }

    /// Close `name` and everything opened after it. End tags for elements that
    /// are not open are dropped.
    fn end_element(&mut self, name: &str) {
        let Some(index) = self.open.iter().rposition(|open| open == name) else {
            return;
        };
        while self.open.len() > index {
            if let Some(closed) = self.open.pop() {
                self.pending.push_back(MarkupEvent::Close { name: closed });
            }
        }
    }

    fn ready(&self) -> bool {
        match self.pending.front() {
            None => false,
            // Text may still continue past a literal `<`
            Some(MarkupEvent::Text(_)) => self.finished || self.pending.len() > 1,
            Some(_) => true,
        }
    }
}

impl EventSource for HtmlTokenizer<'_> {
    fn next_event(&mut self) -> Result<MarkupEvent, StreamError> {
        loop {
            if self.ready() {
                if let Some(event) = self.pending.pop_front() {
                    return Ok(event);
                }
            }
            if self.finished {
                return Ok(MarkupEvent::EndOfInput);
            }
            self.advance()?;
        }
    }
}

/// Whether a start of `starting` ends the unclosed element `open`
fn closes_implicitly(open: &str, starting: &str) -> bool {
    match open {
        "p" => P_CLOSERS.contains(&starting),
        "li" => starting == "li",
        "dt" | "dd" => matches!(starting, "dt" | "dd"),
        "option" => matches!(starting, "option" | "optgroup"),
        "tr" => starting == "tr",
        "td" | "th" => matches!(starting, "td" | "th" | "tr"),
        _ => false,
    }
}

/// HTML tag names start with an ASCII letter; anything else after `<` is text.
fn is_tag_name(start: &BytesStart<'_>) -> bool {
    start
        .name()
        .as_ref()
        .first()
        .is_some_and(|b| b.is_ascii_alphabetic())
}

/// Find `</name` followed by `>`, `/` or whitespace, ignoring ASCII case.
/// Returns the offset of the end tag's `<` and the offset just past its `>`.
fn find_end_tag(haystack: &[u8], name: &str) -> Option<(usize, usize)> {
    let name = name.as_bytes();
    let mut from = 0;
    while let Some(found) = haystack[from..].iter().position(|&b| b == b'<') {
        let lt = from + found;
        from = lt + 1;

        let Some(candidate) = haystack[lt + 1..].strip_prefix(b"/") else {
            continue;
        };
        let Some(tag) = candidate.get(..name.len()) else {
            continue;
        };
        let after = &candidate[name.len()..];
        let boundary = after
            .first()
            .is_some_and(|&b| b == b'>' || b == b'/' || b.is_ascii_whitespace());
        if tag.eq_ignore_ascii_case(name) && boundary {
            let gt = after.iter().position(|&b| b == b'>')?;
            return Some((lt, lt + 2 + name.len() + gt + 1));
        }
    }
    None
}

fn element_name(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).to_ascii_lowercase()
}

fn element_attributes(start: &BytesStart<'_>) -> Vec<Attribute> {
    let mut attributes = start.html_attributes();
    attributes.with_checks(false);

    attributes
        .filter_map(Result::ok)
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = decode_str(&String::from_utf8_lossy(&attr.value));
            Attribute { key, value }
        })
        .collect()
}

fn decode_text(text: &BytesText<'_>) -> String {
    decode_str(&String::from_utf8_lossy(text))
}

/// Decode character references one at a time. A `&` that does not start a
/// known reference stays as it is.
fn decode_str(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let reference_len = rest[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_REFERENCE_LEN)
            .filter(|&end| {
                rest[1..=end]
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'#')
            })
            .map(|end| end + 2);
        let resolved = reference_len
            .and_then(|len| unescape_with(&rest[..len], resolve_html_entity).ok())
            .zip(reference_len);

        match resolved {
            Some((value, len)) => {
                decoded.push_str(&value);
                rest = &rest[len..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(html: &str) -> Vec<MarkupEvent> {
        let mut tokenizer = HtmlTokenizer::new(html);
        let mut events = Vec::new();
        loop {
            match tokenizer.next_event().unwrap() {
                MarkupEvent::EndOfInput => break,
                event => events.push(event),
            }
        }
        events
    }

    #[test]
    fn test_basic_events() {
        let events = tokenize(r#"<ul class="menu"><li>first</li><li/></ul>"#);
        assert_eq!(
            events,
            vec![
                MarkupEvent::open_with("ul", vec![Attribute::new("class", "menu")]),
                MarkupEvent::open("li"),
                MarkupEvent::text("first"),
                MarkupEvent::close("li"),
                MarkupEvent::self_closing("li"),
                MarkupEvent::close("ul"),
            ]
        );
    }

    #[test]
    fn test_void_elements_are_self_closing() {
        let events = tokenize(r#"<div><img src="a.jpg"><br></br></div>"#);
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("div"),
                MarkupEvent::SelfClosing {
                    name: "img".to_string(),
                    attributes: vec![Attribute::new("src", "a.jpg")],
                },
                MarkupEvent::self_closing("br"),
                MarkupEvent::close("div"),
            ]
        );
    }

    #[test]
    fn test_names_are_lowercased() {
        let events = tokenize(r#"<DIV ID="x">hi</DIV>"#);
        assert_eq!(
            events,
            vec![
                MarkupEvent::open_with("div", vec![Attribute::new("id", "x")]),
                MarkupEvent::text("hi"),
                MarkupEvent::close("div"),
            ]
        );
    }

    #[test]
    fn test_unclosed_elements_are_closed_by_ancestor_end_tag() {
        let events = tokenize("<div><p>one<span>two</div>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("div"),
                MarkupEvent::open("p"),
                MarkupEvent::text("one"),
                MarkupEvent::open("span"),
                MarkupEvent::text("two"),
                MarkupEvent::close("span"),
                MarkupEvent::close("p"),
                MarkupEvent::close("div"),
            ]
        );
    }

    #[test]
    fn test_stray_end_tags_are_dropped() {
        let events = tokenize("</p><div>x</span></div></div>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("div"),
                MarkupEvent::text("x"),
                MarkupEvent::close("div"),
            ]
        );
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let events = tokenize("<script>if (a < b && c) { go(); }</script><p>after</p>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("script"),
                MarkupEvent::text("if (a < b && c) { go(); }"),
                MarkupEvent::close("script"),
                MarkupEvent::open("p"),
                MarkupEvent::text("after"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn test_entities_are_decoded() {
        let events = tokenize(r#"<p title="Tom &amp; Jerry">a&nbsp;b &#65;</p>"#);
        assert_eq!(
            events,
            vec![
                MarkupEvent::open_with("p", vec![Attribute::new("title", "Tom & Jerry")]),
                MarkupEvent::text("a\u{a0}b A"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn test_unknown_entity_keeps_raw_text() {
        let events = tokenize("<p>fish &chips;</p>");
        assert_eq!(events[1], MarkupEvent::text("fish &chips;"));
    }

    #[test]
    fn test_comments_and_doctype_are_skipped() {
        let events = tokenize("<!DOCTYPE html><!-- note --><p>x</p>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("p"),
                MarkupEvent::text("x"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn test_unterminated_script_is_malformed() {
        let mut tokenizer = HtmlTokenizer::new("<script>var a = 1;");
        assert!(matches!(tokenizer.next_event(), Err(StreamError::Malformed { .. })));
    }

    #[test]
    fn test_bare_lt_in_text_is_text() {
        let events = tokenize("<p>5 < 6</p><p>x</p>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("p"),
                MarkupEvent::text("5 < 6"),
                MarkupEvent::close("p"),
                MarkupEvent::open("p"),
                MarkupEvent::text("x"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn test_lt_before_digit_or_symbol_is_text() {
        let events = tokenize("<p>i <3 u, a <= b</p>");
        assert_eq!(events[1], MarkupEvent::text("i <3 u, a <= b"));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_trailing_lt_without_gt_is_text() {
        let events = tokenize("<p>a < b");
        assert_eq!(events, vec![MarkupEvent::open("p"), MarkupEvent::text("a < b")]);
    }

    #[test]
    fn test_mixed_case_raw_text_end_tag() {
        let events = tokenize("<Script>var a = 1;</script><STYLE>p{}</Style ><p>z</p>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("script"),
                MarkupEvent::text("var a = 1;"),
                MarkupEvent::close("script"),
                MarkupEvent::open("style"),
                MarkupEvent::text("p{}"),
                MarkupEvent::close("style"),
                MarkupEvent::open("p"),
                MarkupEvent::text("z"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn test_raw_text_end_tag_needs_name_boundary() {
        let events = tokenize("<script>a</scripts>b</script>");
        assert_eq!(events[1], MarkupEvent::text("a</scripts>b"));
    }

    #[test]
    fn test_bare_ampersand_keeps_other_references() {
        let events = tokenize(r#"<p>Tom & Jerry &amp; co</p><a href="/s?a=1&b=2&amp;c=3">x</a>"#);
        assert_eq!(events[1], MarkupEvent::text("Tom & Jerry & co"));
        assert_eq!(
            events[3],
            MarkupEvent::open_with("a", vec![Attribute::new("href", "/s?a=1&b=2&c=3")])
        );
    }

    #[test]
    fn test_unknown_entity_next_to_known_one() {
        let events = tokenize("<p>&chips; &copy; &#x41;&;</p>");
        assert_eq!(events[1], MarkupEvent::text("&chips; \u{a9} A&;"));
    }

    #[test]
    fn test_implied_end_tags() {
        let events = tokenize("<ul><li>a<li>b</ul><p>one<p>two<div>three</div>");
        assert_eq!(
            events,
            vec![
                MarkupEvent::open("ul"),
                MarkupEvent::open("li"),
                MarkupEvent::text("a"),
                MarkupEvent::close("li"),
                MarkupEvent::open("li"),
                MarkupEvent::text("b"),
                MarkupEvent::close("li"),
                MarkupEvent::close("ul"),
                MarkupEvent::open("p"),
                MarkupEvent::text("one"),
                MarkupEvent::close("p"),
                MarkupEvent::open("p"),
                MarkupEvent::text("two"),
                MarkupEvent::close("p"),
                MarkupEvent::open("div"),
                MarkupEvent::text("three"),
                MarkupEvent::close("div"),
            ]
        );
    }

    #[test]
    fn test_implied_end_of_table_cells() {
        let events = tokenize("<table><tr><td>1<td>2<tr><td>3</table>");
        let closes: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                MarkupEvent::Close { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(closes, vec!["td", "td", "tr", "td", "tr", "table"]);
    }
}
