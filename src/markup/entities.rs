//! Named character references recognised in HTML text and attribute values.
//!
//! Numeric references (`&#160;`, `&#xA0;`) are decoded by quick-xml itself;
//! this table only has to cover the names real pages use.

pub(crate) fn resolve_html_entity(name: &str) -> Option<&'static str> {
    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "hellip" => "\u{2026}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        "euro" => "\u{20ac}",
        _ => return None,
    };
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_entities() {
        assert_eq!(resolve_html_entity("amp"), Some("&"));
        assert_eq!(resolve_html_entity("nbsp"), Some("\u{a0}"));
        assert_eq!(resolve_html_entity("notanentity"), None);
    }
}
