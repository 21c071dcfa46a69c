//! HTML sanitization for stored email templates.
//!
//! Template bodies are cleaned with an allow-list before they are persisted.
//! Disallowed tags are stripped (their text content is kept), scripts and
//! styles are dropped entirely, and links are limited to http, https and
//! mailto.
//!
//! Sanitizing parses the body as HTML5, so template text placed directly
//! between table elements (`<table>`, `<tbody>`, `<tr>`) is moved in front
//! of the table. A `{% if %}` block wrapping table rows therefore ends up
//! empty and the rows render unconditionally; put conditionals around the
//! whole table or inside a cell instead.

use ammonia::Builder;
use std::collections::{HashMap, HashSet};

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4",
    "h5", "h6", "i", "li", "ol", "p", "pre", "span", "strong", "table", "tbody", "td", "th",
    "thead", "tr", "ul", "img", "hr",
];

const STRICT_TAGS: &[&str] = &["p", "br", "b", "i", "strong", "em"];

const ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title", "target"]),
    ("abbr", &["title"]),
    ("acronym", &["title"]),
    ("img", &["src", "alt", "title", "width", "height"]),
    ("div", &["class", "style"]),
    ("span", &["class", "style"]),
    ("p", &["class", "style"]),
    (
        "table",
        &["class", "style", "border", "cellpadding", "cellspacing"],
    ),
    ("td", &["class", "style", "colspan", "rowspan"]),
    ("th", &["class", "style", "colspan", "rowspan"]),
];

const ALLOWED_STYLES: &[&str] = &[
    "color",
    "background-color",
    "font-size",
    "font-weight",
    "font-family",
    "text-align",
    "padding",
    "margin",
    "border",
    "width",
    "height",
];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

const DROPPED_WITH_CONTENT: &[&str] = &["script", "style"];

/// Clean `html` against the email allow-list. `strict` keeps only basic
/// inline formatting and no attributes at all.
pub fn sanitize_html(html: &str, strict: bool) -> String {
    let mut builder = Builder::empty();
    builder
        .url_schemes(ALLOWED_SCHEMES.iter().copied().collect::<HashSet<_>>())
        .clean_content_tags(DROPPED_WITH_CONTENT.iter().copied().collect::<HashSet<_>>())
        .link_rel(None)
        .strip_comments(true);

    if strict {
        builder.tags(STRICT_TAGS.iter().copied().collect::<HashSet<_>>());
    } else {
        let attributes: HashMap<&str, HashSet<&str>> = ALLOWED_ATTRIBUTES
            .iter()
            .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
            .collect();
        builder
            .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
            .tag_attributes(attributes)
            .filter_style_properties(ALLOWED_STYLES.iter().copied().collect::<HashSet<_>>());
    }

    builder.clean(html).to_string()
}

/// Remove all markup, keeping only text content.
pub fn sanitize_text(text: &str) -> String {
    Builder::empty()
        .clean_content_tags(DROPPED_WITH_CONTENT.iter().copied().collect::<HashSet<_>>())
        .clean(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditionals_between_table_rows_are_moved_before_the_table() {
        let out = sanitize_html(
            "<table><tbody>{% if rows %}<tr><td>x</td></tr>{% endif %}</tbody></table>",
            false,
        );
        let table = out.find("<table>").unwrap();
        assert!(out.find("{% if rows %}").unwrap() < table);
        assert!(out.find("{% endif %}").unwrap() < table);
        assert!(out.contains("<tr><td>x</td></tr>"));

        let inside_cell = sanitize_html(
            "<table><tbody><tr><td>{% if rows %}x{% endif %}</td></tr></tbody></table>",
            false,
        );
        assert!(inside_cell.contains("<td>{% if rows %}x{% endif %}</td>"));
    }

    #[test]
    fn drops_script_with_its_content() {
        let out = sanitize_html(r#"<script>alert("xss")</script><p>Safe content</p>"#, false);
        assert_eq!(out, "<p>Safe content</p>");
    }

    #[test]
    fn drops_javascript_links() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#, false);
        assert!(!out.contains("javascript"));
        let out = sanitize_html(r#"<a href="https://contoso.com">x</a>"#, false);
        assert!(out.contains(r#"href="https://contoso.com""#));
    }

    #[test]
    fn strips_event_handlers() {
        let out = sanitize_html(r#"<p onclick="steal()">Hi</p>"#, false);
        assert_eq!(out, "<p>Hi</p>");
    }

    #[test]
    fn strict_mode_removes_layout_tags() {
        let out = sanitize_html(r#"<div class="x"><b>bold</b> <img src="https://a/b.png"></div>"#, true);
        assert_eq!(out, "<b>bold</b> ");
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let input = r#"<h2>Order {{ order_number }}</h2><p class="lead">Dear {{ customer_name }},</p><table border="1"><tbody><tr><td colspan="2">Total</td></tr></tbody></table><iframe src="x"></iframe>"#;
        let once = sanitize_html(input, false);
        let twice = sanitize_html(&once, false);
        assert_eq!(once, twice);
        assert!(once.contains("{{ order_number }}"));
        assert!(!once.contains("iframe"));
    }

    #[test]
    fn sanitize_text_removes_all_markup() {
        assert_eq!(
            sanitize_text(r#"<script>alert("xss")</script>Plain <b>text</b>"#),
            "Plain text"
        );
    }
}
