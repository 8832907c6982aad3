// End-to-end tests for the wrap command against a rope buffer

mod common;

use common::{Harness, html_buffer};
use wrapabbr::buffer::{Buffer, EditorView};
use wrapabbr::command::{Session, WrapError, WrapState};
use wrapabbr::engine::{ExpandOptions, ExpansionEngine, ExpansionError, Validation};
use wrapabbr::region::Region;

#[test]
fn test_caret_between_tags_wraps_inner_span_only() {
    let harness = Harness::new();
    let mut buffer = html_buffer("<div></div>", Region::point(5));
    let mut session = Session::new();

    let inserted = harness.wrap(&mut buffer, &mut session, "ul>li*2").unwrap();

    assert_eq!(buffer.text(), "<div><ul>\n\t<li></li>\n\t<li></li>\n</ul></div>");
    assert_eq!(inserted, Some(Region::new(5, 37)));
    // Caret lands in the first empty <li>
    assert_eq!(buffer.selection(), Region::point(15));
}

#[test]
fn test_selection_is_deindented_then_reindented() {
    let harness = Harness::new();
    let mut buffer = html_buffer("  <p>hi</p>\n  <p>yo</p>", Region::new(2, 23));
    let mut session = Session::new();

    let handler = harness.command().input(&buffer, &session);
    assert_eq!(
        handler.options().text_lines,
        Some(vec!["<p>hi</p>".to_string(), "<p>yo</p>".to_string()])
    );

    let inserted = harness.wrap(&mut buffer, &mut session, "div").unwrap();
    assert_eq!(
        buffer.text(),
        "  <div>\n  \t<p>hi</p>\n  \t<p>yo</p>\n  </div>"
    );
    assert_eq!(inserted, Some(Region::new(2, 42)));
    assert_eq!(buffer.selection(), Region::point(42));
}

#[test]
fn test_caret_inside_tag_wraps_whole_element() {
    let harness = Harness::new();
    let mut buffer = html_buffer("<p>hi</p>", Region::point(1));
    let mut session = Session::new();

    harness.wrap(&mut buffer, &mut session, "div").unwrap();
    assert_eq!(buffer.text(), "<div><p>hi</p></div>");
}

#[test]
fn test_caret_after_open_tag_wraps_children() {
    let harness = Harness::new();
    let text = "<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>";
    let mut buffer = html_buffer(text, Region::point(4));
    let mut session = Session::new();

    assert_eq!(harness.command().get_range(&buffer), Region::new(7, 34));

    harness.wrap(&mut buffer, &mut session, "ol").unwrap();
    assert_eq!(
        buffer.text(),
        "<ul>\n  <ol>\n  \t<li>one</li>\n  \t<li>two</li>\n  </ol>\n</ul>"
    );
}

#[test]
fn test_unclosed_element_falls_back_to_caret() {
    let harness = Harness::new();
    let mut buffer = html_buffer("<p>text", Region::point(3));
    let mut session = Session::new();

    assert_eq!(harness.command().get_range(&buffer), Region::point(3));
    harness.wrap(&mut buffer, &mut session, "br").unwrap();
    assert_eq!(buffer.text(), "<p><br>text");
}

#[test]
fn test_wrapped_text_keeps_dollar_signs() {
    let harness = Harness::new();
    let mut buffer = html_buffer("<p>$5</p>", Region::new(3, 5));
    let mut session = Session::new();

    harness.wrap(&mut buffer, &mut session, "b").unwrap();
    assert_eq!(buffer.text(), "<p><b>$5</b></p>");
}

#[test]
fn test_xml_document() {
    let harness = Harness::new();
    let mut buffer = Buffer::from_text("<root>x</root>")
        .with_syntax("xml")
        .with_selection(Region::point(6));
    let mut session = Session::new();

    harness.wrap(&mut buffer, &mut session, "item").unwrap();
    assert_eq!(buffer.text(), "<root><item>x</item></root>");
}

#[test]
fn test_stylesheet_abbreviation_is_refused() {
    let harness = Harness::new();
    let mut buffer = Buffer::from_text("abc")
        .with_syntax("css")
        .with_selection(Region::new(0, 3));
    let mut session = Session::new();

    let result = harness.wrap(&mut buffer, &mut session, "div");
    assert!(matches!(result, Err(WrapError::Invalid { .. })));
    assert_eq!(buffer.text(), "abc");
}

#[test]
fn test_session_carries_last_abbreviation() {
    let harness = Harness::new();
    let mut session = Session::new();

    let mut first = html_buffer("<p>a</p>", Region::point(3));
    harness.wrap(&mut first, &mut session, "em").unwrap();

    let second = html_buffer("<p>b</p>", Region::point(3));
    let handler = harness.command().input(&second, &session);
    assert_eq!(handler.initial_text(), Some("em"));

    let fresh = Session::new();
    let handler = harness.command().input(&second, &fresh);
    assert_eq!(handler.initial_text(), None);
}

#[test]
fn test_validate_and_preview_errors() {
    let harness = Harness::new();
    let buffer = html_buffer("<p>hi</p>", Region::point(4));
    let session = Session::new();
    let mut handler = harness.command().input(&buffer, &session);

    assert!(!handler.validate(""));
    assert_eq!(handler.state(), WrapState::AwaitingInput);

    let popup = handler.preview(">>>").unwrap();
    assert!(popup.contains("Invalid abbreviation"));

    let popup = handler.preview("em").unwrap();
    assert!(popup.contains("&lt;em&gt;hi&lt;/em&gt;"));
}

#[test]
fn test_preview_keeps_dollar_digits_in_wrapped_text() {
    let harness = Harness::new();
    let buffer = html_buffer("<p>$5 off</p>", Region::new(3, 9));
    let session = Session::new();
    let mut handler = harness.command().input(&buffer, &session);

    let popup = handler.preview("b").unwrap();
    assert!(popup.contains("&lt;b&gt;$5 off&lt;/b&gt;"));
}

#[test]
fn test_preview_of_deep_nesting_shows_error() {
    let harness = Harness::new();
    let buffer = html_buffer("<p>hi</p>", Region::point(4));
    let session = Session::new();
    let mut handler = harness.command().input(&buffer, &session);

    let abbr = "a>".repeat(3000) + "a";
    assert!(!handler.validate(&abbr));
    assert!(handler.preview(&abbr).unwrap().contains("Invalid abbreviation"));
    assert!(!handler.validate("li*999999999"));
    assert!(handler.preview("li*999999999").unwrap().contains("Invalid abbreviation"));
}

#[test]
fn test_cancel_leaves_buffer_alone() {
    let harness = Harness::new();
    let buffer = html_buffer("<p>hi</p>", Region::point(4));
    let session = Session::new();

    let mut handler = harness.command().input(&buffer, &session);
    handler.preview("div");
    handler.cancel();

    assert_eq!(buffer.text(), "<p>hi</p>");
    assert!(!buffer.modified);
    assert_eq!(session.last_abbreviation(), None);
}

/// Engine that echoes the abbreviation and the wrapped lines.
struct EchoEngine;

impl ExpansionEngine for EchoEngine {
    fn expand(&self, abbreviation: &str, options: &ExpandOptions) -> Result<String, ExpansionError> {
        let lines = options.text_lines.clone().unwrap_or_default();
        Ok(format!("[{}:{}]", abbreviation, lines.join("|")))
    }

    fn validate(&self, abbreviation: &str, _options: &ExpandOptions) -> Validation {
        if abbreviation.contains('!') {
            Validation::invalid(ExpansionError::Unsupported(abbreviation.to_string()))
        } else {
            Validation::ok()
        }
    }
}

#[test]
fn test_custom_engine() {
    let harness = Harness::new();
    let command = wrapabbr::command::WrapWithAbbreviation::new(
        &EchoEngine,
        &harness.classifier,
        &harness.locator,
        &harness.config,
    );
    let mut buffer = html_buffer("<p>a\nb</p>", Region::new(3, 6));
    let mut session = Session::new();

    let mut handler = command.input(&buffer, &session);
    let refused = handler.confirm(&mut buffer, &mut session, "x!");
    assert!(matches!(refused, Err(WrapError::Invalid { error: Some(_), .. })));

    handler.confirm(&mut buffer, &mut session, "x").unwrap();
    assert_eq!(buffer.text(), "<p>[x:a|b]</p>");
    assert_eq!(session.last_abbreviation(), Some("x"));
}
