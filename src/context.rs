// src/context.rs - Tag context lookup around the cursor

use crate::buffer::EditorView;
use crate::region::{Region, narrow_to_non_space};
use crate::syntax::{SyntaxClassifier, SyntaxInfo};
use log::{debug, trace};
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?(?:-->|\z)|<!\[CDATA\[.*?(?:\]\]>|\z)|<[!?][^>]*>|<(/)?([A-Za-z][\w:.\-]*)((?:"[^"]*"|'[^']*'|[^'">])*?)(/)?>"#,
    )
    .expect("valid tag regex")
});

/// HTML elements that never have a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Open/close tag pair enclosing a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagContext {
    pub name: String,
    pub open: Region,
    /// Absent for self-closing, void and unclosed tags
    pub close: Option<Region>,
}

pub trait TagLocator {
    fn get_tag_context(&self, view: &dyn EditorView, pt: usize, is_xml: bool) -> Option<TagContext>;
}

/// Regex-driven tag scanner: pairs open and close tags with a stack and
/// picks the innermost element around the position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupTagLocator;

#[derive(Debug)]
struct Tag {
    name: String,
    region: Region,
    closing: bool,
    self_closing: bool,
}

/// Maps increasing byte offsets to char offsets in one pass.
struct CharCounter<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, byte: 0, chars: 0 }
    }

    fn at(&mut self, byte: usize) -> usize {
        if byte < self.byte {
            self.byte = 0;
            self.chars = 0;
        }
        self.chars += self.text[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}

fn scan_tags(text: &str) -> Vec<Tag> {
    let mut counter = CharCounter::new(text);
    let mut tags = Vec::new();

    for caps in TAG.captures_iter(text) {
        // Comments, CDATA, doctype and processing instructions carry no name
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let begin = counter.at(whole.start());
        let end = counter.at(whole.end());
        tags.push(Tag {
            name: name.as_str().to_string(),
            region: Region::new(begin, end),
            closing: caps.get(1).is_some(),
            self_closing: caps.get(4).is_some(),
        });
    }
    tags
}

fn same_name(a: &str, b: &str, is_xml: bool) -> bool {
    if is_xml { a == b } else { a.eq_ignore_ascii_case(b) }
}

fn pair_tags(tags: Vec<Tag>, is_xml: bool) -> Vec<TagContext> {
    let mut stack: Vec<TagContext> = Vec::new();
    let mut elements = Vec::new();

    for tag in tags {
        if tag.closing {
            let Some(idx) = stack.iter().rposition(|el| same_name(&el.name, &tag.name, is_xml))
            else {
                trace!("stray closing tag </{}>", tag.name);
                continue;
            };
            // Anything opened after the match is left unclosed
            elements.extend(stack.drain(idx + 1..));
            if let Some(mut el) = stack.pop() {
                el.close = Some(tag.region);
                elements.push(el);
            }
        } else {
            let el = TagContext {
                name: tag.name,
                open: tag.region,
                close: None,
            };
            if tag.self_closing || (!is_xml && is_void_element(&el.name)) {
                elements.push(el);
            } else {
                stack.push(el);
            }
        }
    }
    elements.extend(stack);
    elements
}

impl TagLocator for MarkupTagLocator {
    fn get_tag_context(&self, view: &dyn EditorView, pt: usize, is_xml: bool) -> Option<TagContext> {
        let text = view.text();
        let elements = pair_tags(scan_tags(&text), is_xml);

        if let Some(el) = elements.iter().find(|el| {
            el.open.contains_strict(pt) || el.close.is_some_and(|c| c.contains_strict(pt))
        }) {
            return Some(el.clone());
        }

        elements
            .into_iter()
            .filter(|el| {
                el.close
                    .is_some_and(|close| el.open.end() <= pt && pt <= close.begin())
            })
            .max_by_key(|el| el.open.begin())
    }
}

/// Range the wrap command should replace for a cursor at `pt`.
///
/// Inside an open or close tag the whole element is returned (or just the
/// open tag when unpaired). Between paired tags the inner content is
/// returned, narrowed to non-whitespace. `None` when there is no usable
/// tag context or the syntax is not markup.
pub fn find_context_tag(
    view: &dyn EditorView,
    pt: usize,
    syntax_info: &SyntaxInfo,
    classifier: &dyn SyntaxClassifier,
    locator: &dyn TagLocator,
) -> Option<Region> {
    let syntax_name = syntax_info.syntax.as_str();
    if !classifier.is_html(syntax_name) {
        return None;
    }

    let ctx = locator.get_tag_context(view, pt, classifier.is_xml(syntax_name))?;
    debug!("tag context <{}> at {:?}/{:?}", ctx.name, ctx.open, ctx.close);

    let in_close = ctx.close.is_some_and(|close| close.contains_strict(pt));
    if ctx.open.contains_strict(pt) || in_close {
        let end = ctx.close.map_or(ctx.open.end(), |close| close.end());
        return Some(Region::new(ctx.open.begin(), end.max(ctx.open.begin())));
    }

    let close = ctx.close?;
    let inner = Region::new(ctx.open.end(), close.begin().max(ctx.open.end()));
    Some(narrow_to_non_space(view, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::syntax::ScopeClassifier;

    fn resolve(text: &str, pt: usize) -> Option<Region> {
        let buffer = Buffer::from_text(text);
        let classifier = ScopeClassifier::default();
        let info = classifier.info(&buffer, pt, "html");
        find_context_tag(&buffer, pt, &info, &classifier, &MarkupTagLocator)
    }

    #[test]
    fn test_empty_element_inner_region() {
        assert_eq!(resolve("<div></div>", 5), Some(Region::point(5)));
    }

    #[test]
    fn test_inside_open_tag_wraps_element() {
        let text = "<ul><li class=\"a\">x</li></ul>";
        assert_eq!(resolve(text, 7), Some(Region::new(4, 24)));
    }

    #[test]
    fn test_inside_close_tag_wraps_element() {
        let text = "<p>hi</p>";
        assert_eq!(resolve(text, 7), Some(Region::new(0, 9)));
    }

    #[test]
    fn test_inner_region_is_trimmed() {
        let text = "<div>\n  <p>a</p>\n</div>";
        assert_eq!(resolve(text, 6), Some(Region::new(8, 16)));
    }

    #[test]
    fn test_innermost_element_wins() {
        let text = "<section><article>text</article></section>";
        assert_eq!(resolve(text, 20), Some(Region::new(18, 22)));
    }

    #[test]
    fn test_unpaired_tag_returns_open_tag() {
        let text = "<div><img src=\"a.png\"></div>";
        assert_eq!(resolve(text, 8), Some(Region::new(5, 22)));

        let text = "<p>text<br/>more</p>";
        assert_eq!(resolve(text, 10), Some(Region::new(7, 12)));
    }

    #[test]
    fn test_unclosed_element_between_tags_is_none() {
        assert_eq!(resolve("<div>text", 7), None);
    }

    #[test]
    fn test_no_tags() {
        assert_eq!(resolve("plain text", 3), None);
    }

    #[test]
    fn test_comments_are_ignored() {
        let text = "<p><!-- <b> --></p>";
        assert_eq!(resolve(text, 10), Some(Region::new(3, 15)));
    }

    #[test]
    fn test_attribute_with_angle_bracket() {
        let text = "<a title=\"x > y\">go</a>";
        assert_eq!(resolve(text, 5), Some(Region::new(0, 23)));
    }

    #[test]
    fn test_non_markup_syntax() {
        let buffer = Buffer::from_text("<div></div>").with_syntax("css");
        let classifier = ScopeClassifier::default();
        let info = classifier.info(&buffer, 5, "html");
        assert_eq!(
            find_context_tag(&buffer, 5, &info, &classifier, &MarkupTagLocator),
            None
        );
    }

    #[test]
    fn test_xml_is_case_sensitive() {
        let buffer = Buffer::from_text("<Item><item>a</Item>");
        let ctx = MarkupTagLocator.get_tag_context(&buffer, 13, true).unwrap();
        assert_eq!(ctx.name, "Item");
        assert_eq!(ctx.close, Some(Region::new(13, 20)));
    }
}
