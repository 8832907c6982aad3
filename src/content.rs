// src/content.rs - Region content extraction with indentation removed

use crate::buffer::EditorView;
use crate::region::Region;
use regex::Regex;
use std::sync::LazyLock;

static INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+").expect("valid indent regex"));

/// Leading whitespace of `line`, or `""`.
pub fn line_indent(line: &str) -> &str {
    INDENT.find(line).map_or("", |m| m.as_str())
}

/// Contents of `region` as lines, de-indented.
///
/// The indent is taken from the buffer line holding `region.begin()`. Every
/// line after the first loses that exact prefix if it starts with it; lines
/// with any other indentation are kept as they are.
pub fn get_content_lines<V: EditorView + ?Sized>(view: &V, region: Region) -> Vec<String> {
    let base_line = view.substr(view.line(region.begin()));
    let indent = line_indent(&base_line);
    strip_indent(&view.substr(region), indent)
}

/// Contents of `region` de-indented and joined with `\n`.
pub fn get_content<V: EditorView + ?Sized>(view: &V, region: Region) -> String {
    get_content_lines(view, region).join("\n")
}

/// Split `text` into lines and remove `indent` from each line but the first.
pub fn strip_indent(text: &str, indent: &str) -> Vec<String> {
    let mut dest_lines: Vec<String> = Vec::new();

    for line in split_lines(text) {
        let line = match line.strip_prefix(indent) {
            Some(rest) if !dest_lines.is_empty() => rest,
            _ => line,
        };
        dest_lines.push(line.to_string());
    }
    dest_lines
}

/// Split on line boundaries: `\n`, `\r\n`, `\r`, vertical tab, form feed,
/// the file/group/record separators, NEL and the Unicode line and paragraph
/// separators. A trailing terminator does not start another line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && chars.peek().is_some_and(|&(_, next)| next == '\n') {
            chars.next();
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}
