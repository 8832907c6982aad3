// src/snippet.rs - Tab-stop snippets: field resolution and insertion

use crate::buffer::{BufferError, EditorView};
use crate::content::line_indent;
use crate::region::Region;
use log::debug;

/// Snippet text with fields resolved to their placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSnippet {
    pub text: String,
    /// Char offset of the first tab stop (lowest non-zero number, else `$0`)
    pub first_field: Option<usize>,
}

/// Resolve `$1`, `${1}` and `${1:placeholder}` fields and unescape `\$`,
/// `\}` and `\\`.
pub fn resolve_fields(snippet: &str) -> ResolvedSnippet {
    let chars: Vec<char> = snippet.chars().collect();
    let mut pos = 0;
    let mut fields = Vec::new();
    let mut text = String::new();
    resolve_into(&chars, &mut pos, false, &mut text, &mut fields);

    let first_field = fields
        .iter()
        .filter(|(n, _)| *n > 0)
        .min_by_key(|(n, _)| *n)
        .or_else(|| fields.iter().find(|(n, _)| *n == 0))
        .map(|(_, offset)| *offset);

    ResolvedSnippet { text, first_field }
}

fn take_number(chars: &[char], pos: &mut usize) -> usize {
    let mut n = 0usize;
    while let Some(d) = chars.get(*pos).and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        *pos += 1;
    }
    n
}

fn resolve_into(
    chars: &[char],
    pos: &mut usize,
    nested: bool,
    out: &mut String,
    fields: &mut Vec<(usize, usize)>,
) {
    while let Some(&c) = chars.get(*pos) {
        match c {
            '\\' if matches!(chars.get(*pos + 1), Some('$' | '}' | '\\')) => {
                out.push(chars[*pos + 1]);
                *pos += 2;
            }
            '}' if nested => {
                *pos += 1;
                return;
            }
            '$' if chars.get(*pos + 1).is_some_and(char::is_ascii_digit) => {
                *pos += 1;
                let n = take_number(chars, pos);
                fields.push((n, out.chars().count()));
            }
            '$' if chars.get(*pos + 1) == Some(&'{')
                && chars.get(*pos + 2).is_some_and(char::is_ascii_digit) =>
            {
                *pos += 2;
                let n = take_number(chars, pos);
                fields.push((n, out.chars().count()));
                match chars.get(*pos) {
                    Some(':') => {
                        *pos += 1;
                        resolve_into(chars, pos, true, out, fields);
                    }
                    Some('}') => *pos += 1,
                    _ => {}
                }
            }
            _ => {
                out.push(c);
                *pos += 1;
            }
        }
    }
}

/// Prefix every line after the first with `indent`; blank lines stay blank.
pub fn indent_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace `region` with `snippet`, matching the indentation of the line it
/// starts on, and put the caret on the first tab stop.
///
/// Returns the region covered by the inserted text.
pub fn replace_with_snippet<V: EditorView + ?Sized>(
    view: &mut V,
    region: Region,
    snippet: &str,
) -> Result<Region, BufferError> {
    let base_line = view.substr(view.line(region.begin()));
    let indented = indent_lines(snippet, line_indent(&base_line));
    let resolved = resolve_fields(&indented);

    view.replace(region, &resolved.text)?;

    let inserted = Region::new(
        region.begin(),
        region.begin() + resolved.text.chars().count(),
    );
    let caret = resolved
        .first_field
        .map_or(inserted.end(), |offset| region.begin() + offset);
    debug!("inserted snippet at {:?}, caret at {}", inserted, caret);
    view.set_selection(Region::point(caret));
    Ok(inserted)
}
