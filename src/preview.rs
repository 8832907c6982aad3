// src/preview.rs - Popup HTML for live abbreviation previews

use crate::snippet::resolve_fields;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Fragment shown when the abbreviation cannot be expanded.
pub const ERROR_FRAGMENT: &str = r#"<div class="error">Invalid abbreviation</div>"#;

const TAB_WIDTH: usize = 4;

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Expanded snippet as popup markup: fields resolved, markup escaped,
/// indentation kept with `&nbsp;` and lines joined with `<br>`.
pub fn format_snippet(snippet: &str) -> String {
    let resolved = resolve_fields(snippet);
    resolved
        .text
        .split('\n')
        .map(|line| {
            let body = line.trim_start_matches([' ', '\t']);
            let width: usize = line[..line.len() - body.len()]
                .chars()
                .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
                .sum();
            format!("{}{}", "&nbsp;".repeat(width), escape_html(body))
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Wrap a fragment in the popup's style template.
pub fn popup_content(content: &str) -> String {
    format!(
        r#"
    <body>
        <style>
            body {{ font-size: 0.8rem; }}
            .error {{ color: red }}
        </style>
        <div>{content}</div>
    </body>
    "#
    )
}

/// Rendered popups keyed by abbreviation, for one input session.
#[derive(Debug)]
pub struct PreviewCache {
    cache: LruCache<String, String>,
}

impl PreviewCache {
    pub fn new(max_size: usize) -> Self {
        let size = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(size),
        }
    }

    pub fn get(&mut self, abbreviation: &str) -> Option<String> {
        self.cache.get(abbreviation).cloned()
    }

    pub fn put(&mut self, abbreviation: &str, popup: String) {
        self.cache.put(abbreviation.to_string(), popup);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new(32)
    }
}
