// src/syntax.rs - Syntax classification at a buffer position

use crate::buffer::EditorView;
use crate::config::WrapConfig;
use crate::region::Region;
use log::trace;
use regex::Regex;
use std::sync::LazyLock;

static STYLE_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>(.*?)(?:</style\s*>|\z)").expect("valid style element regex")
});

static STYLE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid style attribute regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Markup,
    Stylesheet,
}

/// Syntax context at a position. Computed once per invocation and not
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxInfo {
    pub syntax: String,
    pub kind: SyntaxKind,
    /// Position is inside an inline context such as a `style=""` attribute
    pub inline: bool,
}

pub trait SyntaxClassifier {
    fn info(&self, view: &dyn EditorView, pt: usize, default_syntax: &str) -> SyntaxInfo;
    fn is_html(&self, syntax: &str) -> bool;
    fn is_xml(&self, syntax: &str) -> bool;
}

/// Classifies by the view's syntax name, switching to CSS inside embedded
/// `<style>` elements and `style` attributes of markup documents.
#[derive(Debug, Clone)]
pub struct ScopeClassifier {
    markup: Vec<String>,
    xml: Vec<String>,
    stylesheet: Vec<String>,
}

impl ScopeClassifier {
    pub fn new(config: &WrapConfig) -> Self {
        Self {
            markup: config.markup_syntaxes.clone(),
            xml: config.xml_syntaxes.clone(),
            stylesheet: config.stylesheet_syntaxes.clone(),
        }
    }

    fn kind_of(&self, syntax: &str) -> SyntaxKind {
        if self.stylesheet.iter().any(|s| s == syntax) {
            SyntaxKind::Stylesheet
        } else {
            SyntaxKind::Markup
        }
    }
}

impl Default for ScopeClassifier {
    fn default() -> Self {
        Self::new(&WrapConfig::default())
    }
}

impl SyntaxClassifier for ScopeClassifier {
    fn info(&self, view: &dyn EditorView, pt: usize, default_syntax: &str) -> SyntaxInfo {
        let syntax = view.syntax_name().unwrap_or(default_syntax).to_string();

        if self.is_html(&syntax) {
            let text = view.text();
            if let Some(inline) = embedded_stylesheet(&text, pt) {
                trace!("position {} is inside embedded stylesheet", pt);
                return SyntaxInfo {
                    syntax: "css".to_string(),
                    kind: SyntaxKind::Stylesheet,
                    inline,
                };
            }
        }

        SyntaxInfo {
            kind: self.kind_of(&syntax),
            syntax,
            inline: false,
        }
    }

    fn is_html(&self, syntax: &str) -> bool {
        self.markup.iter().any(|s| s == syntax)
    }

    fn is_xml(&self, syntax: &str) -> bool {
        self.xml.iter().any(|s| s == syntax)
    }
}

/// `Some(inline)` when char offset `pt` sits inside CSS embedded in markup.
fn embedded_stylesheet(text: &str, pt: usize) -> Option<bool> {
    let within = |m: regex::Match<'_>| {
        let region = Region::new(
            text[..m.start()].chars().count(),
            text[..m.end()].chars().count(),
        );
        region.begin() <= pt && pt <= region.end()
    };

    for caps in STYLE_ELEMENT.captures_iter(text) {
        if caps.get(1).is_some_and(within) {
            return Some(false);
        }
    }
    for caps in STYLE_ATTRIBUTE.captures_iter(text) {
        if caps.get(1).or_else(|| caps.get(2)).is_some_and(within) {
            return Some(true);
        }
    }
    None
}
