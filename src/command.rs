// src/command.rs - Wrap-with-abbreviation command and its input handler

use crate::buffer::{BufferError, EditorView};
use crate::config::WrapConfig;
use crate::content::get_content_lines;
use crate::context::{TagLocator, find_context_tag};
use crate::engine::{ExpandOptions, ExpansionEngine, ExpansionError};
use crate::preview::{ERROR_FRAGMENT, PreviewCache, format_snippet, popup_content};
use crate::region::Region;
use crate::snippet::replace_with_snippet;
use crate::syntax::SyntaxClassifier;
use log::{debug, trace};

pub const PLACEHOLDER: &str = "Enter abbreviation";

#[derive(thiserror::Error, Debug)]
pub enum WrapError {
    #[error("Expansion failed: {0}")]
    Expansion(#[from] ExpansionError),
    #[error("Invalid abbreviation '{abbreviation}'")]
    Invalid {
        abbreviation: String,
        error: Option<ExpansionError>,
    },
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// State carried between invocations: the last committed abbreviation.
///
/// Lives as long as the value does; nothing is written to disk.
#[derive(Debug, Clone, Default)]
pub struct Session {
    last_abbreviation: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_abbreviation(&self) -> Option<&str> {
        self.last_abbreviation.as_deref()
    }

    pub fn remember(&mut self, abbreviation: &str) {
        self.last_abbreviation = Some(abbreviation.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapState {
    AwaitingInput,
    Validating,
    Previewing,
    Committing,
    Idle,
}

/// The command: resolves what to wrap and hands out input handlers.
pub struct WrapWithAbbreviation<'a> {
    engine: &'a dyn ExpansionEngine,
    classifier: &'a dyn SyntaxClassifier,
    locator: &'a dyn TagLocator,
    default_syntax: String,
    preview_cache_size: usize,
}

impl<'a> WrapWithAbbreviation<'a> {
    pub fn new(
        engine: &'a dyn ExpansionEngine,
        classifier: &'a dyn SyntaxClassifier,
        locator: &'a dyn TagLocator,
        config: &WrapConfig,
    ) -> Self {
        Self {
            engine,
            classifier,
            locator,
            default_syntax: config.default_syntax.clone(),
            preview_cache_size: config.preview_cache_size,
        }
    }

    /// Region the abbreviation will wrap: the selection when non-empty,
    /// else the tag context around the caret, else the empty selection.
    pub fn get_range(&self, view: &dyn EditorView) -> Region {
        let sel = view.selection();
        if !sel.is_empty() {
            return sel;
        }
        let info = self.classifier.info(view, sel.begin(), &self.default_syntax);
        find_context_tag(view, sel.begin(), &info, self.classifier, self.locator).unwrap_or(sel)
    }

    /// Start an input session for `view`.
    pub fn input(&self, view: &dyn EditorView, session: &Session) -> WrapInputHandler<'a> {
        let sel = view.selection();
        let region = self.get_range(view);
        let lines = get_content_lines(view, region);
        let info = self.classifier.info(view, sel.begin(), &self.default_syntax);
        debug!(
            "wrap target {:?} ({} lines, syntax {})",
            region,
            lines.len(),
            info.syntax
        );
        let options = ExpandOptions::from_syntax(&info).with_text(lines);

        WrapInputHandler {
            engine: self.engine,
            region,
            preview_options: options.for_preview(),
            options,
            initial_text: session.last_abbreviation().map(str::to_string),
            cache: PreviewCache::new(self.preview_cache_size),
            state: WrapState::AwaitingInput,
        }
    }

    /// Expand `abbreviation` and replace `region` with the result. Empty
    /// abbreviations do nothing. Returns the inserted region.
    pub fn run(
        &self,
        view: &mut dyn EditorView,
        session: &mut Session,
        region: Region,
        options: &ExpandOptions,
        abbreviation: &str,
    ) -> Result<Option<Region>, WrapError> {
        commit(self.engine, view, session, region, options, abbreviation)
    }
}

fn commit(
    engine: &dyn ExpansionEngine,
    view: &mut dyn EditorView,
    session: &mut Session,
    region: Region,
    options: &ExpandOptions,
    abbreviation: &str,
) -> Result<Option<Region>, WrapError> {
    if abbreviation.is_empty() {
        return Ok(None);
    }
    let snippet = engine.expand(abbreviation, options)?;
    let inserted = replace_with_snippet(view, region, &snippet)?;
    session.remember(abbreviation);
    debug!("wrapped {:?} with '{}'", region, abbreviation);
    Ok(Some(inserted))
}

/// Per-invocation input state: validates and previews keystrokes, then
/// commits or is dropped.
pub struct WrapInputHandler<'a> {
    engine: &'a dyn ExpansionEngine,
    region: Region,
    options: ExpandOptions,
    preview_options: ExpandOptions,
    initial_text: Option<String>,
    cache: PreviewCache,
    state: WrapState,
}

impl<'a> WrapInputHandler<'a> {
    pub fn placeholder(&self) -> &'static str {
        PLACEHOLDER
    }

    /// Last committed abbreviation, if any.
    pub fn initial_text(&self) -> Option<&str> {
        self.initial_text.as_deref()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    pub fn state(&self) -> WrapState {
        self.state
    }

    pub fn validate(&mut self, text: &str) -> bool {
        self.state = WrapState::Validating;
        let validation = self.engine.validate(text, &self.preview_options);
        trace!("validate '{}': {}", text, validation.valid);
        if !validation.valid {
            self.state = WrapState::AwaitingInput;
        }
        validation.valid
    }

    /// Popup body for `text`, or `None` for blank input. Expansion errors
    /// become the error fragment.
    pub fn preview(&mut self, text: &str) -> Option<String> {
        let abbr = text.trim();
        if abbr.is_empty() {
            self.state = WrapState::AwaitingInput;
            return None;
        }

        if let Some(popup) = self.cache.get(abbr) {
            trace!("preview cache hit for '{}'", abbr);
            self.state = WrapState::Previewing;
            return Some(popup);
        }

        let fragment = match self.engine.expand(abbr, &self.preview_options) {
            Ok(result) => format_snippet(&result),
            Err(err) => {
                debug!("preview of '{}' failed: {}", abbr, err);
                ERROR_FRAGMENT.to_string()
            }
        };
        let popup = popup_content(&fragment);
        self.cache.put(abbr, popup.clone());
        self.state = WrapState::Previewing;
        Some(popup)
    }

    /// Expand for real and replace the target region. Invalid abbreviations
    /// are refused without touching the view.
    pub fn confirm(
        &mut self,
        view: &mut dyn EditorView,
        session: &mut Session,
        text: &str,
    ) -> Result<Option<Region>, WrapError> {
        if text.is_empty() {
            self.state = WrapState::Idle;
            return Ok(None);
        }
        let validation = self.engine.validate(text, &self.options);
        if !validation.valid {
            self.state = WrapState::AwaitingInput;
            return Err(WrapError::Invalid {
                abbreviation: text.to_string(),
                error: validation.error,
            });
        }
        self.state = WrapState::Committing;
        let result = commit(self.engine, view, session, self.region, &self.options, text);
        self.state = WrapState::Idle;
        result
    }

    /// Abandon the input; nothing is changed.
    pub fn cancel(self) {
        trace!("wrap input cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::context::MarkupTagLocator;
    use crate::engine::BasicEngine;
    use crate::syntax::ScopeClassifier;

    struct Fixture {
        engine: BasicEngine,
        classifier: ScopeClassifier,
        locator: MarkupTagLocator,
        config: WrapConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                engine: BasicEngine::default(),
                classifier: ScopeClassifier::default(),
                locator: MarkupTagLocator,
                config: WrapConfig::default(),
            }
        }

        fn command(&self) -> WrapWithAbbreviation<'_> {
            WrapWithAbbreviation::new(&self.engine, &self.classifier, &self.locator, &self.config)
        }
    }

    #[test]
    fn test_session_remembers_last() {
        let mut session = Session::new();
        assert_eq!(session.last_abbreviation(), None);
        session.remember("ul>li");
        session.remember("div");
        assert_eq!(session.last_abbreviation(), Some("div"));
    }

    #[test]
    fn test_range_uses_selection_when_not_empty() {
        let fixture = Fixture::new();
        let buffer = Buffer::from_text("<div>text</div>").with_selection(Region::new(5, 9));
        assert_eq!(fixture.command().get_range(&buffer), Region::new(5, 9));
    }

    #[test]
    fn test_range_falls_back_to_caret() {
        let fixture = Fixture::new();
        let buffer = Buffer::from_text("plain text").with_selection(Region::point(3));
        assert_eq!(fixture.command().get_range(&buffer), Region::point(3));
    }

    #[test]
    fn test_input_collects_options() {
        let fixture = Fixture::new();
        let buffer =
            Buffer::from_text("<div>\n  <p>a</p>\n  <p>b</p>\n</div>").with_selection(Region::point(5));
        let mut session = Session::new();
        session.remember("ul");

        let handler = fixture.command().input(&buffer, &session);
        assert_eq!(handler.region(), Region::new(8, 27));
        assert_eq!(
            handler.options().text_lines,
            Some(vec!["<p>a</p>".to_string(), "<p>b</p>".to_string()])
        );
        assert!(!handler.options().preview);
        assert_eq!(handler.initial_text(), Some("ul"));
        assert_eq!(handler.placeholder(), "Enter abbreviation");
        assert_eq!(handler.state(), WrapState::AwaitingInput);
    }

    #[test]
    fn test_validate_and_preview() {
        let fixture = Fixture::new();
        let buffer = Buffer::from_text("<p>hi</p>").with_selection(Region::point(4));
        let mut handler = fixture.command().input(&buffer, &Session::new());

        assert!(!handler.validate(""));
        assert!(handler.preview("").is_none());
        assert!(handler.preview("   ").is_none());

        assert!(handler.validate("b"));
        let popup = handler.preview("b").unwrap();
        assert!(popup.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert_eq!(handler.state(), WrapState::Previewing);

        assert!(!handler.validate(">>>"));
        let popup = handler.preview(">>>").unwrap();
        assert!(popup.contains("Invalid abbreviation"));
    }

    #[test]
    fn test_preview_is_cached() {
        let fixture = Fixture::new();
        let buffer = Buffer::from_text("x").with_selection(Region::new(0, 1));
        let mut handler = fixture.command().input(&buffer, &Session::new());
        let first = handler.preview("em").unwrap();
        assert_eq!(handler.cache.len(), 1);
        let second = handler.preview(" em ").unwrap();
        assert_eq!(first, second);
        assert_eq!(handler.cache.len(), 1);
    }

    #[test]
    fn test_confirm_replaces_and_remembers() {
        let fixture = Fixture::new();
        let mut buffer = Buffer::from_text("<p>hi</p>").with_selection(Region::point(4));
        let mut session = Session::new();

        let mut handler = fixture.command().input(&buffer, &session);
        let inserted = handler.confirm(&mut buffer, &mut session, "b").unwrap();

        assert_eq!(handler.state(), WrapState::Idle);
        assert_eq!(buffer.text(), "<p><b>hi</b></p>");
        assert_eq!(inserted, Some(Region::new(3, 12)));
        assert_eq!(session.last_abbreviation(), Some("b"));
    }

    #[test]
    fn test_confirm_empty_is_noop() {
        let fixture = Fixture::new();
        let mut buffer = Buffer::from_text("<p>hi</p>").with_selection(Region::point(4));
        let mut session = Session::new();

        let mut handler = fixture.command().input(&buffer, &session);
        assert!(handler.confirm(&mut buffer, &mut session, "").unwrap().is_none());
        assert_eq!(buffer.text(), "<p>hi</p>");
        assert_eq!(session.last_abbreviation(), None);
    }

    #[test]
    fn test_confirm_invalid_is_refused() {
        let fixture = Fixture::new();
        let mut buffer = Buffer::from_text("<p>hi</p>").with_selection(Region::point(4));
        let mut session = Session::new();

        let mut handler = fixture.command().input(&buffer, &session);
        let result = handler.confirm(&mut buffer, &mut session, "div>");
        assert!(matches!(result, Err(WrapError::Invalid { .. })));
        assert_eq!(buffer.text(), "<p>hi</p>");
        assert_eq!(session.last_abbreviation(), None);
    }

    #[test]
    fn test_run_propagates_expansion_error() {
        let fixture = Fixture::new();
        let mut buffer = Buffer::from_text("text");
        let mut session = Session::new();
        let command = fixture.command();
        let options = ExpandOptions::from_syntax(&crate::syntax::SyntaxInfo {
            syntax: "html".to_string(),
            kind: crate::syntax::SyntaxKind::Markup,
            inline: false,
        });

        let result = command.run(&mut buffer, &mut session, Region::new(0, 4), &options, "(");
        assert!(matches!(result, Err(WrapError::Expansion(_))));
        assert_eq!(buffer.text(), "text");
    }
}
