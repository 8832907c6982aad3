// Shared fixtures for wrap command integration tests

use wrapabbr::buffer::Buffer;
use wrapabbr::command::{Session, WrapError, WrapWithAbbreviation};
use wrapabbr::config::WrapConfig;
use wrapabbr::context::MarkupTagLocator;
use wrapabbr::engine::BasicEngine;
use wrapabbr::region::Region;
use wrapabbr::syntax::ScopeClassifier;

/// Collaborators for one command, owned so tests can borrow them.
pub struct Harness {
    pub engine: BasicEngine,
    pub classifier: ScopeClassifier,
    pub locator: MarkupTagLocator,
    pub config: WrapConfig,
}

impl Harness {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_config(WrapConfig::default())
    }

    #[allow(dead_code)]
    pub fn with_config(config: WrapConfig) -> Self {
        Self {
            engine: BasicEngine::from_config(&config),
            classifier: ScopeClassifier::new(&config),
            locator: MarkupTagLocator,
            config,
        }
    }

    pub fn command(&self) -> WrapWithAbbreviation<'_> {
        WrapWithAbbreviation::new(&self.engine, &self.classifier, &self.locator, &self.config)
    }

    /// Open an input session on `buffer` and confirm `abbreviation`.
    #[allow(dead_code)]
    pub fn wrap(
        &self,
        buffer: &mut Buffer,
        session: &mut Session,
        abbreviation: &str,
    ) -> Result<Option<Region>, WrapError> {
        let mut handler = self.command().input(&*buffer, &*session);
        handler.confirm(buffer, session, abbreviation)
    }
}

/// HTML buffer with the given selection.
#[allow(dead_code)]
pub fn html_buffer(text: &str, selection: Region) -> Buffer {
    Buffer::from_text(text)
        .with_syntax("html")
        .with_selection(selection)
}
