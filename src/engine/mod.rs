// src/engine/mod.rs - Abbreviation expansion engine interface

pub mod basic;

pub use basic::BasicEngine;

use crate::syntax::{SyntaxInfo, SyntaxKind};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("{message} at {position}")]
    Parse { message: String, position: usize },
    #[error("Unsupported abbreviation: {0}")]
    Unsupported(String),
}

/// Options passed to every expand/validate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    pub syntax: String,
    pub kind: SyntaxKind,
    /// De-indented lines of the text being wrapped
    pub text_lines: Option<Vec<String>>,
    /// Render for display only: no tab-stop fields
    pub preview: bool,
}

impl ExpandOptions {
    pub fn from_syntax(info: &SyntaxInfo) -> Self {
        Self {
            syntax: info.syntax.clone(),
            kind: info.kind,
            text_lines: None,
            preview: false,
        }
    }

    pub fn with_text(mut self, lines: Vec<String>) -> Self {
        self.text_lines = Some(lines);
        self
    }

    /// Copy of these options with preview rendering switched on
    pub fn for_preview(&self) -> Self {
        Self {
            preview: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Validation {
    pub valid: bool,
    pub error: Option<ExpansionError>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: ExpansionError) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

pub trait ExpansionEngine {
    fn expand(&self, abbreviation: &str, options: &ExpandOptions) -> Result<String, ExpansionError>;
    fn validate(&self, abbreviation: &str, options: &ExpandOptions) -> Validation;
}
