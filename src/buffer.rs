// src/buffer.rs - Rope-backed text buffer and the view primitives commands need

use crate::region::Region;
use log::trace;
use ropey::Rope;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Rope error: {0}")]
    Rope(#[from] ropey::Error),
    #[error("Region {begin}..{end} is outside the buffer (length {len})")]
    OutOfBounds { begin: usize, end: usize, len: usize },
}

/// Read and edit primitives an editor exposes to the wrap command.
///
/// All offsets are character offsets.
pub trait EditorView {
    fn len_chars(&self) -> usize;

    /// Text covered by `region`, clamped to the buffer.
    fn substr(&self, region: Region) -> String;

    /// Region of the line containing `pt`, without its line terminator.
    fn line(&self, pt: usize) -> Region;

    /// Primary selection.
    fn selection(&self) -> Region;

    fn set_selection(&mut self, region: Region);

    /// Name of the syntax assigned to the view, if any.
    fn syntax_name(&self) -> Option<&str>;

    fn replace(&mut self, region: Region, text: &str) -> Result<(), BufferError>;

    fn text(&self) -> String {
        self.substr(Region::new(0, self.len_chars()))
    }
}

pub struct Buffer {
    pub rope: Rope,
    pub file_path: Option<String>,
    pub modified: bool,
    pub version: usize,
    pub selection: Region,
    pub syntax: Option<String>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            rope: Rope::from(""),
            file_path: None,
            modified: false,
            version: 0,
            selection: Region::default(),
            syntax: None,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::new()
        }
    }

    pub fn with_syntax(mut self, syntax: &str) -> Self {
        self.syntax = Some(syntax.to_string());
        self
    }

    pub fn with_selection(mut self, selection: Region) -> Self {
        self.selection = selection.clamp(self.rope.len_chars());
        self
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BufferError> {
        let content = fs::read_to_string(path.as_ref())?;
        self.rope = Rope::from_str(&content);
        self.file_path = Some(path.as_ref().to_string_lossy().to_string());
        self.modified = false;
        self.version = 0;
        self.selection = Region::default();

        if let Some(extension) = path.as_ref().extension() {
            self.syntax = syntax_for_extension(&extension.to_string_lossy()).map(str::to_string);
        }

        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BufferError> {
        fs::write(path.as_ref(), self.rope.to_string())?;
        self.file_path = Some(path.as_ref().to_string_lossy().to_string());
        self.modified = false;
        Ok(())
    }
}

/// Syntax name for a file extension.
pub fn syntax_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" | "xhtml" => Some("html"),
        "xml" | "xsd" | "svg" => Some("xml"),
        "xsl" | "xslt" => Some("xsl"),
        "jsx" | "tsx" => Some("jsx"),
        "vue" => Some("vue"),
        "css" => Some("css"),
        "scss" => Some("scss"),
        "sass" => Some("sass"),
        "less" => Some("less"),
        _ => None,
    }
}

impl EditorView for Buffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn substr(&self, region: Region) -> String {
        let region = region.clamp(self.rope.len_chars());
        self.rope.slice(region.begin()..region.end()).to_string()
    }

    fn line(&self, pt: usize) -> Region {
        let pt = pt.min(self.rope.len_chars());
        let line_idx = self.rope.char_to_line(pt);
        let start = self.rope.line_to_char(line_idx);
        let line = self.rope.line(line_idx);
        let mut len = line.len_chars();
        // Drop the terminator: "\n", "\r\n" or a lone "\r"
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
        }
        if len > 0 && line.char(len - 1) == '\r' {
            len -= 1;
        }
        Region::new(start, start + len)
    }

    fn selection(&self) -> Region {
        self.selection
    }

    fn set_selection(&mut self, region: Region) {
        self.selection = region.clamp(self.rope.len_chars());
    }

    fn syntax_name(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    fn replace(&mut self, region: Region, text: &str) -> Result<(), BufferError> {
        let len = self.rope.len_chars();
        if region.end() > len {
            return Err(BufferError::OutOfBounds {
                begin: region.begin(),
                end: region.end(),
                len,
            });
        }
        trace!("replace {}..{} with {} chars", region.begin(), region.end(), text.chars().count());
        self.rope.try_remove(region.begin()..region.end())?;
        self.rope.try_insert(region.begin(), text)?;
        self.modified = true;
        self.version += 1;
        Ok(())
    }
}

#[test]
fn test_line_region() {
    let buffer = Buffer::from_text("one\r\n  two\nthree");
    assert_eq!(buffer.line(0), Region::new(0, 3));
    assert_eq!(buffer.line(7), Region::new(5, 10));
    assert_eq!(buffer.substr(buffer.line(7)), "  two");
    assert_eq!(buffer.line(16), Region::new(11, 16));
}

#[test]
fn test_replace_region() {
    let mut buffer = Buffer::from_text("<div>old</div>");
    buffer.replace(Region::new(5, 8), "new text").unwrap();
    assert_eq!(buffer.text(), "<div>new text</div>");
    assert_eq!(buffer.version, 1);
}

#[test]
fn test_replace_out_of_bounds() {
    let mut buffer = Buffer::from_text("abc");
    let result = buffer.replace(Region::new(1, 10), "x");
    assert!(matches!(result, Err(BufferError::OutOfBounds { len: 3, .. })));
    assert_eq!(buffer.text(), "abc");
}

#[test]
fn test_load_and_save() {
    use tempfile::Builder;
    let temp_file = Builder::new().suffix(".html").tempfile().unwrap();
    fs::write(temp_file.path(), "<ul>\n  <li></li>\n</ul>").unwrap();

    let mut buffer = Buffer::new();
    buffer.load_from_file(temp_file.path()).unwrap();
    assert_eq!(buffer.rope.len_lines(), 3);
    assert_eq!(buffer.syntax_name(), Some("html"));

    let save_file = tempfile::NamedTempFile::new().unwrap();
    buffer.save_to_file(save_file.path()).unwrap();
    let content = fs::read_to_string(save_file.path()).unwrap();
    assert_eq!(content, "<ul>\n  <li></li>\n</ul>");
}
