// src/region.rs - Character-offset regions over a buffer

use crate::buffer::EditorView;

/// A span of text between two character offsets.
///
/// `a` is the anchor and `b` the caret, so a selection keeps its direction;
/// `begin()` and `end()` always return the ordered bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub a: usize,
    pub b: usize,
}

impl Region {
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// Empty region at `pt`
    pub fn point(pt: usize) -> Self {
        Self { a: pt, b: pt }
    }

    pub fn begin(&self) -> usize {
        self.a.min(self.b)
    }

    pub fn end(&self) -> usize {
        self.a.max(self.b)
    }

    pub fn len(&self) -> usize {
        self.end() - self.begin()
    }

    pub fn is_empty(&self) -> bool {
        self.a == self.b
    }

    /// True when `pt` lies strictly inside the region, boundaries excluded.
    pub fn contains_strict(&self, pt: usize) -> bool {
        self.begin() < pt && pt < self.end()
    }

    /// Same region with the bounds clamped to `len`.
    pub fn clamp(&self, len: usize) -> Self {
        Self::new(self.begin().min(len), self.end().min(len))
    }
}

/// Shrink `region` so it starts and ends on non-whitespace characters.
///
/// A region made only of whitespace collapses to an empty region at its start.
pub fn narrow_to_non_space<V: EditorView + ?Sized>(view: &V, region: Region) -> Region {
    let chars: Vec<char> = view.substr(region).chars().collect();

    let leading = chars.iter().take_while(|c| c.is_whitespace()).count();
    if leading == chars.len() {
        return Region::point(region.begin());
    }
    let trailing = chars.iter().rev().take_while(|c| c.is_whitespace()).count();

    Region::new(region.begin() + leading, region.begin() + chars.len() - trailing)
}
