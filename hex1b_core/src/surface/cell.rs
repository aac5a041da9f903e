//! A single styled terminal cell.

use compact_str::CompactString;

bitflags::bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
  pub struct CellAttrs: u16 {
    const BOLD          = 0b0000_0001;
    const ITALIC        = 0b0000_0010;
    const UNDERLINE     = 0b0000_0100;
    const REVERSE       = 0b0000_1000;
    const DIM           = 0b0001_0000;
    const STRIKETHROUGH = 0b0010_0000;
    const BLINK         = 0b0100_0000;
    const SOFT_WRAP      = 0b1000_0000;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Default for Color {
  fn default() -> Self {
    Color(0, 0, 0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
  symbol: CompactString,
  fg: Option<Color>,
  bg: Option<Color>,
  attrs: CellAttrs,
  /// Display width in columns: 1 for a narrow cell, 2 for the leading cell of a
  /// wide glyph. A continuation sentinel is a cell with `width == 0`.
  width: u8,
}

impl Default for Cell {
  fn default() -> Self {
    Cell { symbol: CompactString::new(" "), fg: None, bg: None, attrs: CellAttrs::empty(), width: 1 }
  }
}

impl Cell {
  pub fn new(symbol: impl Into<CompactString>, width: u8) -> Self {
    Cell { symbol: symbol.into(), fg: None, bg: None, attrs: CellAttrs::empty(), width }
  }

  pub fn continuation() -> Self {
    Cell { symbol: CompactString::new(""), fg: None, bg: None, attrs: CellAttrs::empty(), width: 0 }
  }

  pub fn with_fg(mut self, fg: Color) -> Self {
    self.fg = Some(fg);
    self
  }

  pub fn with_bg(mut self, bg: Color) -> Self {
    self.bg = Some(bg);
    self
  }

  pub fn with_attrs(mut self, attrs: CellAttrs) -> Self {
    self.attrs = attrs;
    self
  }

  pub fn symbol(&self) -> &str {
    &self.symbol
  }

  pub fn fg(&self) -> Option<Color> {
    self.fg
  }

  pub fn bg(&self) -> Option<Color> {
    self.bg
  }

  pub fn attrs(&self) -> CellAttrs {
    self.attrs
  }

  pub fn width(&self) -> u8 {
    self.width
  }

  pub fn is_continuation(&self) -> bool {
    self.width == 0
  }

  pub fn is_wide(&self) -> bool {
    self.width == 2
  }
}

/// Classifies a grapheme's display width the way a terminal would, using
/// `unicode-width`'s East Asian width tables. Zero-width graphemes (combining
/// marks) are rendered as width-1 cells; nothing downstream depends on true
/// zero-width cells.
pub fn display_width(grapheme: &str) -> u8 {
  use unicode_width::UnicodeWidthStr;
  match grapheme.width() {
    0 => 1,
    1 => 1,
    _ => 2,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn narrow_and_wide_glyphs_report_the_expected_width() {
    assert_eq!(display_width("a"), 1);
    assert_eq!(display_width("\u{4e2d}"), 2); // CJK "middle"
  }

  #[test]
  fn default_cell_is_a_blank_narrow_space() {
    let cell = Cell::default();
    assert_eq!(cell.symbol(), " ");
    assert_eq!(cell.width(), 1);
    assert!(!cell.is_continuation());
  }
}
