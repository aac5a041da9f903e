//! Turns update ops (plus cursor state) into a minimal ANSI escape-sequence byte
//! stream for a real terminal.

use super::cell::{Cell, CellAttrs, Color};
use super::grid::UpdateOp;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
  pub x: usize,
  pub y: usize,
  pub visible: bool,
}

/// Renders `ops` followed by a trailing cursor move/visibility escape. Skips an
/// op's styling escapes entirely when they match the previous cell's, so a run of
/// identically-styled cells costs one SGR sequence rather than one per cell.
pub fn emit(ops: &[UpdateOp], cursor: CursorState) -> Vec<u8> {
  let mut out = String::new();
  let mut last_style: Option<(Option<Color>, Option<Color>, CellAttrs)> = None;

  for op in ops {
    write!(out, "\x1b[{};{}H", op.row + 1, op.start_col + 1).unwrap();
    for cell in &op.cells {
      if cell.is_continuation() {
        continue;
      }
      let style = (cell.fg(), cell.bg(), cell.attrs());
      if last_style != Some(style) {
        write_sgr(&mut out, cell);
        last_style = Some(style);
      }
      out.push_str(cell.symbol());
    }
  }

  write!(out, "\x1b[{};{}H", cursor.y + 1, cursor.x + 1).unwrap();
  out.push_str(if cursor.visible { "\x1b[?25h" } else { "\x1b[?25l" });
  out.into_bytes()
}

fn write_sgr(out: &mut String, cell: &Cell) {
  out.push_str("\x1b[0");
  if cell.attrs().contains(CellAttrs::BOLD) {
    out.push_str(";1");
  }
  if cell.attrs().contains(CellAttrs::DIM) {
    out.push_str(";2");
  }
  if cell.attrs().contains(CellAttrs::ITALIC) {
    out.push_str(";3");
  }
  if cell.attrs().contains(CellAttrs::UNDERLINE) {
    out.push_str(";4");
  }
  if cell.attrs().contains(CellAttrs::BLINK) {
    out.push_str(";5");
  }
  if cell.attrs().contains(CellAttrs::REVERSE) {
    out.push_str(";7");
  }
  if cell.attrs().contains(CellAttrs::STRIKETHROUGH) {
    out.push_str(";9");
  }
  if let Some(Color(r, g, b)) = cell.fg() {
    write!(out, ";38;2;{r};{g};{b}").unwrap();
  }
  if let Some(Color(r, g, b)) = cell.bg() {
    write!(out, ";48;2;{r};{g};{b}").unwrap();
  }
  out.push('m');
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_ops_still_emit_a_cursor_move() {
    let bytes = emit(&[], CursorState { x: 0, y: 0, visible: true });
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("\x1b[1;1H"));
    assert!(text.ends_with("\x1b[?25h"));
  }

  #[test]
  fn a_run_positions_once_then_writes_each_cell() {
    let ops = vec![UpdateOp { row: 2, start_col: 3, cells: vec![Cell::new("H", 1), Cell::new("i", 1)] }];
    let text = String::from_utf8(emit(&ops, CursorState { x: 5, y: 6, visible: false })).unwrap();
    assert!(text.contains("\x1b[3;4H"));
    assert!(text.contains("Hi"));
    assert!(text.contains("\x1b[?25l"));
  }

  #[test]
  fn continuation_cells_are_never_written() {
    let ops = vec![UpdateOp {
      row: 0,
      start_col: 0,
      cells: vec![Cell::new("\u{4e2d}", 2), Cell::continuation()],
    }];
    let text = String::from_utf8(emit(&ops, CursorState { x: 0, y: 0, visible: true })).unwrap();
    assert_eq!(text.matches('\u{4e2d}').count(), 1);
  }
}
