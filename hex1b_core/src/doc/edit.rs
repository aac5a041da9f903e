//! Character- and byte-level edit operation variants, and the tag identifying who
//! originated an edit (used only for observer filtering, never for correctness).

use compact_str::CompactString;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where an edit came from. Purely informational: history and reconciliation never
/// branch on it.
pub enum EditSource {
  User,
  Remote,
  Programmatic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A character-level edit: offsets and ranges are character indices, not bytes.
pub enum EditOperation {
  Insert { offset: usize, text: CompactString },
  Delete { range: Range<usize> },
  Replace { range: Range<usize>, new_text: CompactString },
}

impl EditOperation {
  /// Builds the operation that undoes `self`, given the text that existed at
  /// `self`'s range before it was applied (the empty string for a pure insert).
  pub fn invert(&self, deleted_text: &str) -> EditOperation {
    match self {
      EditOperation::Insert { offset, text } => EditOperation::Delete {
        range: *offset..(*offset + text.chars().count()),
      },
      EditOperation::Delete { range } => EditOperation::Insert {
        offset: range.start,
        text: CompactString::from(deleted_text),
      },
      EditOperation::Replace { range, new_text } => EditOperation::Replace {
        range: range.start..(range.start + new_text.chars().count()),
        new_text: CompactString::from(deleted_text),
      },
    }
  }

  /// Clamps all character offsets into `[0, char_len]`, tolerating stale offsets
  /// that survived across an intervening byte-level edit.
  pub fn clamp_to(&self, char_len: usize) -> EditOperation {
    match self {
      EditOperation::Insert { offset, text } => EditOperation::Insert {
        offset: (*offset).min(char_len),
        text: text.clone(),
      },
      EditOperation::Delete { range } => {
        let start = range.start.min(char_len);
        let end = range.end.min(char_len).max(start);
        EditOperation::Delete { range: start..end }
      }
      EditOperation::Replace { range, new_text } => {
        let start = range.start.min(char_len);
        let end = range.end.min(char_len).max(start);
        EditOperation::Replace { range: start..end, new_text: new_text.clone() }
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A byte-level edit, bypassing UTF-8 validity checks entirely (hex editing).
pub enum ByteEditOperation {
  Insert { byte_offset: usize, bytes: Vec<u8> },
  Delete { byte_offset: usize, count: usize },
  Replace { byte_offset: usize, count: usize, bytes: Vec<u8> },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_inverts_to_matching_delete() {
    let op = EditOperation::Insert { offset: 3, text: "abc".into() };
    let inv = op.invert("");
    assert_eq!(inv, EditOperation::Delete { range: 3..6 });
  }

  #[test]
  fn delete_inverts_to_matching_insert() {
    let op = EditOperation::Delete { range: 2..5 };
    let inv = op.invert("xyz");
    assert_eq!(inv, EditOperation::Insert { offset: 2, text: "xyz".into() });
  }

  #[test]
  fn clamp_pulls_stale_ranges_inside_bounds() {
    let op = EditOperation::Delete { range: 5..20 };
    assert_eq!(op.clamp_to(8), EditOperation::Delete { range: 5..8 });
    let op2 = EditOperation::Insert { offset: 50, text: "x".into() };
    assert_eq!(op2.clamp_to(8), EditOperation::Insert { offset: 8, text: "x".into() });
  }
}
