//! The dual character/byte editable document: piece-tree storage, decoded-text and
//! line-start caches, and the observer registry that reports each mutation.

use super::buffer::{BufferStore, Source};
use super::edit::{ByteEditOperation, EditOperation, EditSource};
use super::events::{ChangeEvent, ObserverHandle, ObserverRegistry};
use super::piece_tree::PieceTree;
use super::utf8_map::Utf8ByteMap;
use crate::prelude::*;
use std::ops::Range;

#[derive(Debug, Default, Clone, Copy)]
struct CacheStats {
  hits: usize,
  misses: usize,
}

pub struct Document {
  buffers: BufferStore,
  tree: PieceTree,
  version: usize,
  observers: ObserverRegistry,

  cached_text: String,
  /// Character offset of the start of each line; line `i` (1-based) starts at
  /// `cached_line_starts[i-1]`. Always has at least one entry (offset 0).
  cached_line_starts: Vec<usize>,
  cache_stats: CacheStats,
}

impl std::fmt::Debug for Document {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Document")
      .field("version", &self.version)
      .field("char_length", &self.char_length())
      .field("byte_length", &self.byte_length())
      .finish()
  }
}

impl Document {
  pub fn from_str(text: &str) -> Self {
    let bytes = text.as_bytes().to_vec();
    let len = bytes.len();
    let mut doc = Document {
      buffers: BufferStore::from_original_bytes(bytes),
      tree: PieceTree::new(),
      version: 0,
      observers: ObserverRegistry::default(),
      cached_text: String::new(),
      cached_line_starts: vec![0],
      cache_stats: CacheStats::default(),
    };
    if len > 0 {
      doc.tree.insert(0, Source::Original, 0, len);
    }
    doc.rebuild_caches();
    doc
  }

  /// Builds a document from raw bytes that may not be valid UTF-8, decoding with
  /// `U+FFFD` replacement for any invalid sequence.
  pub fn from_bytes(bytes: Vec<u8>) -> Self {
    let len = bytes.len();
    let mut doc = Document {
      buffers: BufferStore::from_original_bytes(bytes),
      tree: PieceTree::new(),
      version: 0,
      observers: ObserverRegistry::default(),
      cached_text: String::new(),
      cached_line_starts: vec![0],
      cache_stats: CacheStats::default(),
    };
    if len > 0 {
      doc.tree.insert(0, Source::Original, 0, len);
    }
    doc.rebuild_caches();
    doc
  }

  pub fn version(&self) -> usize {
    self.version
  }

  pub fn char_length(&self) -> usize {
    self.cached_text.chars().count()
  }

  pub fn byte_length(&self) -> usize {
    self.tree.total_bytes()
  }

  pub fn line_count(&self) -> usize {
    self.cached_line_starts.len()
  }

  pub fn text(&self) -> &str {
    &self.cached_text
  }

  pub fn text_range(&self, range: Range<usize>) -> Result<String> {
    let len = self.char_length();
    if range.start > len || range.end > len || range.start > range.end {
      return Err(Error::out_of_range(format!("char range {range:?} outside [0,{len}]")));
    }
    Ok(self.cached_text.chars().skip(range.start).take(range.end - range.start).collect())
  }

  pub fn bytes(&self) -> Vec<u8> {
    self.bytes_range(0, self.byte_length()).expect("full range is always valid")
  }

  pub fn bytes_range(&self, byte_offset: usize, count: usize) -> Result<Vec<u8>> {
    let total = self.byte_length();
    if byte_offset > total || byte_offset + count > total {
      return Err(Error::out_of_range(format!("byte range [{byte_offset},{}) outside [0,{total}]", byte_offset + count)));
    }
    let mut out = Vec::with_capacity(count);
    let mut cursor = 0usize;
    for piece in self.tree.in_order() {
      let piece_start = cursor;
      let piece_end = cursor + piece.length;
      cursor = piece_end;
      let want_start = byte_offset.max(piece_start);
      let want_end = (byte_offset + count).min(piece_end);
      if want_start < want_end {
        let local_start = want_start - piece_start;
        let local_len = want_end - want_start;
        out.extend_from_slice(&self.buffers.slice(piece.source, piece.start + local_start, local_len));
      }
      if cursor >= byte_offset + count {
        break;
      }
    }
    Ok(out)
  }

  /// Line `i` (1-based) with its terminator stripped.
  pub fn line_text(&self, line: usize) -> Result<String> {
    let (start, end) = self.line_char_bounds(line)?;
    let raw: String = self.cached_text.chars().skip(start).take(end - start).collect();
    Ok(strip_terminator(&raw).to_string())
  }

  pub fn line_length(&self, line: usize) -> Result<usize> {
    Ok(self.line_text(line)?.chars().count())
  }

  fn line_char_bounds(&self, line: usize) -> Result<(usize, usize)> {
    if line == 0 || line > self.line_count() {
      return Err(Error::out_of_range(format!("line {line} outside [1,{}]", self.line_count())));
    }
    let start = self.cached_line_starts[line - 1];
    let end = self.cached_line_starts.get(line).copied().unwrap_or_else(|| self.char_length());
    Ok((start, end))
  }

  pub fn offset_to_position(&self, char_offset: usize) -> Result<(usize, usize)> {
    if char_offset > self.char_length() {
      return Err(Error::out_of_range(format!("char offset {char_offset} > {}", self.char_length())));
    }
    let line = match self.cached_line_starts.binary_search(&char_offset) {
      Ok(i) => i + 1,
      Err(i) => i, // i is the count of line-starts <= offset... adjust below
    };
    // binary_search's Err(i) gives the insertion point; the containing line is i.
    let line = if line == 0 { 1 } else { line };
    let column = char_offset - self.cached_line_starts[line - 1] + 1;
    Ok((line, column))
  }

  pub fn position_to_offset(&self, line: usize, column: usize) -> Result<usize> {
    if column == 0 {
      return Err(Error::out_of_range(format!("column {column} outside line {line}")));
    }
    let (start, end) = self.line_char_bounds(line)?;
    let offset = start + column - 1;
    if offset > end {
      return Err(Error::out_of_range(format!("column {column} outside line {line}")));
    }
    Ok(offset)
  }

  pub fn subscribe(&mut self, observer: impl FnMut(&ChangeEvent) + 'static) -> ObserverHandle {
    self.observers.subscribe(observer)
  }

  pub fn unsubscribe(&mut self, handle: ObserverHandle) {
    self.observers.unsubscribe(handle);
  }

  pub fn cache_hit_ratio(&self) -> Option<f64> {
    let total = self.cache_stats.hits + self.cache_stats.misses;
    (total > 0).then(|| self.cache_stats.hits as f64 / total as f64)
  }

  // -- character-level edits -------------------------------------------------

  pub fn apply(&mut self, op: EditOperation, source: EditSource) -> Vec<EditOperation> {
    self.apply_many(vec![op], source)
  }

  /// Applies `ops` left-to-right, clamping each to the current character length
  /// before applying it (tolerating stale offsets). Returns the inverses in
  /// right-to-left order: applying them in the returned order restores the
  /// original text.
  pub fn apply_many(&mut self, ops: Vec<EditOperation>, source: EditSource) -> Vec<EditOperation> {
    let previous_version = self.version;
    let mut applied = Vec::with_capacity(ops.len());
    let mut inverses = Vec::with_capacity(ops.len());

    for op in ops {
      let clamped = op.clamp_to(self.char_length());
      let inverse = self.apply_one_unchecked(&clamped);
      applied.push(clamped);
      inverses.insert(0, inverse);
    }

    self.version += 1;
    self.rebuild_caches();
    self.observers.notify(&ChangeEvent {
      version: self.version,
      previous_version,
      applied: applied.clone(),
      inverse: inverses.clone(),
      source,
    });
    inverses
  }

  /// Applies one already-clamped character op directly against the piece tree,
  /// returning its inverse. Does not bump the version or rebuild caches — callers
  /// batch that once per `apply_many` call.
  fn apply_one_unchecked(&mut self, op: &EditOperation) -> EditOperation {
    match op {
      EditOperation::Insert { offset, text } => {
        let byte_offset = self.char_offset_to_byte_offset(*offset);
        let (start, length) = self.buffers.append(text.as_bytes());
        self.tree.insert(byte_offset, Source::Added, start, length);
        EditOperation::Delete { range: *offset..(*offset + text.chars().count()) }
      }
      EditOperation::Delete { range } => {
        let deleted_text = self.text_range_unbuffered(range.clone());
        let byte_start = self.char_offset_to_byte_offset(range.start);
        let byte_end = self.char_offset_to_byte_offset(range.end);
        self.tree.delete(byte_start, byte_end - byte_start);
        EditOperation::Insert { offset: range.start, text: deleted_text.into() }
      }
      EditOperation::Replace { range, new_text } => {
        let deleted_text = self.text_range_unbuffered(range.clone());
        let byte_start = self.char_offset_to_byte_offset(range.start);
        let byte_end = self.char_offset_to_byte_offset(range.end);
        self.tree.delete(byte_start, byte_end - byte_start);
        let (start, length) = self.buffers.append(new_text.as_bytes());
        self.tree.insert(byte_start, Source::Added, start, length);
        EditOperation::Replace {
          range: range.start..(range.start + new_text.chars().count()),
          new_text: deleted_text.into(),
        }
      }
    }
  }

  /// Reads a character range directly from the current cached text, used while
  /// computing an edit's inverse (before caches are rebuilt for the new state).
  fn text_range_unbuffered(&self, range: Range<usize>) -> String {
    self.cached_text.chars().skip(range.start).take(range.end - range.start).collect()
  }

  /// Converts a character offset to a byte offset. `0` and `char_length` map to `0`
  /// and `byte_length` directly (exact, no scan needed); anything else costs an
  /// O(n) UTF-8 byte count of the text's prefix.
  fn char_offset_to_byte_offset(&self, char_offset: usize) -> usize {
    if char_offset == 0 {
      return 0;
    }
    let len = self.char_length();
    if char_offset >= len {
      return self.byte_length();
    }
    self.cached_text.chars().take(char_offset).map(|c| c.len_utf8()).sum()
  }

  // -- byte-level edits ---------------------------------------------------------

  /// Applies a byte-level edit that may produce invalid UTF-8, then diffs the
  /// before/after decoded text with a common-prefix/suffix scan to synthesize an
  /// equivalent character-level op + inverse for observers and history. O(n) in
  /// character length; acceptable since byte edits (hex editing) are rare.
  ///
  /// Every byte offset is validated against a [`Utf8ByteMap`] of the current raw
  /// bytes before the tree is touched: out-of-range offsets and offsets that land
  /// mid-character both fail with `OutOfRange` rather than leaving the document's
  /// UTF-8 decoding in a state the caller didn't ask for.
  pub fn apply_bytes(&mut self, op: ByteEditOperation, source: EditSource) -> Result<(EditOperation, EditOperation)> {
    let total = self.byte_length();
    let (byte_offset, end_offset) = match &op {
      ByteEditOperation::Insert { byte_offset, .. } => (*byte_offset, *byte_offset),
      ByteEditOperation::Delete { byte_offset, count } => (*byte_offset, *byte_offset + *count),
      ByteEditOperation::Replace { byte_offset, count, .. } => (*byte_offset, *byte_offset + *count),
    };
    if end_offset > total {
      return Err(Error::out_of_range(format!("byte range [{byte_offset},{end_offset}) outside [0,{total}]")));
    }
    let map = Utf8ByteMap::build(&self.bytes());
    for edge in [byte_offset, end_offset] {
      if edge > 0 && edge < total {
        let (_, offset_within_char) = map.byte_to_char(edge)?;
        if offset_within_char != 0 {
          return Err(Error::out_of_range(format!("byte offset {edge} does not land on a character boundary")));
        }
      }
    }

    let previous_version = self.version;
    let before_text = self.cached_text.clone();

    match &op {
      ByteEditOperation::Insert { byte_offset, bytes } => {
        let (start, length) = self.buffers.append(bytes);
        self.tree.insert(*byte_offset, Source::Added, start, length);
      }
      ByteEditOperation::Delete { byte_offset, count } => {
        self.tree.delete(*byte_offset, *count);
      }
      ByteEditOperation::Replace { byte_offset, count, bytes } => {
        self.tree.delete(*byte_offset, *count);
        let (start, length) = self.buffers.append(bytes);
        self.tree.insert(*byte_offset, Source::Added, start, length);
      }
    }

    self.version += 1;
    self.rebuild_caches();
    let after_text = self.cached_text.clone();

    let (applied, inverse) = diff_to_char_edit(&before_text, &after_text);
    self.observers.notify(&ChangeEvent {
      version: self.version,
      previous_version,
      applied: vec![applied.clone()],
      inverse: vec![inverse.clone()],
      source,
    });
    Ok((applied, inverse))
  }

  fn rebuild_caches(&mut self) {
    let raw_bytes = self.bytes();
    self.cached_text = String::from_utf8(raw_bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());

    self.cached_line_starts.clear();
    self.cached_line_starts.push(0);
    for (idx, ch) in self.cached_text.char_indices() {
      if ch == '\n' {
        let char_idx = self.cached_text[..idx].chars().count() + 1;
        self.cached_line_starts.push(char_idx);
      }
    }
    self.cache_stats.misses += 1;
  }
}

fn strip_terminator(line: &str) -> &str {
  line.strip_suffix("\r\n").or_else(|| line.strip_suffix('\n')).unwrap_or(line)
}

/// Computes the common-prefix/common-suffix diff between two strings and returns
/// `(applied, inverse)` character-level replace operations equivalent to whatever
/// byte-level edit turned `before` into `after`.
fn diff_to_char_edit(before: &str, after: &str) -> (EditOperation, EditOperation) {
  let before_chars: Vec<char> = before.chars().collect();
  let after_chars: Vec<char> = after.chars().collect();

  let mut prefix = 0;
  while prefix < before_chars.len() && prefix < after_chars.len() && before_chars[prefix] == after_chars[prefix] {
    prefix += 1;
  }
  let mut suffix = 0;
  while suffix < before_chars.len() - prefix
    && suffix < after_chars.len() - prefix
    && before_chars[before_chars.len() - 1 - suffix] == after_chars[after_chars.len() - 1 - suffix]
  {
    suffix += 1;
  }

  let before_mid: String = before_chars[prefix..before_chars.len() - suffix].iter().collect();
  let after_mid: String = after_chars[prefix..after_chars.len() - suffix].iter().collect();
  let range = prefix..(before_chars.len() - suffix);

  let applied = EditOperation::Replace { range: range.clone(), new_text: after_mid.clone().into() };
  let inverse = EditOperation::Replace {
    range: prefix..(prefix + after_mid.chars().count()),
    new_text: before_mid.into(),
  };
  (applied, inverse)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip_insert_then_invert_restores_text_and_doubles_version() {
    let mut doc = Document::from_str("hello world");
    let inverses = doc.apply(EditOperation::Insert { offset: 5, text: ", there".into() }, EditSource::User);
    assert_eq!(doc.text(), "hello, there world");
    assert_eq!(doc.version(), 1);
    doc.apply_many(inverses, EditSource::User);
    assert_eq!(doc.text(), "hello world");
    assert_eq!(doc.version(), 2);
  }

  #[test]
  fn batch_equals_one_by_one() {
    let mut a = Document::from_str("abcdef");
    let mut b = Document::from_str("abcdef");
    let ops = vec![
      EditOperation::Insert { offset: 0, text: "X".into() },
      EditOperation::Insert { offset: 3, text: "Y".into() },
    ];
    a.apply_many(ops.clone(), EditSource::User);
    for op in ops {
      b.apply(op, EditSource::User);
    }
    assert_eq!(a.text(), b.text());
  }

  #[test]
  fn offset_to_position_and_back_round_trips() {
    let doc = Document::from_str("ab\ncd\nef");
    assert_eq!(doc.line_count(), 3);
    assert_eq!(doc.offset_to_position(0).unwrap(), (1, 1));
    assert_eq!(doc.offset_to_position(3).unwrap(), (2, 1));
    assert_eq!(doc.offset_to_position(7).unwrap(), (3, 2));
    for offset in 0..doc.char_length() {
      let pos = doc.offset_to_position(offset).unwrap();
      assert_eq!(doc.position_to_offset(pos.0, pos.1).unwrap(), offset);
    }
  }

  #[test]
  fn line_text_strips_terminator() {
    let doc = Document::from_str("foo\r\nbar\n");
    assert_eq!(doc.line_text(1).unwrap(), "foo");
    assert_eq!(doc.line_text(2).unwrap(), "bar");
    assert_eq!(doc.line_text(3).unwrap(), "");
  }

  #[test]
  fn out_of_range_queries_fail_without_panicking() {
    let doc = Document::from_str("hi");
    assert!(doc.line_text(5).is_err());
    assert!(doc.text_range(0..10).is_err());
    assert!(doc.offset_to_position(99).is_err());
  }

  #[test]
  fn stale_offsets_after_a_shrink_clamp_instead_of_panicking() {
    let mut doc = Document::from_str("0123456789");
    doc.apply(EditOperation::Delete { range: 0..8 }, EditSource::User);
    assert_eq!(doc.text(), "89");
    // An offset computed against the old, longer document must clamp, not panic.
    doc.apply(EditOperation::Insert { offset: 50, text: "!".into() }, EditSource::User);
    assert_eq!(doc.text(), "89!");
  }

  #[test]
  fn apply_bytes_synthesizes_equivalent_char_edit() {
    let mut doc = Document::from_str("hello world");
    let (applied, inverse) = doc
      .apply_bytes(ByteEditOperation::Replace { byte_offset: 6, count: 5, bytes: b"there".to_vec() }, EditSource::User)
      .unwrap();
    assert_eq!(doc.text(), "hello there");
    match applied {
      EditOperation::Replace { range, new_text } => {
        assert_eq!(range, 6..11);
        assert_eq!(new_text, "there");
      }
      _ => panic!("expected replace"),
    }
    match inverse {
      EditOperation::Replace { new_text, .. } => assert_eq!(new_text, "world"),
      _ => panic!("expected replace"),
    }
  }

  #[test]
  fn apply_bytes_rejects_out_of_range_and_mid_character_offsets() {
    let mut doc = Document::from_str("a\u{1F600}b"); // 'a' + 4-byte emoji + 'b'
    assert!(doc.apply_bytes(ByteEditOperation::Delete { byte_offset: 0, count: 999 }, EditSource::User).is_err());
    // byte 2 is the second byte of the 4-byte emoji sequence, not a character boundary.
    assert!(doc.apply_bytes(ByteEditOperation::Insert { byte_offset: 2, bytes: b"x".to_vec() }, EditSource::User).is_err());
  }

  #[test]
  fn invalid_utf8_original_bytes_decode_with_replacement() {
    let doc = Document::from_bytes(vec![0x68, 0x69, 0xff, 0x21]);
    assert!(doc.text().contains('\u{FFFD}'));
    assert!(doc.text().starts_with("hi"));
  }
}
