//! Multi-cursor management: a single [`Cursor`] plus the sorted, merge-on-demand
//! [`CursorSet`] every editable surface keeps.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  position: usize,
  anchor: Option<usize>,
}

impl Cursor {
  pub fn new(position: usize) -> Self {
    Cursor { position, anchor: None }
  }

  pub fn with_anchor(position: usize, anchor: usize) -> Self {
    Cursor { position, anchor: Some(anchor) }
  }

  pub fn position(&self) -> usize {
    self.position
  }

  pub fn anchor(&self) -> Option<usize> {
    self.anchor
  }

  pub fn has_selection(&self) -> bool {
    self.anchor.is_some_and(|a| a != self.position)
  }

  pub fn selection_start(&self) -> usize {
    self.anchor.map(|a| a.min(self.position)).unwrap_or(self.position)
  }

  pub fn selection_end(&self) -> usize {
    self.anchor.map(|a| a.max(self.position)).unwrap_or(self.position)
  }

  /// The end boundary used for overlap comparisons: the selection end if there is a
  /// selection, else the bare position.
  fn sweep_end(&self) -> usize {
    self.selection_end()
  }

  /// The start boundary used for overlap comparisons.
  fn sweep_start(&self) -> usize {
    self.selection_start()
  }

  /// Whether `anchor <= position` (selection grows forward), used to preserve
  /// selection direction across a merge.
  fn is_forward(&self) -> bool {
    self.anchor.is_none_or(|a| a <= self.position)
  }

  pub fn clamp(&self, doc_len: usize) -> Cursor {
    Cursor {
      position: self.position.min(doc_len),
      anchor: self.anchor.map(|a| a.min(doc_len)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An immutable record of a [`CursorSet`]'s state, for undo/redo restore.
pub struct CursorSnapshot {
  cursors: Vec<Cursor>,
  primary_index: usize,
}

#[derive(Debug, Clone)]
pub struct CursorSet {
  cursors: Vec<Cursor>,
  primary_index: usize,
}

impl Default for CursorSet {
  fn default() -> Self {
    CursorSet { cursors: vec![Cursor::new(0)], primary_index: 0 }
  }
}

impl CursorSet {
  pub fn single(cursor: Cursor) -> Self {
    CursorSet { cursors: vec![cursor], primary_index: 0 }
  }

  pub fn cursors(&self) -> &[Cursor] {
    &self.cursors
  }

  pub fn primary(&self) -> Cursor {
    self.cursors[self.primary_index]
  }

  pub fn primary_index(&self) -> usize {
    self.primary_index
  }

  pub fn len(&self) -> usize {
    self.cursors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cursors.is_empty()
  }

  /// Inserts `cursor` in sorted position and returns its index. The primary index
  /// shifts right if the insertion lands at or before it, so the primary cursor's
  /// identity (which logical cursor it refers to) is preserved.
  pub fn add(&mut self, cursor: Cursor) -> usize {
    let idx = self.cursors.partition_point(|c| c.position() < cursor.position());
    self.cursors.insert(idx, cursor);
    if idx <= self.primary_index {
      self.primary_index += 1;
    }
    idx
  }

  pub fn collapse_to_single(&mut self) {
    let primary = self.primary();
    self.cursors = vec![primary];
    self.primary_index = 0;
  }

  /// Sorts by position, then sweeps left-to-right merging any adjacent pair whose
  /// ranges touch or overlap (`a.end >= b.start`). The primary's identity survives
  /// if it participates in a merge; otherwise the later cursor of a merged pair
  /// becomes primary, matching the spec's "primary if present, else the later one".
  pub fn merge_overlapping(&mut self) {
    if self.cursors.len() <= 1 {
      return;
    }
    let primary_cursor = self.primary();
    let mut indexed: Vec<(bool, Cursor)> = self.cursors.iter().map(|c| (*c == primary_cursor, *c)).collect();
    indexed.sort_by_key(|(_, c)| c.position());

    let mut merged: Vec<(bool, Cursor)> = Vec::with_capacity(indexed.len());
    for (is_primary, cursor) in indexed {
      match merged.last_mut() {
        Some((last_primary, last)) if last.sweep_end() >= cursor.sweep_start() => {
          let start = last.sweep_start().min(cursor.sweep_start());
          let end = last.sweep_end().max(cursor.sweep_end());
          let surviving_is_primary = *last_primary || is_primary;
          // Prefer the primary cursor's identity/direction; otherwise the later
          // (second) cursor of the pair, per spec.
          let forward = if *last_primary {
            last.is_forward()
          } else if is_primary {
            cursor.is_forward()
          } else {
            cursor.is_forward()
          };
          let new_cursor = if start == end {
            Cursor::new(start)
          } else if forward {
            Cursor::with_anchor(end, start)
          } else {
            Cursor::with_anchor(start, end)
          };
          *last = new_cursor;
          *last_primary = surviving_is_primary;
        }
        _ => merged.push((is_primary, cursor)),
      }
    }

    self.primary_index = merged.iter().position(|(p, _)| *p).unwrap_or(0);
    self.cursors = merged.into_iter().map(|(_, c)| c).collect();
  }

  pub fn snapshot(&self) -> CursorSnapshot {
    CursorSnapshot { cursors: self.cursors.clone(), primary_index: self.primary_index }
  }

  pub fn restore(&mut self, snapshot: &CursorSnapshot) {
    self.cursors = snapshot.cursors.clone();
    self.primary_index = snapshot.primary_index;
  }

  pub fn clamp_all(&mut self, doc_len: usize) {
    for c in self.cursors.iter_mut() {
      *c = c.clamp(doc_len);
    }
  }
}
