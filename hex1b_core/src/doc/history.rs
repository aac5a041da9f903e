//! Grouped undo/redo with typing coalescing.

use super::cursor::CursorSnapshot;
use super::edit::{EditOperation, EditSource};
use std::time::{Duration, Instant};

/// Default coalescing window: consecutive single-character inserts within this long
/// of each other collapse into one undo group.
pub const COALESCE_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct EditGroup {
  pub cursors_before: CursorSnapshot,
  pub cursors_after: CursorSnapshot,
  pub version_before: usize,
  pub version_after: usize,
  pub source: EditSource,
  pub applied: Vec<EditOperation>,
  /// Inverses in reverse application order: applying them in this order restores
  /// the pre-group state.
  pub inverses: Vec<EditOperation>,
  created_at: Instant,
  coalescable: bool,
}

impl EditGroup {
  fn is_single_char_insert(op: &EditOperation) -> Option<(usize, usize)> {
    match op {
      EditOperation::Insert { offset, text } if text.chars().count() == 1 => Some((*offset, 1)),
      _ => None,
    }
  }

  /// Whether `next` is a single-character insert immediately following the last
  /// applied op in this group, within the coalesce window.
  fn can_coalesce_with(&self, next: &EditOperation, now: Instant) -> bool {
    if !self.coalescable || now.duration_since(self.created_at) >= COALESCE_TIMEOUT {
      return false;
    }
    let Some(last) = self.applied.last() else { return false };
    let Some((last_offset, last_len)) = Self::is_single_char_insert(last) else { return false };
    let Some((next_offset, _)) = Self::is_single_char_insert(next) else { return false };
    next_offset == last_offset + last_len
  }
}

#[derive(Debug, Default)]
pub struct EditHistory {
  undo_stack: Vec<EditGroup>,
  redo_stack: Vec<EditGroup>,
  in_progress: Option<EditGroup>,
  nesting: u32,
}

impl EditHistory {
  /// Begins (or nests into) a group. Only the outermost `commit_group` pushes the
  /// accumulated group and clears redo.
  pub fn begin_group(&mut self, cursors_before: CursorSnapshot, version_before: usize, source: EditSource) {
    if self.nesting == 0 {
      self.in_progress = Some(EditGroup {
        cursors_before,
        cursors_after: EditHistory::empty_snapshot(),
        version_before,
        version_after: version_before,
        source,
        applied: Vec::new(),
        inverses: Vec::new(),
        created_at: Instant::now(),
        coalescable: false,
      });
    }
    self.nesting += 1;
  }

  fn empty_snapshot() -> CursorSnapshot {
    // Placeholder overwritten by `commit_group`; never observed otherwise.
    super::cursor::CursorSet::default().snapshot()
  }

  /// Records one applied operation plus its inverse, either into the open group or
  /// (outside any group) by starting/extending a standalone group according to the
  /// coalescing rule.
  pub fn record_edit(
    &mut self,
    op: EditOperation,
    inverse: EditOperation,
    cursors_before: CursorSnapshot,
    cursors_after: CursorSnapshot,
    version_before: usize,
    version_after: usize,
    source: EditSource,
    coalescable: bool,
  ) {
    if let Some(group) = self.in_progress.as_mut() {
      group.applied.push(op);
      group.inverses.insert(0, inverse);
      group.cursors_after = cursors_after;
      group.version_after = version_after;
      return;
    }

    let now = Instant::now();
    if coalescable {
      if let Some(top) = self.undo_stack.last_mut() {
        if top.can_coalesce_with(&op, now) {
          top.applied.push(op);
          top.inverses.insert(0, inverse);
          top.cursors_after = cursors_after;
          top.version_after = version_after;
          top.created_at = now;
          self.redo_stack.clear();
          return;
        }
      }
    }

    self.undo_stack.push(EditGroup {
      cursors_before,
      cursors_after,
      version_before,
      version_after,
      source,
      applied: vec![op],
      inverses: vec![inverse],
      created_at: now,
      coalescable,
    });
    self.redo_stack.clear();
  }

  /// Commits the outermost open group (nested commits just decrement the nesting
  /// counter). A group with no applied operations is dropped rather than pushed.
  pub fn commit_group(&mut self, cursors_after: CursorSnapshot, version_after: usize) {
    if self.nesting == 0 {
      return;
    }
    self.nesting -= 1;
    if self.nesting > 0 {
      return;
    }
    if let Some(mut group) = self.in_progress.take() {
      if group.applied.is_empty() {
        return;
      }
      group.cursors_after = cursors_after;
      group.version_after = version_after;
      self.undo_stack.push(group);
      self.redo_stack.clear();
    }
  }

  /// Drops the in-progress group; the caller is responsible for reverting any
  /// document state already applied under it.
  pub fn cancel_group(&mut self) {
    if self.nesting > 0 {
      self.nesting -= 1;
    }
    if self.nesting == 0 {
      self.in_progress = None;
    }
  }

  /// Pops the most recent undo group and pushes it onto redo. Returns `None` (a
  /// no-op sentinel) on an empty stack rather than failing.
  pub fn undo(&mut self) -> Option<EditGroup> {
    let group = self.undo_stack.pop()?;
    self.redo_stack.push(group.clone());
    Some(group)
  }

  pub fn redo(&mut self) -> Option<EditGroup> {
    let group = self.redo_stack.pop()?;
    self.undo_stack.push(group.clone());
    Some(group)
  }

  pub fn can_undo(&self) -> bool {
    !self.undo_stack.is_empty()
  }

  pub fn can_redo(&self) -> bool {
    !self.redo_stack.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::doc::cursor::{Cursor, CursorSet};

  fn snap(pos: usize) -> CursorSnapshot {
    CursorSet::single(Cursor::new(pos)).snapshot()
  }

  #[test]
  fn begin_commit_produces_one_group() {
    let mut history = EditHistory::default();
    history.begin_group(snap(0), 0, EditSource::User);
    history.record_edit(
      EditOperation::Insert { offset: 0, text: "a".into() },
      EditOperation::Delete { range: 0..1 },
      snap(0),
      snap(1),
      0,
      1,
      EditSource::User,
      false,
    );
    history.record_edit(
      EditOperation::Insert { offset: 1, text: "b".into() },
      EditOperation::Delete { range: 1..2 },
      snap(1),
      snap(2),
      1,
      2,
      EditSource::User,
      false,
    );
    history.commit_group(snap(2), 2);
    assert_eq!(history.undo_stack.len(), 1);
    assert_eq!(history.undo_stack[0].applied.len(), 2);
  }

  #[test]
  fn nested_groups_collapse_to_one_outer_group() {
    let mut history = EditHistory::default();
    history.begin_group(snap(0), 0, EditSource::User);
    history.begin_group(snap(0), 0, EditSource::User);
    history.record_edit(
      EditOperation::Insert { offset: 0, text: "a".into() },
      EditOperation::Delete { range: 0..1 },
      snap(0),
      snap(1),
      0,
      1,
      EditSource::User,
      false,
    );
    history.commit_group(snap(1), 1);
    assert_eq!(history.undo_stack.len(), 0, "inner commit must not push");
    history.commit_group(snap(1), 1);
    assert_eq!(history.undo_stack.len(), 1, "outer commit pushes the single group");
  }

  #[test]
  fn coalesced_typing_merges_into_one_group() {
    let mut history = EditHistory::default();
    for (i, ch) in ['a', 'b', 'c'].iter().enumerate() {
      history.record_edit(
        EditOperation::Insert { offset: 5 + i, text: ch.to_string().into() },
        EditOperation::Delete { range: (5 + i)..(6 + i) },
        snap(5 + i),
        snap(6 + i),
        i,
        i + 1,
        EditSource::User,
        true,
      );
    }
    assert_eq!(history.undo_stack.len(), 1);
    let group = &history.undo_stack[0];
    assert_eq!(group.applied.len(), 3);
    assert_eq!(group.version_before, 0);
    assert_eq!(group.version_after, 3);
  }

  #[test]
  fn undo_then_redo_restores_state() {
    let mut history = EditHistory::default();
    history.record_edit(
      EditOperation::Insert { offset: 0, text: "x".into() },
      EditOperation::Delete { range: 0..1 },
      snap(0),
      snap(1),
      0,
      1,
      EditSource::User,
      false,
    );
    let undone = history.undo().unwrap();
    assert_eq!(undone.applied.len(), 1);
    assert!(!history.can_undo());
    assert!(history.can_redo());
    let redone = history.redo().unwrap();
    assert_eq!(redone.applied, undone.applied);
    assert!(history.can_undo());
  }

  #[test]
  fn undo_on_empty_history_is_a_no_op_sentinel() {
    let mut history = EditHistory::default();
    assert!(history.undo().is_none());
    assert!(history.redo().is_none());
  }
}
