//! The focus ring: an in-order list of focusable, non-empty-bounds nodes, with
//! Tab/Shift+Tab/Escape transitions (spec §4.8).

use super::node::{NodeId, NodeKind, NodeTree};

#[derive(Debug, Default, Clone)]
pub struct FocusRing {
  entries: Vec<NodeId>,
  focused: Option<NodeId>,
}

impl FocusRing {
  pub fn entries(&self) -> &[NodeId] {
    &self.entries
  }

  pub fn focused(&self) -> Option<NodeId> {
    self.focused
  }

  /// Recomputes the ring from the live tree after a layout pass. Keeps the
  /// previously focused node's identity if it is still present; otherwise selects
  /// the first entry, or clears focus if the ring is empty.
  pub fn rebuild(&mut self, tree: &mut NodeTree) {
    let entries = match tree.root {
      Some(root) => tree
        .in_order(root)
        .into_iter()
        .filter(|&id| {
          let node = tree.get(id);
          node.is_focusable && !node.bounds.is_empty()
        })
        .collect(),
      None => Vec::new(),
    };
    self.entries = entries;

    let next_focus = self.focused.filter(|id| self.entries.contains(id)).or_else(|| self.entries.first().copied());
    self.set_focus(tree, next_focus);
  }

  fn set_focus(&mut self, tree: &mut NodeTree, new: Option<NodeId>) {
    if self.focused != new {
      if let Some(old) = self.focused {
        if tree.try_get(old).is_some() {
          tree.get_mut(old).is_focused = false;
          notify_focus_change(tree, old, FocusChange::Lost);
        }
      }
      if let Some(id) = new {
        tree.get_mut(id).is_focused = true;
        notify_focus_change(tree, id, FocusChange::Gained);
      }
    }
    self.focused = new;
  }

  pub fn advance(&mut self, tree: &mut NodeTree) {
    let next = self.step(1);
    self.set_focus(tree, next);
  }

  pub fn retreat(&mut self, tree: &mut NodeTree) {
    let next = self.step_back(1);
    self.set_focus(tree, next);
  }

  fn step(&self, by: usize) -> Option<NodeId> {
    if self.entries.is_empty() {
      return None;
    }
    let i = self.focused.and_then(|f| self.entries.iter().position(|&e| e == f)).unwrap_or(self.entries.len() - 1);
    Some(self.entries[(i + by) % self.entries.len()])
  }

  fn step_back(&self, by: usize) -> Option<NodeId> {
    if self.entries.is_empty() {
      return None;
    }
    let i = self.focused.and_then(|f| self.entries.iter().position(|&e| e == f)).unwrap_or(0);
    Some(self.entries[(i + self.entries.len() - by % self.entries.len()) % self.entries.len()])
  }

  /// Transfers focus to the nearest focusable ancestor of the currently focused
  /// node, or clears focus if none exists.
  pub fn escape(&mut self, tree: &mut NodeTree) {
    let mut ancestor = self.focused.and_then(|f| tree.get(f).parent);
    while let Some(id) = ancestor {
      if tree.get(id).is_focusable {
        self.set_focus(tree, Some(id));
        return;
      }
      ancestor = tree.get(id).parent;
    }
    self.set_focus(tree, None);
  }
}

enum FocusChange {
  Lost,
  Gained,
}

/// Invokes `onFocusLost`/`onFocusGained` (spec §4.8) for the one focusable widget
/// kind that carries them. A missing callback is a no-op, not an error.
fn notify_focus_change(tree: &NodeTree, id: NodeId, change: FocusChange) {
  let NodeKind::Button { on_focus_lost, on_focus_gained, .. } = &tree.get(id).kind else {
    return;
  };
  let callback = match change {
    FocusChange::Lost => on_focus_lost,
    FocusChange::Gained => on_focus_gained,
  };
  if let Some(callback) = callback {
    callback.call();
  }
}
