//! Key/mouse event dispatch: global bindings, then the focused node, then
//! bubbling up the parent chain (spec §4.8 "Input dispatch").

use super::focus::FocusRing;
use super::node::{NodeId, NodeKind, NodeTree};
use super::widget::Callback;

bitflags::bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
  pub struct Modifiers: u8 {
    const SHIFT   = 0b0001;
    const CONTROL = 0b0010;
    const ALT     = 0b0100;
    const SUPER   = 0b1000;
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
  Char(char),
  Enter,
  Escape,
  Tab,
  Backspace,
  Left,
  Right,
  Up,
  Down,
  Function(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
  pub code: KeyCode,
  pub modifiers: Modifiers,
}

impl KeyEvent {
  pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
    KeyEvent { code, modifiers }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
  Left,
  Right,
  Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
  Press,
  Release,
  Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
  pub button: MouseButton,
  pub action: MouseAction,
  pub x: i32,
  pub y: i32,
  pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
  Handled,
  Unhandled,
}

#[derive(Default)]
pub struct InputRouter {
  global_bindings: Vec<(KeyEvent, Callback)>,
}

impl InputRouter {
  pub fn new() -> Self {
    InputRouter::default()
  }

  /// Registers a process-wide binding that traps a key before it reaches the
  /// focused node at all (e.g. Ctrl+C exits).
  pub fn bind_global(&mut self, key: KeyEvent, action: Callback) {
    self.global_bindings.push((key, action));
  }

  pub fn dispatch_key(&self, event: KeyEvent, tree: &mut NodeTree, focus: &mut FocusRing) -> Dispatch {
    for (bound, action) in &self.global_bindings {
      if *bound == event {
        action.call();
        return Dispatch::Handled;
      }
    }

    match (event.code, event.modifiers.contains(Modifiers::SHIFT)) {
      (KeyCode::Tab, false) => {
        focus.advance(tree);
        return Dispatch::Handled;
      }
      (KeyCode::Tab, true) => {
        focus.retreat(tree);
        return Dispatch::Handled;
      }
      (KeyCode::Escape, _) => {
        focus.escape(tree);
        return Dispatch::Handled;
      }
      _ => {}
    }

    bubble(tree, focus.focused(), |tree, id| activate_if_button(tree, id, &event))
  }

  pub fn dispatch_mouse(&self, event: MouseEvent, tree: &mut NodeTree) -> Dispatch {
    let Some(root) = tree.root else { return Dispatch::Unhandled };

    if let Some(barrier) = active_barrier(tree) {
      if !tree.get(barrier).bounds.contains_point(event.x, event.y) {
        return Dispatch::Unhandled;
      }
    }

    let hit = hit_test(tree, root, event.x, event.y);
    bubble(tree, hit, |tree, id| {
      if matches!(event.action, MouseAction::Release) {
        activate_if_button_click(tree, id)
      } else {
        Dispatch::Unhandled
      }
    })
  }
}

fn bubble(tree: &mut NodeTree, start: Option<NodeId>, mut try_handle: impl FnMut(&mut NodeTree, NodeId) -> Dispatch) -> Dispatch {
  let mut current = start;
  while let Some(id) = current {
    if let Dispatch::Handled = try_handle(tree, id) {
      return Dispatch::Handled;
    }
    current = tree.try_get(id).and_then(|n| n.parent);
  }
  Dispatch::Unhandled
}

fn activate_if_button(tree: &mut NodeTree, id: NodeId, event: &KeyEvent) -> Dispatch {
  let activates = matches!(event.code, KeyCode::Enter) || matches!(event.code, KeyCode::Char(' '));
  if !activates {
    return Dispatch::Unhandled;
  }
  activate_if_button_click(tree, id)
}

fn activate_if_button_click(tree: &mut NodeTree, id: NodeId) -> Dispatch {
  match &tree.get(id).kind {
    NodeKind::Button { on_click: Some(cb), .. } => {
      let cb = cb.clone();
      cb.call();
      Dispatch::Handled
    }
    NodeKind::Button { .. } => Dispatch::Handled,
    _ => Dispatch::Unhandled,
  }
}

/// The innermost barrier overlay currently in the tree, if any. Confines both key
/// and mouse dispatch to its subtree (spec §4.8 "Modality").
fn active_barrier(tree: &NodeTree) -> Option<NodeId> {
  let root = tree.root?;
  tree
    .in_order(root)
    .into_iter()
    .filter(|&id| matches!(tree.get(id).kind, NodeKind::Overlay { barrier: true }))
    .last()
}

/// Finds the top-most (last-drawn) node whose bounds contain the point.
fn hit_test(tree: &NodeTree, id: NodeId, x: i32, y: i32) -> Option<NodeId> {
  let node = tree.get(id);
  if !node.bounds.contains_point(x, y) {
    return None;
  }
  for &child in node.children.iter().rev() {
    if let Some(hit) = hit_test(tree, child, x, y) {
      return Some(hit);
    }
  }
  Some(id)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geom::{Constraints, Rect, SizingHint};
  use crate::ui::layout::{arrange, measure};
  use crate::ui::reconcile::reconcile_root;
  use crate::ui::widget::{Style, Widget};
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  #[test]
  fn tab_advances_focus_through_the_router() {
    let mut tree = NodeTree::new();
    let widget = Widget::HStack {
      children: (0..2)
        .map(|i| {
          (
            Widget::Button { label: i.to_string().into(), style: Style::default(), on_click: None, on_focus_lost: None, on_focus_gained: None },
            SizingHint::Content,
            None,
          )
        })
        .collect(),
    };
    let root = reconcile_root(&mut tree, &widget);
    measure(&mut tree, root, Constraints::new(0, 80, 0, 24));
    arrange(&mut tree, root, Rect::new(0, 0, 80, 24));

    let mut focus = FocusRing::default();
    focus.rebuild(&mut tree);
    let first = focus.focused().unwrap();

    let router = InputRouter::new();
    let outcome = router.dispatch_key(KeyEvent::new(KeyCode::Tab, Modifiers::empty()), &mut tree, &mut focus);
    assert_eq!(outcome, Dispatch::Handled);
    assert_ne!(focus.focused().unwrap(), first);
  }

  #[test]
  fn enter_on_the_focused_button_invokes_its_callback() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let mut tree = NodeTree::new();
    let widget = Widget::Button {
      label: "Go".into(),
      style: Style::default(),
      on_click: Some(Callback::new(move || {
        hits_clone.fetch_add(1, Ordering::SeqCst);
      })),
      on_focus_lost: None,
      on_focus_gained: None,
    };
    let root = reconcile_root(&mut tree, &widget);
    measure(&mut tree, root, Constraints::new(0, 80, 0, 24));
    arrange(&mut tree, root, Rect::new(0, 0, 80, 24));

    let mut focus = FocusRing::default();
    focus.rebuild(&mut tree);
    assert_eq!(focus.focused(), Some(root));

    let router = InputRouter::new();
    let outcome = router.dispatch_key(KeyEvent::new(KeyCode::Enter, Modifiers::empty()), &mut tree, &mut focus);
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn global_bindings_trap_before_reaching_any_focused_node() {
    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let mut router = InputRouter::new();
    router.bind_global(
      KeyEvent::new(KeyCode::Char('c'), Modifiers::CONTROL),
      Callback::new(move || seen_clone.lock().unwrap().push("ctrl-c")),
    );
    let mut tree = NodeTree::new();
    reconcile_root(&mut tree, &Widget::Text { value: "x".into(), style: Style::default() });
    let mut focus = FocusRing::default();
    let outcome = router.dispatch_key(KeyEvent::new(KeyCode::Char('c'), Modifiers::CONTROL), &mut tree, &mut focus);
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(*seen.lock().unwrap(), vec!["ctrl-c"]);
  }

  #[test]
  fn mouse_outside_an_active_barriers_bounds_is_unhandled_even_if_a_widget_sits_there() {
    let mut tree = NodeTree::new();
    let overlay = Widget::Overlay {
      base: Box::new(Widget::Text { value: "bg".into(), style: Style::default() }),
      floats: vec![(
        Widget::Button { label: "Ok".into(), style: Style::default(), on_click: None, on_focus_lost: None, on_focus_gained: None },
        Some((0, 0)),
      )],
      barrier: true,
    };
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let widget = Widget::VStack {
      children: vec![
        (overlay, SizingHint::Fixed(4), None),
        (
          Widget::Button {
            label: "Outside".into(),
            style: Style::default(),
            on_click: Some(Callback::new(move || {
              hits_clone.fetch_add(1, Ordering::SeqCst);
            })),
            on_focus_lost: None,
            on_focus_gained: None,
          },
          SizingHint::Content,
          None,
        ),
      ],
    };
    let root = reconcile_root(&mut tree, &widget);
    measure(&mut tree, root, Constraints::new(0, 80, 0, 24));
    arrange(&mut tree, root, Rect::new(0, 0, 80, 24));

    let router = InputRouter::new();
    let outside = MouseEvent { button: MouseButton::Left, action: MouseAction::Release, x: 0, y: 4, modifiers: Modifiers::empty() };
    assert_eq!(router.dispatch_mouse(outside, &mut tree), Dispatch::Unhandled);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
  }
}
