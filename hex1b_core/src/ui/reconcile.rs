//! Diffs a freshly built widget tree against the retained node tree, preserving
//! node identity and retained state wherever the widget at a position still
//! matches (see spec §4.6).

use super::node::{ChildArrangement, Node, NodeId, NodeKind, NodeTree};
use super::widget::{Key, Widget};
use crate::prelude::HashMap;

/// Reconciles `widget` against the tree's current root, returning the root's
/// (possibly new) id. Call once per frame before layout.
pub fn reconcile_root(tree: &mut NodeTree, widget: &Widget) -> NodeId {
  let id = reconcile_node(tree, tree.root, widget, None);
  tree.root = Some(id);
  id
}

fn reconcile_node(tree: &mut NodeTree, existing: Option<NodeId>, widget: &Widget, key: Option<Key>) -> NodeId {
  if let Some(id) = existing {
    let reusable = tree.try_get(id).is_some_and(|n| n.kind.tag() == widget.kind_tag() && n.key == key);
    if reusable {
      update_props(tree, id, widget);
      reconcile_children(tree, id, widget);
      return id;
    }
    tree.dispose(id);
  }
  create_node(tree, widget, key)
}

fn create_node(tree: &mut NodeTree, widget: &Widget, key: Option<Key>) -> NodeId {
  let kind = match widget {
    Widget::Text { value, style } => NodeKind::Text { value: value.clone(), style: *style },
    Widget::Button { label, style, on_click, on_focus_lost, on_focus_gained } => NodeKind::Button {
      label: label.clone(),
      style: *style,
      on_click: on_click.clone(),
      on_focus_lost: on_focus_lost.clone(),
      on_focus_gained: on_focus_gained.clone(),
    },
    Widget::VStack { .. } => NodeKind::VStack,
    Widget::HStack { .. } => NodeKind::HStack,
    Widget::Overlay { barrier, .. } => NodeKind::Overlay { barrier: *barrier },
    Widget::KeyedList { .. } => NodeKind::KeyedList,
  };
  let mut node = Node::new(kind);
  node.key = key;
  let id = tree.alloc(node);
  reconcile_children(tree, id, widget);
  id
}

fn update_props(tree: &mut NodeTree, id: NodeId, widget: &Widget) {
  let node = tree.get_mut(id);
  match (&mut node.kind, widget) {
    (NodeKind::Text { value, style }, Widget::Text { value: nv, style: ns }) => {
      *value = nv.clone();
      *style = *ns;
    }
    (
      NodeKind::Button { label, style, on_click, on_focus_lost, on_focus_gained },
      Widget::Button { label: nl, style: ns, on_click: no, on_focus_lost: nfl, on_focus_gained: nfg },
    ) => {
      *label = nl.clone();
      *style = *ns;
      *on_click = no.clone();
      *on_focus_lost = nfl.clone();
      *on_focus_gained = nfg.clone();
    }
    (NodeKind::Overlay { barrier }, Widget::Overlay { barrier: nb, .. }) => {
      *barrier = *nb;
    }
    _ => {}
  }
}

fn reconcile_children(tree: &mut NodeTree, id: NodeId, widget: &Widget) {
  let (items, arrangement): (Vec<(Widget, Option<Key>)>, ChildArrangement) = match widget {
    Widget::Text { .. } | Widget::Button { .. } => (Vec::new(), ChildArrangement::None),
    Widget::VStack { children } | Widget::HStack { children } => {
      let hints = children.iter().map(|(_, h, _)| *h).collect();
      let items = children.iter().map(|(w, _, k)| (w.clone(), k.clone())).collect();
      (items, ChildArrangement::Stack(hints))
    }
    Widget::Overlay { base, floats, .. } => {
      let mut items = vec![((**base).clone(), None)];
      let mut offsets = vec![None];
      for (w, offset) in floats {
        items.push((w.clone(), None));
        offsets.push(*offset);
      }
      (items, ChildArrangement::Overlay(offsets))
    }
    Widget::KeyedList { items } => {
      let keys: Vec<Key> = items.iter().map(|(k, _)| k.clone()).collect();
      let out = items.iter().map(|(k, w)| (w.clone(), Some(k.clone()))).collect();
      (out, ChildArrangement::Keyed(keys))
    }
  };

  let new_children = reconcile_list(tree, id, items);
  let node = tree.get_mut(id);
  node.children = new_children.into();
  node.arrangement = arrangement;
}

/// Implements the per-parent matching algorithm of spec §4.6 steps 1-4: keyed
/// matching when either side uses keys, else positional matching that discards
/// everything from the first kind mismatch onward.
fn reconcile_list(tree: &mut NodeTree, parent: NodeId, new_items: Vec<(Widget, Option<Key>)>) -> Vec<NodeId> {
  let existing_children = tree.get(parent).children.clone();
  let uses_keys =
    new_items.iter().any(|(_, k)| k.is_some()) || existing_children.iter().any(|&id| tree.get(id).key.is_some());

  let result = if uses_keys {
    reconcile_keyed(tree, &existing_children, new_items)
  } else {
    reconcile_positional(tree, &existing_children, new_items)
  };

  for &id in &result {
    tree.get_mut(id).parent = Some(parent);
  }
  result
}

/// Two missing keys are never equal (spec §4.6 "Key equality"): an unkeyed new item
/// never matches via `key_to_idx`, so it falls back to positional matching against
/// the next unused *unkeyed* existing child, same as `reconcile_positional` would do
/// for an all-unkeyed list. `next_unkeyed` tracks that cursor across the whole list
/// rather than per contiguous run, which coincides with per-run matching in practice
/// since a keyed match never consumes an unkeyed slot and vice versa.
fn reconcile_keyed(tree: &mut NodeTree, existing_children: &[NodeId], new_items: Vec<(Widget, Option<Key>)>) -> Vec<NodeId> {
  let key_to_idx: HashMap<Key, usize> = existing_children
    .iter()
    .enumerate()
    .filter_map(|(i, &id)| tree.get(id).key.clone().map(|k| (k, i)))
    .collect();
  let mut used = vec![false; existing_children.len()];
  let mut result = Vec::with_capacity(new_items.len());
  let mut next_unkeyed = 0usize;

  for (widget, key) in new_items {
    let matched = match &key {
      Some(k) => key_to_idx
        .get(k)
        .copied()
        .filter(|&i| !used[i] && tree.get(existing_children[i]).kind.tag() == widget.kind_tag()),
      None => {
        let mut found = None;
        for i in next_unkeyed..existing_children.len() {
          let id = existing_children[i];
          if used[i] || tree.get(id).key.is_some() {
            continue;
          }
          if tree.get(id).kind.tag() == widget.kind_tag() {
            found = Some(i);
          }
          break;
        }
        if let Some(i) = found {
          next_unkeyed = i + 1;
        }
        found
      }
    };

    match matched {
      Some(i) => {
        used[i] = true;
        let id = existing_children[i];
        update_props(tree, id, &widget);
        reconcile_children(tree, id, &widget);
        result.push(id);
      }
      None => result.push(create_node(tree, &widget, key)),
    }
  }

  for (i, &id) in existing_children.iter().enumerate() {
    if !used[i] {
      tree.dispose(id);
    }
  }
  result
}

fn reconcile_positional(tree: &mut NodeTree, existing_children: &[NodeId], new_items: Vec<(Widget, Option<Key>)>) -> Vec<NodeId> {
  let overlap = existing_children.len().min(new_items.len());
  let mut mismatch_at = overlap;
  for (i, existing_id) in existing_children.iter().enumerate().take(overlap) {
    if tree.get(*existing_id).kind.tag() != new_items[i].0.kind_tag() {
      mismatch_at = i;
      break;
    }
  }

  let mut result = Vec::with_capacity(new_items.len());
  for (i, (widget, key)) in new_items.into_iter().enumerate() {
    if i < mismatch_at {
      let id = existing_children[i];
      update_props(tree, id, &widget);
      reconcile_children(tree, id, &widget);
      result.push(id);
    } else {
      result.push(create_node(tree, &widget, key));
    }
  }

  for &id in &existing_children[mismatch_at..] {
    tree.dispose(id);
  }
  result
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geom::SizingHint;
  use crate::ui::widget::Style;
  use compact_str::CompactString;

  fn text(s: &str) -> Widget {
    Widget::Text { value: CompactString::new(s), style: Style::default() }
  }

  #[test]
  fn a_leaf_property_change_keeps_node_identity_and_applies_the_new_value() {
    let mut tree = NodeTree::new();
    let id1 = reconcile_root(&mut tree, &text("a"));
    let id2 = reconcile_root(&mut tree, &text("b"));
    assert_eq!(id1, id2);
    match &tree.get(id2).kind {
      NodeKind::Text { value, .. } => assert_eq!(value, "b"),
      _ => panic!("expected text node"),
    }
  }

  #[test]
  fn replacing_a_widget_with_a_different_kind_disposes_the_old_subtree_once() {
    let mut tree = NodeTree::new();
    let button =
      Widget::Button { label: "Go".into(), style: Style::default(), on_click: None, on_focus_lost: None, on_focus_gained: None };
    let id1 = reconcile_root(&mut tree, &button);
    assert!(tree.try_get(id1).is_some());
    let id2 = reconcile_root(&mut tree, &text("now text"));
    assert_ne!(id1, id2);
    assert!(tree.try_get(id1).is_none(), "old button node must be disposed");
  }

  #[test]
  fn keyed_reordering_preserves_each_childs_identity() {
    let mut tree = NodeTree::new();
    let make = |order: &[&str]| Widget::KeyedList {
      items: order.iter().map(|k| (Key::Str((*k).into()), text(k))).collect(),
    };
    reconcile_root(&mut tree, &make(&["a", "b", "c"]));
    let ids_before: Vec<NodeId> = tree.get(tree.root.unwrap()).children.to_vec();

    reconcile_root(&mut tree, &make(&["c", "a", "b"]));
    let ids_after: Vec<NodeId> = tree.get(tree.root.unwrap()).children.to_vec();

    assert_eq!(ids_after, vec![ids_before[2], ids_before[0], ids_before[1]]);
  }

  #[test]
  fn unkeyed_siblings_in_a_mixed_keyed_list_keep_identity_across_frames() {
    let mut tree = NodeTree::new();
    let make = |keyed_label: &str, plain_label: &str| Widget::VStack {
      children: vec![
        (text(keyed_label), SizingHint::Content, Some(Key::Str("pinned".into()))),
        (text(plain_label), SizingHint::Content, None),
      ],
    };
    reconcile_root(&mut tree, &make("a", "plain"));
    let ids_before: Vec<NodeId> = tree.get(tree.root.unwrap()).children.to_vec();

    // The keyed sibling's value changes, the unkeyed sibling stays untouched; neither
    // should be torn down just because the list is in keyed mode.
    reconcile_root(&mut tree, &make("a2", "plain"));
    let ids_after: Vec<NodeId> = tree.get(tree.root.unwrap()).children.to_vec();

    assert_eq!(ids_after, ids_before, "unkeyed sibling must not be torn down when nothing about it changed");
    match &tree.get(ids_after[0]).kind {
      NodeKind::Text { value, .. } => assert_eq!(value, "a2"),
      _ => panic!("expected text node"),
    }
  }

  #[test]
  fn vstack_grows_and_shrinks_without_disturbing_surviving_siblings() {
    let mut tree = NodeTree::new();
    let stack = |n: usize| Widget::VStack {
      children: (0..n).map(|i| (text(&i.to_string()), SizingHint::Content, None)).collect(),
    };
    reconcile_root(&mut tree, &stack(2));
    let first_children = tree.get(tree.root.unwrap()).children.clone();

    reconcile_root(&mut tree, &stack(4));
    let grown_children = tree.get(tree.root.unwrap()).children.clone();
    assert_eq!(grown_children.len(), 4);
    assert_eq!(&grown_children[..2], &first_children[..]);

    reconcile_root(&mut tree, &stack(1));
    let shrunk_children = tree.get(tree.root.unwrap()).children.clone();
    assert_eq!(shrunk_children.len(), 1);
    assert_eq!(shrunk_children[0], first_children[0]);
    assert!(tree.try_get(grown_children[3]).is_none());
  }
}
