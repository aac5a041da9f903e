//! The two-pass layout engine: top-down measure (constraints in, desired size
//! out), then top-down arrange (final rect in, no return value). Pure function of
//! the node tree plus root constraints (spec §4.7 "Determinism").

use super::node::{ChildArrangement, NodeId, NodeKind, NodeTree};
use super::widget::WidgetKindTag;
use crate::geom::{Constraints, Rect, Size};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
  Vertical,
  Horizontal,
}

fn main_extent(size: Size, axis: Axis) -> u32 {
  match axis {
    Axis::Vertical => size.height(),
    Axis::Horizontal => size.width(),
  }
}

fn cross_extent(size: Size, axis: Axis) -> u32 {
  match axis {
    Axis::Vertical => size.width(),
    Axis::Horizontal => size.height(),
  }
}

fn text_width(s: &str) -> u32 {
  s.graphemes(true).map(|g| crate::surface::cell::display_width(g) as u32).sum()
}

pub fn measure(tree: &mut NodeTree, id: NodeId, constraints: Constraints) -> Size {
  let tag = tree.get(id).kind.tag();
  let size = match tag {
    WidgetKindTag::Text => measure_text(tree, id, constraints),
    WidgetKindTag::Button => measure_button(tree, id, constraints),
    WidgetKindTag::VStack => measure_stack(tree, id, constraints, Axis::Vertical),
    WidgetKindTag::HStack => measure_stack(tree, id, constraints, Axis::Horizontal),
    WidgetKindTag::Overlay => measure_overlay(tree, id, constraints),
    WidgetKindTag::KeyedList => measure_stack(tree, id, constraints, Axis::Vertical),
  };
  let node = tree.get_mut(id);
  node.last_constraints = constraints;
  node.desired_size = size;
  size
}

fn measure_text(tree: &NodeTree, id: NodeId, constraints: Constraints) -> Size {
  let width = match &tree.get(id).kind {
    NodeKind::Text { value, .. } => text_width(value),
    _ => unreachable!(),
  };
  constraints.clamp(Size::new(width, 1))
}

fn measure_button(tree: &NodeTree, id: NodeId, constraints: Constraints) -> Size {
  let width = match &tree.get(id).kind {
    NodeKind::Button { label, .. } => text_width(label) + 4, // "[ " + label + " ]"
    _ => unreachable!(),
  };
  constraints.clamp(Size::new(width, 1))
}

fn measure_stack(tree: &mut NodeTree, id: NodeId, constraints: Constraints, axis: Axis) -> Size {
  let children = tree.get(id).children.clone();
  let hints = match &tree.get(id).arrangement {
    ChildArrangement::Stack(h) => h.clone(),
    _ => vec![crate::geom::SizingHint::Content; children.len()],
  };

  let main_max = match axis {
    Axis::Vertical => constraints.max_h(),
    Axis::Horizontal => constraints.max_w(),
  };
  let cross_max = match axis {
    Axis::Vertical => constraints.max_w(),
    Axis::Horizontal => constraints.max_h(),
  };

  let mut sum_main: u32 = 0;
  let mut cross_desired: u32 = 0;
  let mut fill_slots: Vec<(usize, u32)> = Vec::new();

  for (i, &child) in children.iter().enumerate() {
    let hint = hints.get(i).copied().unwrap_or(crate::geom::SizingHint::Content);
    match hint {
      crate::geom::SizingHint::Fill(weight) => fill_slots.push((i, weight.max(1))),
      crate::geom::SizingHint::Fixed(n) => {
        let child_constraints = match axis {
          Axis::Vertical => Constraints::new(0, cross_max, n, n),
          Axis::Horizontal => Constraints::new(n, n, 0, cross_max),
        };
        let size = measure(tree, child, child_constraints);
        sum_main += main_extent(size, axis);
        cross_desired = cross_desired.max(cross_extent(size, axis));
      }
      crate::geom::SizingHint::Content => {
        let child_constraints = match axis {
          Axis::Vertical => Constraints::new(0, cross_max, 0, u32::MAX),
          Axis::Horizontal => Constraints::new(0, u32::MAX, 0, cross_max),
        };
        let size = measure(tree, child, child_constraints);
        sum_main += main_extent(size, axis);
        cross_desired = cross_desired.max(cross_extent(size, axis));
      }
    }
  }

  let remaining = main_max.saturating_sub(sum_main);
  let total_weight: u32 = fill_slots.iter().map(|(_, w)| w).sum();
  let mut shares: Vec<u32> = fill_slots
    .iter()
    .map(|(_, w)| if total_weight > 0 { remaining * w / total_weight } else { 0 })
    .collect();
  let mut leftover = remaining.saturating_sub(shares.iter().sum::<u32>());
  let mut cursor = 0;
  while leftover > 0 && !shares.is_empty() {
    let len = shares.len();
    shares[cursor % len] += 1;
    leftover -= 1;
    cursor += 1;
  }

  for (k, (child_idx, _)) in fill_slots.iter().enumerate() {
    let main_size = shares[k];
    let child_constraints = match axis {
      Axis::Vertical => Constraints::new(0, cross_max, main_size, main_size),
      Axis::Horizontal => Constraints::new(main_size, main_size, 0, cross_max),
    };
    let size = measure(tree, children[*child_idx], child_constraints);
    sum_main += main_extent(size, axis);
    cross_desired = cross_desired.max(cross_extent(size, axis));
  }

  let desired = match axis {
    Axis::Vertical => Size::new(cross_desired, sum_main),
    Axis::Horizontal => Size::new(sum_main, cross_desired),
  };
  constraints.clamp(desired)
}

fn measure_overlay(tree: &mut NodeTree, id: NodeId, constraints: Constraints) -> Size {
  let children = tree.get(id).children.clone();
  let loose = Constraints::new(0, constraints.max_w(), 0, constraints.max_h());
  let mut desired = Size::ZERO;
  for &child in &children {
    let size = measure(tree, child, loose);
    desired = Size::new(desired.width().max(size.width()), desired.height().max(size.height()));
  }
  constraints.clamp(desired)
}

pub fn arrange(tree: &mut NodeTree, id: NodeId, rect: Rect) {
  tree.get_mut(id).bounds = rect;
  match tree.get(id).kind.tag() {
    WidgetKindTag::Text | WidgetKindTag::Button => {}
    WidgetKindTag::VStack | WidgetKindTag::KeyedList => arrange_stack(tree, id, rect, Axis::Vertical),
    WidgetKindTag::HStack => arrange_stack(tree, id, rect, Axis::Horizontal),
    WidgetKindTag::Overlay => arrange_overlay(tree, id, rect),
  }
}

fn arrange_stack(tree: &mut NodeTree, id: NodeId, rect: Rect, axis: Axis) {
  let children = tree.get(id).children.clone();
  let mut cursor = 0i32;
  for &child in &children {
    let desired = tree.get(child).desired_size;
    let child_rect = match axis {
      Axis::Vertical => Rect::new(rect.x(), rect.y() + cursor, desired.width(), desired.height()),
      Axis::Horizontal => Rect::new(rect.x() + cursor, rect.y(), desired.width(), desired.height()),
    };
    arrange(tree, child, child_rect);
    cursor += main_extent(desired, axis) as i32;
  }
}

fn arrange_overlay(tree: &mut NodeTree, id: NodeId, rect: Rect) {
  let children = tree.get(id).children.clone();
  let offsets = match &tree.get(id).arrangement {
    ChildArrangement::Overlay(o) => o.clone(),
    _ => vec![None; children.len()],
  };
  for (i, &child) in children.iter().enumerate() {
    if i == 0 {
      arrange(tree, child, rect);
      continue;
    }
    let (dx, dy) = offsets.get(i).copied().flatten().unwrap_or((0, 0));
    let desired = tree.get(child).desired_size;
    let child_rect = Rect::new(rect.x() + dx, rect.y() + dy, desired.width(), desired.height());
    arrange(tree, child, child_rect);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geom::SizingHint;
  use crate::ui::reconcile::reconcile_root;
  use crate::ui::widget::{Style, Widget};
  use compact_str::CompactString;

  fn text(s: &str, h: u32) -> (Widget, SizingHint, Option<crate::ui::widget::Key>) {
    let _ = h;
    (Widget::Text { value: CompactString::new(s), style: Style::default() }, SizingHint::Content, None)
  }

  #[test]
  fn vstack_of_content_children_stacks_heights_and_tracks_max_width() {
    let mut tree = NodeTree::new();
    let widget = Widget::VStack {
      children: vec![
        (Widget::Text { value: "ab".into(), style: Style::default() }, SizingHint::Content, None),
        (Widget::Text { value: "abc".into(), style: Style::default() }, SizingHint::Content, None),
        (Widget::Text { value: "abcd".into(), style: Style::default() }, SizingHint::Content, None),
      ],
    };
    let root = reconcile_root(&mut tree, &widget);
    let constraints = Constraints::new(0, 40, 0, 20);
    let size = measure(&mut tree, root, constraints);
    assert_eq!(size, Size::new(4, 3));
    arrange(&mut tree, root, Rect::new(0, 0, 40, 20));
    let children = tree.get(root).children.clone();
    assert_eq!(tree.get(children[0]).bounds.y(), 0);
    assert_eq!(tree.get(children[1]).bounds.y(), 1);
    assert_eq!(tree.get(children[2]).bounds.y(), 2);
  }

  #[test]
  fn fill_children_split_remaining_height_by_floor_division_with_leftover_to_the_left() {
    let mut tree = NodeTree::new();
    let widget = Widget::VStack {
      children: vec![
        (Widget::Text { value: "hello".into(), style: Style::default() }, SizingHint::Content, None),
        (Widget::Text { value: "".into(), style: Style::default() }, SizingHint::Fill(2), None),
        (Widget::Text { value: "".into(), style: Style::default() }, SizingHint::Fill(3), None),
      ],
    };
    let root = reconcile_root(&mut tree, &widget);
    measure(&mut tree, root, Constraints::new(0, 40, 0, 20));
    let children = tree.get(root).children.clone();
    assert_eq!(tree.get(children[1]).desired_size.height(), 6);
    assert_eq!(tree.get(children[2]).desired_size.height(), 9);
  }

  #[test]
  fn overlay_desired_size_is_the_elementwise_max_of_its_children() {
    let mut tree = NodeTree::new();
    let widget = Widget::Overlay {
      base: Box::new(Widget::Text { value: "short".into(), style: Style::default() }),
      floats: vec![(Widget::Text { value: "a longer float".into(), style: Style::default() }, Some((1, 1)))],
      barrier: false,
    };
    let root = reconcile_root(&mut tree, &widget);
    let size = measure(&mut tree, root, Constraints::new(0, 80, 0, 24));
    assert_eq!(size.width(), text_width("a longer float"));
    arrange(&mut tree, root, Rect::new(0, 0, 80, 24));
    let children = tree.get(root).children.clone();
    assert_eq!(tree.get(children[1]).bounds.x(), 1);
    assert_eq!(tree.get(children[1]).bounds.y(), 1);
  }

  #[test]
  fn layout_is_a_pure_function_of_tree_and_constraints() {
    let mut tree = NodeTree::new();
    let widget = Widget::VStack { children: vec![text("hi", 0)] };
    let root = reconcile_root(&mut tree, &widget);
    let c = Constraints::new(0, 40, 0, 20);
    let a = measure(&mut tree, root, c);
    let b = measure(&mut tree, root, c);
    assert_eq!(a, b);
  }
}
