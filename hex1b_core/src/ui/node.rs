//! The retained node tree: a mutable counterpart to a widget tree, carrying
//! measured/arranged geometry and kind-specific retained state across frames.

use super::widget::{Callback, Key, Style, WidgetKindTag};
use crate::geom::{Constraints, Rect, Size, SizingHint};
use compact_str::CompactString;
use smallvec::SmallVec;

pub type NodeId = usize;

/// Most nodes have a handful of direct children (a leaf has none, a stack a few);
/// inlining up to 4 avoids a heap allocation per node for the common case.
pub type NodeChildren = SmallVec<[NodeId; 4]>;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  Text { value: CompactString, style: Style },
  Button {
    label: CompactString,
    style: Style,
    on_click: Option<Callback>,
    on_focus_lost: Option<Callback>,
    on_focus_gained: Option<Callback>,
  },
  VStack,
  HStack,
  Overlay { barrier: bool },
  KeyedList,
}

impl NodeKind {
  pub fn tag(&self) -> WidgetKindTag {
    match self {
      NodeKind::Text { .. } => WidgetKindTag::Text,
      NodeKind::Button { .. } => WidgetKindTag::Button,
      NodeKind::VStack => WidgetKindTag::VStack,
      NodeKind::HStack => WidgetKindTag::HStack,
      NodeKind::Overlay { .. } => WidgetKindTag::Overlay,
      NodeKind::KeyedList => WidgetKindTag::KeyedList,
    }
  }
}

/// How a node's `children` vector should be interpreted by layout and
/// reconciliation. Parallel in length to `children` except `Overlay`, whose first
/// child is always the base (offset `None` is meaningless for it).
#[derive(Debug, Clone, PartialEq)]
pub enum ChildArrangement {
  None,
  Stack(Vec<SizingHint>),
  Overlay(Vec<Option<(i32, i32)>>),
  Keyed(Vec<Key>),
}

#[derive(Debug, Clone)]
pub struct Node {
  pub kind: NodeKind,
  pub key: Option<Key>,
  pub parent: Option<NodeId>,
  pub children: NodeChildren,
  pub arrangement: ChildArrangement,

  pub last_constraints: Constraints,
  pub desired_size: Size,
  pub bounds: Rect,

  pub is_focusable: bool,
  pub is_focused: bool,

  /// Button-only retained state: whether it is mid-press (visual feedback).
  pub pressed: bool,
  /// KeyedList/stack-only retained state: scroll offset in rows, untouched by
  /// reconciliation.
  pub scroll_offset: i32,
}

impl Node {
  pub fn new(kind: NodeKind) -> Self {
    let is_focusable = matches!(kind, NodeKind::Button { .. });
    Node {
      kind,
      key: None,
      parent: None,
      children: NodeChildren::new(),
      arrangement: ChildArrangement::None,
      last_constraints: Constraints::unbounded(),
      desired_size: Size::ZERO,
      bounds: Rect::ZERO,
      is_focusable,
      is_focused: false,
      pressed: false,
      scroll_offset: 0,
    }
  }
}

/// Arena of retained nodes. Nodes are never recycled within a session (matching
/// the add-buffer's own monotonic-growth rationale); disposed slots become `None`
/// and their ids are never reused, so a stale `NodeId` held elsewhere reliably
/// misses rather than aliasing an unrelated node.
#[derive(Debug, Default)]
pub struct NodeTree {
  nodes: Vec<Option<Node>>,
  pub root: Option<NodeId>,
}

impl NodeTree {
  pub fn new() -> Self {
    NodeTree::default()
  }

  pub fn alloc(&mut self, node: Node) -> NodeId {
    self.nodes.push(Some(node));
    self.nodes.len() - 1
  }

  pub fn get(&self, id: NodeId) -> &Node {
    self.nodes[id].as_ref().expect("dangling NodeId")
  }

  pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
    self.nodes[id].as_mut().expect("dangling NodeId")
  }

  pub fn try_get(&self, id: NodeId) -> Option<&Node> {
    self.nodes.get(id).and_then(|n| n.as_ref())
  }

  /// Recursively disposes `id` and its children, returning every disposed id
  /// (innermost first) so callers can clear focus-ring/overlay references to them.
  pub fn dispose(&mut self, id: NodeId) -> Vec<NodeId> {
    let children = self.try_get(id).map(|n| n.children.clone()).unwrap_or_default();
    let mut disposed = Vec::new();
    for child in children {
      disposed.extend(self.dispose(child));
    }
    self.nodes[id] = None;
    disposed.push(id);
    disposed
  }

  /// In-order traversal of the live tree starting at `id`.
  pub fn in_order(&self, id: NodeId) -> Vec<NodeId> {
    let mut out = vec![id];
    for &child in &self.get(id).children {
      out.extend(self.in_order(child));
    }
    out
  }
}
