//! Immutable widget descriptions, rebuilt every frame. Widgets hold no per-frame
//! state; retained state lives on the matching [`super::node::Node`].

use crate::geom::SizingHint;
use compact_str::CompactString;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
  Int(u64),
  Str(CompactString),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
  pub fg: Option<(u8, u8, u8)>,
  pub bg: Option<(u8, u8, u8)>,
  pub bold: bool,
}

/// A type-erased, value-semantics callback. Cloning a widget clones the `Arc`, not
/// the closure body, so callbacks move cheaply from widget into node each frame
/// without extending the widget's own lifetime (see spec design note on callback
/// storage).
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn() + Send + Sync>);

impl Callback {
  pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
    Callback(Arc::new(f))
  }

  pub fn call(&self) {
    (self.0)()
  }
}

impl std::fmt::Debug for Callback {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("Callback(..)")
  }
}

impl PartialEq for Callback {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}
impl Eq for Callback {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
  Text {
    value: CompactString,
    style: Style,
  },
  Button {
    label: CompactString,
    style: Style,
    on_click: Option<Callback>,
    /// Invoked when this button loses/gains focus (spec §4.8 focus transitions).
    on_focus_lost: Option<Callback>,
    on_focus_gained: Option<Callback>,
  },
  VStack {
    children: Vec<(Widget, SizingHint, Option<Key>)>,
  },
  HStack {
    children: Vec<(Widget, SizingHint, Option<Key>)>,
  },
  Overlay {
    base: Box<Widget>,
    floats: Vec<(Widget, Option<(i32, i32)>)>,
    /// Whether this overlay confines input to its own subtree (see spec §4.8
    /// "Modality"): a barrier overlay on the popup stack traps input events.
    barrier: bool,
  },
  KeyedList {
    items: Vec<(Key, Widget)>,
  },
}

/// A coarse tag distinguishing widget kinds without comparing their payloads;
/// reconciliation's matching rule is "kind tags equal", not full `Widget` equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKindTag {
  Text,
  Button,
  VStack,
  HStack,
  Overlay,
  KeyedList,
}

impl Widget {
  pub fn kind_tag(&self) -> WidgetKindTag {
    match self {
      Widget::Text { .. } => WidgetKindTag::Text,
      Widget::Button { .. } => WidgetKindTag::Button,
      Widget::VStack { .. } => WidgetKindTag::VStack,
      Widget::HStack { .. } => WidgetKindTag::HStack,
      Widget::Overlay { .. } => WidgetKindTag::Overlay,
      Widget::KeyedList { .. } => WidgetKindTag::KeyedList,
    }
  }

  pub fn is_focusable(&self) -> bool {
    matches!(self, Widget::Button { .. })
  }
}
