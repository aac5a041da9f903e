//! The render loop: a single cooperative task that owns the document's UI side
//! (node tree, focus ring, surfaces) and drives build → reconcile → measure →
//! arrange → paint → diff → emit every invalidated frame (spec §4.9, §5).

pub mod ctx;
pub mod msg;

pub use ctx::LoopHandle;
pub use msg::InboundMessage;

use crate::geom::{Constraints, Rect, Size};
use crate::surface::ansi::CursorState;
use crate::surface::cell::{display_width, Cell, Color};
use crate::surface::grid::{diff, Surface, UpdateOp};
use crate::ui::focus::FocusRing;
use crate::ui::input::InputRouter;
use crate::ui::layout::{arrange, measure};
use crate::ui::node::{NodeId, NodeKind, NodeTree};
use crate::ui::reconcile::reconcile_root;
use crate::ui::widget::{Style, Widget};
use crate::config::RenderOptions;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use unicode_segmentation::UnicodeSegmentation;

/// The output side of the engine (spec §6 "Presentation adapter"). Implementations
/// translate update ops into a concrete output format (ANSI stream, cell protocol,
/// JSON) and own the actual terminal/socket connection.
pub trait PresentationAdapter {
  fn session_start(&mut self, size: Size, t0: Instant);
  fn frame(&mut self, ops: &[UpdateOp], cursor: CursorState);
  fn resize(&mut self, size: Size, t: Instant);
  fn session_end(&mut self, t: Instant);
}

/// The single-threaded core task (spec §5 "Scheduling model"). Owns the document's
/// UI-side state; background tasks may only reach it through the [`LoopHandle`]
/// returned by [`RenderLoop::new`].
pub struct RenderLoop<B, P>
where
  B: FnMut() -> Widget,
  P: PresentationAdapter,
{
  build: B,
  presentation: P,
  router: InputRouter,
  options: RenderOptions,

  tree: NodeTree,
  focus: FocusRing,
  back: Surface,
  front: Surface,
  size: Size,

  inbound: UnboundedReceiver<InboundMessage>,
  cancellation: CancellationToken,
  invalidated: bool,
}

impl<B, P> RenderLoop<B, P>
where
  B: FnMut() -> Widget,
  P: PresentationAdapter,
{
  pub fn new(build: B, presentation: P, router: InputRouter, size: Size, options: RenderOptions) -> (Self, LoopHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancellation = CancellationToken::new();
    let handle = LoopHandle::new(tx, cancellation.clone());
    let render_loop = RenderLoop {
      build,
      presentation,
      router,
      options,
      tree: NodeTree::new(),
      focus: FocusRing::default(),
      back: Surface::new(size),
      front: Surface::new(size),
      size,
      inbound: rx,
      cancellation,
      invalidated: true, // the first frame always runs, even with no inbound messages yet
    };
    (render_loop, handle)
  }

  /// Runs until cancelled or the inbound channel closes (every [`LoopHandle`]
  /// dropped), returning the process exit code (spec §6 "Process lifecycle").
  /// Suspension points: awaiting the inbound queue between frames, and awaiting an
  /// optional frame-pacing delay (spec §5).
  pub async fn run(mut self) -> i32 {
    let t0 = Instant::now();
    self.presentation.session_start(self.size, t0);
    let mut last_frame = t0 - self.options.frame_budget();

    loop {
      tokio::select! {
        biased;
        _ = self.cancellation.cancelled() => break,
        received = self.inbound.recv() => {
          match received {
            Some(msg) => self.apply_message(msg),
            None => break,
          }
          while let Ok(msg) = self.inbound.try_recv() {
            self.apply_message(msg);
          }
        }
      }

      if self.invalidated {
        let elapsed = last_frame.elapsed();
        let budget = self.options.frame_budget();
        if elapsed < budget {
          tokio::time::sleep(budget - elapsed).await;
        }
        self.run_frame();
        last_frame = Instant::now();
        self.invalidated = false;
      }
    }

    self.presentation.session_end(Instant::now());
    0
  }

  fn apply_message(&mut self, msg: InboundMessage) {
    match msg {
      InboundMessage::Key(event) => {
        self.router.dispatch_key(event, &mut self.tree, &mut self.focus);
        self.invalidated = true;
      }
      InboundMessage::Mouse(event) => {
        self.router.dispatch_mouse(event, &mut self.tree);
        self.invalidated = true;
      }
      InboundMessage::Paste(_) => {
        self.invalidated = true;
      }
      InboundMessage::RawInput(_) => {
        self.invalidated = true;
      }
      InboundMessage::Resize(width, height) => {
        self.size = Size::new(width, height);
        self.back.resize(self.size);
        self.front.resize(self.size);
        self.presentation.resize(self.size, Instant::now());
        self.invalidated = true;
      }
      InboundMessage::Invalidate => {
        self.invalidated = true;
      }
      InboundMessage::Disconnect => {
        self.invalidated = true;
      }
    }
  }

  fn run_frame(&mut self) {
    let widget = (self.build)();
    let root = reconcile_root(&mut self.tree, &widget);
    measure(&mut self.tree, root, Constraints::tight(self.size));
    arrange(&mut self.tree, root, Rect::from_size(0, 0, self.size));
    self.focus.rebuild(&mut self.tree);

    self.back.clear();
    paint(&mut self.back, &self.tree, root);

    let ops = diff(&self.back, &mut self.front);
    let cursor = CursorState { x: 0, y: 0, visible: false };
    self.presentation.frame(&ops, cursor);
  }
}

/// Paints a node subtree into `surface`, bottom-up in z-order (container nodes draw
/// nothing of their own; leaves write their glyphs). Mirrors the `measure`/`arrange`
/// dispatch-by-kind shape in `ui::layout`.
fn paint(surface: &mut Surface, tree: &NodeTree, id: NodeId) {
  let node = tree.get(id);
  match &node.kind {
    NodeKind::Text { value, style } => write_text(surface, node.bounds, value, *style),
    NodeKind::Button { label, style, .. } => {
      let content = format!("[ {label} ]");
      write_text(surface, node.bounds, &content, *style);
    }
    NodeKind::VStack | NodeKind::HStack | NodeKind::Overlay { .. } | NodeKind::KeyedList => {}
  }
  for &child in &node.children {
    paint(surface, tree, child);
  }
}

/// Writes `text` left-to-right starting at `bounds`'s top-left corner, clipped to
/// both the surface and `bounds`. Never splits a wide glyph from its continuation
/// cell: a glyph that would straddle the clip edge is simply not drawn.
fn write_text(surface: &mut Surface, bounds: Rect, text: &str, style: Style) {
  if bounds.is_empty() {
    return;
  }
  let surface_size = surface.size();
  if bounds.y() < 0 || bounds.y() as u32 >= surface_size.height() {
    return;
  }
  let row = bounds.y() as usize;
  let right = bounds.right().min(surface_size.width() as i32);
  let mut x = bounds.x();

  for grapheme in text.graphemes(true) {
    let width = display_width(grapheme);
    if x < 0 {
      x += 1;
      continue;
    }
    if x + width as i32 > right {
      break;
    }
    let mut cell = Cell::new(grapheme, width);
    if let Some((r, g, b)) = style.fg {
      cell = cell.with_fg(Color(r, g, b));
    }
    if let Some((r, g, b)) = style.bg {
      cell = cell.with_bg(Color(r, g, b));
    }
    if style.bold {
      cell = cell.with_attrs(crate::surface::cell::CellAttrs::BOLD);
    }
    surface.set(x as usize, row, cell);
    x += 1;
    if width == 2 {
      if x as i32 >= right {
        break;
      }
      surface.set(x as usize, row, Cell::continuation());
      x += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ui::widget::Widget;
  use std::sync::{Arc, Mutex};

  struct RecordingAdapter {
    frames: Arc<Mutex<Vec<usize>>>,
  }

  impl PresentationAdapter for RecordingAdapter {
    fn session_start(&mut self, _size: Size, _t0: Instant) {}
    fn frame(&mut self, ops: &[UpdateOp], _cursor: CursorState) {
      self.frames.lock().unwrap().push(ops.len());
    }
    fn resize(&mut self, _size: Size, _t: Instant) {}
    fn session_end(&mut self, _t: Instant) {}
  }

  #[tokio::test]
  async fn the_first_frame_runs_even_with_no_inbound_messages() {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let adapter = RecordingAdapter { frames: frames.clone() };
    let (render_loop, handle) =
      RenderLoop::new(|| Widget::Text { value: "hi".into(), style: Style::default() }, adapter, InputRouter::new(), Size::new(10, 2), RenderOptions::default());

    let task = tokio::spawn(render_loop.run());
    tokio::task::yield_now().await;
    handle.request_stop();
    let exit_code = task.await.unwrap();

    assert_eq!(exit_code, 0);
    assert!(!frames.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn resize_updates_surfaces_and_notifies_the_presentation_adapter() {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let adapter = RecordingAdapter { frames: frames.clone() };
    let (render_loop, handle) =
      RenderLoop::new(|| Widget::Text { value: "hi".into(), style: Style::default() }, adapter, InputRouter::new(), Size::new(10, 2), RenderOptions::default());

    let task = tokio::spawn(render_loop.run());
    handle.resize(20, 5);
    tokio::task::yield_now().await;
    handle.request_stop();
    task.await.unwrap();

    assert!(frames.lock().unwrap().len() >= 2);
  }

  #[test]
  fn paint_writes_text_clipped_to_its_bounds() {
    let mut tree = NodeTree::new();
    let root = reconcile_root(&mut tree, &Widget::Text { value: "hello".into(), style: Style::default() });
    measure(&mut tree, root, Constraints::tight(Size::new(3, 1)));
    arrange(&mut tree, root, Rect::new(0, 0, 3, 1));

    let mut surface = Surface::new(Size::new(3, 1));
    paint(&mut surface, &tree, root);
    assert_eq!(surface.cell(0, 0).symbol(), "h");
    assert_eq!(surface.cell(2, 0).symbol(), "l");
  }
}
