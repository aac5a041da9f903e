//! A thin terminal demo binary wiring `hex1b_core` to a real terminal via
//! `crossterm`. Contains no engine logic: it translates crossterm events into
//! `hex1b_core::ui::input` events and renders update ops as ANSI bytes.

use clap::Parser;
use crossterm::event::{self, Event, KeyCode as CtKeyCode, KeyModifiers as CtKeyModifiers, MouseEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use hex1b_core::config::RenderOptions;
use hex1b_core::evloop::{PresentationAdapter, RenderLoop};
use hex1b_core::geom::{Size, SizingHint};
use hex1b_core::surface::ansi::{self, CursorState};
use hex1b_core::surface::grid::UpdateOp;
use hex1b_core::ui::input::{InputRouter, KeyCode, KeyEvent, Modifiers, MouseAction, MouseButton, MouseEvent};
use hex1b_core::ui::widget::{Style, Widget};
use std::io::{stdout, Write};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "hex1b", about = "Hex1b terminal demo")]
struct CliOpt {
  /// Path for the optional diagnostics Unix domain socket.
  #[arg(long)]
  diagnostics_socket: Option<std::path::PathBuf>,
}

struct TerminalPresentation;

impl PresentationAdapter for TerminalPresentation {
  fn session_start(&mut self, _size: Size, _t0: Instant) {
    let _ = enable_raw_mode();
    let _ = crossterm::execute!(stdout(), EnterAlternateScreen, crossterm::cursor::Hide);
  }

  fn frame(&mut self, ops: &[UpdateOp], cursor: CursorState) {
    let bytes = ansi::emit(ops, cursor);
    let mut out = stdout();
    let _ = out.write_all(&bytes);
    let _ = out.flush();
  }

  fn resize(&mut self, _size: Size, _t: Instant) {}

  fn session_end(&mut self, _t: Instant) {
    let _ = crossterm::execute!(stdout(), crossterm::cursor::Show, LeaveAlternateScreen);
    let _ = disable_raw_mode();
  }
}

fn translate_key(code: CtKeyCode, modifiers: CtKeyModifiers) -> Option<KeyEvent> {
  let mapped = match code {
    CtKeyCode::Char(c) => KeyCode::Char(c),
    CtKeyCode::Enter => KeyCode::Enter,
    CtKeyCode::Esc => KeyCode::Escape,
    CtKeyCode::Tab => KeyCode::Tab,
    CtKeyCode::Backspace => KeyCode::Backspace,
    CtKeyCode::Left => KeyCode::Left,
    CtKeyCode::Right => KeyCode::Right,
    CtKeyCode::Up => KeyCode::Up,
    CtKeyCode::Down => KeyCode::Down,
    CtKeyCode::F(n) => KeyCode::Function(n),
    _ => return None,
  };
  let mut flags = Modifiers::empty();
  if modifiers.contains(CtKeyModifiers::SHIFT) {
    flags |= Modifiers::SHIFT;
  }
  if modifiers.contains(CtKeyModifiers::CONTROL) {
    flags |= Modifiers::CONTROL;
  }
  if modifiers.contains(CtKeyModifiers::ALT) {
    flags |= Modifiers::ALT;
  }
  if modifiers.contains(CtKeyModifiers::SUPER) {
    flags |= Modifiers::SUPER;
  }
  Some(KeyEvent::new(mapped, flags))
}

fn translate_mouse(event: event::MouseEvent) -> Option<MouseEvent> {
  let (button, action) = match event.kind {
    MouseEventKind::Down(b) => (b, MouseAction::Press),
    MouseEventKind::Up(b) => (b, MouseAction::Release),
    MouseEventKind::Moved => (event::MouseButton::Left, MouseAction::Move),
    _ => return None,
  };
  let button = match button {
    event::MouseButton::Left => MouseButton::Left,
    event::MouseButton::Right => MouseButton::Right,
    event::MouseButton::Middle => MouseButton::Middle,
  };
  Some(MouseEvent { button, action, x: event.column as i32, y: event.row as i32, modifiers: Modifiers::empty() })
}

/// A minimal demo widget tree: a bordered greeting and a quit button, enough to
/// exercise reconciliation, layout, focus, and input end to end.
fn demo_widget() -> Widget {
  Widget::VStack {
    children: vec![
      (Widget::Text { value: "Hex1b demo — Tab to focus, Enter to activate, Ctrl+C to quit".into(), style: Style::default() }, SizingHint::Content, None),
      (
        Widget::Button { label: "Quit".into(), style: Style::default(), on_click: None, on_focus_lost: None, on_focus_gained: None },
        SizingHint::Content,
        None,
      ),
    ],
  }
}

fn main() -> anyhow::Result<()> {
  let _guard = hex1b_core::log::init(std::env::temp_dir(), "hex1b");
  let cli_opt = CliOpt::parse();
  debug!(?cli_opt, "starting hex1b demo binary");

  let runtime = tokio::runtime::Runtime::new()?;
  runtime.block_on(run(cli_opt))
}

async fn run(cli_opt: CliOpt) -> anyhow::Result<()> {
  let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
  let size = Size::new(cols as u32, rows as u32);

  let router = InputRouter::new();

  let (render_loop, handle) = RenderLoop::new(demo_widget, TerminalPresentation, router, size, RenderOptions::default());
  let cancellation = handle.cancellation();

  if let Some(socket_path) = cli_opt.diagnostics_socket {
    spawn_diagnostics(socket_path, handle.clone());
  }

  let input_cancellation = cancellation.clone();
  let input_handle = handle.clone();
  let input_task = tokio::task::spawn_blocking(move || poll_crossterm_events(input_handle, input_cancellation));

  let exit_code = render_loop.run().await;
  let _ = input_task.await;
  std::process::exit(exit_code);
}

fn poll_crossterm_events(handle: hex1b_core::evloop::LoopHandle, cancellation: CancellationToken) {
  while !cancellation.is_cancelled() {
    match event::poll(Duration::from_millis(50)) {
      Ok(true) => {}
      _ => continue,
    }
    let Ok(ev) = event::read() else { continue };
    match ev {
      Event::Key(key) => {
        if key.code == CtKeyCode::Char('c') && key.modifiers.contains(CtKeyModifiers::CONTROL) {
          cancellation.cancel();
          continue;
        }
        if let Some(mapped) = translate_key(key.code, key.modifiers) {
          handle.send_key(mapped);
        }
      }
      Event::Mouse(mouse) => {
        if let Some(mapped) = translate_mouse(mouse) {
          handle.send_mouse(mapped);
        }
      }
      Event::Resize(width, height) => handle.resize(width as u32, height as u32),
      Event::Paste(text) => handle.send_paste(text),
      Event::FocusGained | Event::FocusLost => {}
    }
  }
}

fn spawn_diagnostics(socket_path: std::path::PathBuf, handle: hex1b_core::evloop::LoopHandle) {
  use hex1b_core::diagnostics::{now_unix_seconds, snapshot_from, DiagnosticsServer};
  use hex1b_core::surface::grid::Surface;
  use parking_lot::RwLock;
  use std::sync::Arc;

  let tree = hex1b_core::ui::node::NodeTree::new();
  let surface = Surface::new(Size::new(1, 1));
  let snapshot = snapshot_from("hex1b", now_unix_seconds(), &tree, None, &surface);
  let state = Arc::new(RwLock::new(snapshot));

  let cancellation = handle.cancellation();
  match DiagnosticsServer::bind(&socket_path, state, handle) {
    Ok(server) => {
      tokio::spawn(server.serve(cancellation));
    }
    Err(err) => tracing::warn!(?err, "failed to bind diagnostics socket"),
  }
}
