//! The optional diagnostics socket (spec §6 "Optional diagnostics socket (UDS)"): a
//! JSON-object-per-line request/response protocol over a Unix domain socket, plus an
//! `attach` streaming mode. Feature-gated: the rest of the crate never depends on
//! `serde`/`serde_json`.
//!
//! The listener never touches the render loop's owned state directly; it reads a
//! [`DiagnosticsSnapshot`] published by the embedding application under
//! `rlock!`/`wlock!` (see `crate::locks`), so a stuck client can never wedge the core
//! task (spec §5 "Shared resources").

use crate::evloop::LoopHandle;
use crate::geom::Size;
use crate::surface::ansi::{self, CursorState};
use crate::surface::grid::{diff, Surface};
use crate::ui::input::{KeyCode, KeyEvent, MouseAction, MouseButton, MouseEvent, Modifiers};
use crate::ui::node::{NodeId, NodeKind, NodeTree};
use crate::{rlock, wlock};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Everything a diagnostics request can read, refreshed by the embedding
/// application once per frame via [`snapshot_from`].
#[derive(Debug, Clone)]
pub struct DiagnosticsSnapshot {
  pub app_name: String,
  pub pid: u32,
  pub start_time_unix: u64,
  pub size: Size,
  pub tree_json: Value,
  pub ansi_frame: Vec<u8>,
}

/// Builds a fresh snapshot from the live tree and surface. Cheap enough to call
/// every frame: `tree_to_json` walks the tree once, `ansi_frame` diffs against a
/// blank surface of the same size to recover a full redraw.
pub fn snapshot_from(app_name: impl Into<String>, start_time_unix: u64, tree: &NodeTree, root: Option<NodeId>, surface: &Surface) -> DiagnosticsSnapshot {
  let tree_json = match root {
    Some(id) => tree_to_json(tree, id),
    None => Value::Null,
  };
  let mut blank = Surface::new(surface.size());
  let ops = diff(surface, &mut blank);
  let ansi_frame = ansi::emit(&ops, CursorState { x: 0, y: 0, visible: false });

  DiagnosticsSnapshot { app_name: app_name.into(), pid: std::process::id(), start_time_unix, size: surface.size(), tree_json, ansi_frame }
}

fn tree_to_json(tree: &NodeTree, id: NodeId) -> Value {
  let node = tree.get(id);
  let kind = match &node.kind {
    NodeKind::Text { value, .. } => json!({ "kind": "text", "value": value.as_str() }),
    NodeKind::Button { label, .. } => json!({ "kind": "button", "label": label.as_str() }),
    NodeKind::VStack => json!({ "kind": "vstack" }),
    NodeKind::HStack => json!({ "kind": "hstack" }),
    NodeKind::Overlay { barrier } => json!({ "kind": "overlay", "barrier": barrier }),
    NodeKind::KeyedList => json!({ "kind": "keyed_list" }),
  };
  json!({
    "node": kind,
    "bounds": { "x": node.bounds.x(), "y": node.bounds.y(), "width": node.bounds.width(), "height": node.bounds.height() },
    "focused": node.is_focused,
    "children": node.children.iter().map(|&c| tree_to_json(tree, c)).collect::<Vec<_>>(),
  })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
enum Request {
  Info,
  Capture { format: CaptureFormat },
  Input { data: String },
  Key { key: String, modifiers: Vec<String> },
  Click { x: i32, y: i32, button: String },
  Tree,
  Resize { width: u32, height: u32 },
  Shutdown,
  Attach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CaptureFormat {
  Ansi,
  Svg,
  Text,
}

/// Listens on a Unix domain socket, spawning one task per connection. Each
/// connection reads JSON-lines requests and writes JSON-lines responses; `attach`
/// switches a connection into bidirectional streaming until it sends `detach` or
/// disconnects.
pub struct DiagnosticsServer {
  listener: UnixListener,
  state: Arc<RwLock<DiagnosticsSnapshot>>,
  handle: LoopHandle,
  output: broadcast::Sender<Vec<u8>>,
}

impl DiagnosticsServer {
  pub fn bind(path: impl AsRef<Path>, state: Arc<RwLock<DiagnosticsSnapshot>>, handle: LoopHandle) -> std::io::Result<Self> {
    let path = path.as_ref();
    if path.exists() {
      std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path)?;
    let (output, _) = broadcast::channel(64);
    Ok(DiagnosticsServer { listener, state, handle, output })
  }

  /// A sender the embedding application clones and pushes full-frame ANSI bytes
  /// into once per frame, so any attached client receives them as `o:` lines.
  pub fn output_sender(&self) -> broadcast::Sender<Vec<u8>> {
    self.output.clone()
  }

  pub async fn serve(self, cancellation: CancellationToken) {
    loop {
      tokio::select! {
        _ = cancellation.cancelled() => break,
        accepted = self.listener.accept() => {
          let Ok((stream, _addr)) = accepted else { continue };
          let state = self.state.clone();
          let handle = self.handle.clone();
          let output = self.output.clone();
          tokio::spawn(async move {
            handle_connection(stream, state, handle, output).await;
          });
        }
      }
    }
  }
}

async fn handle_connection(stream: UnixStream, state: Arc<RwLock<DiagnosticsSnapshot>>, handle: LoopHandle, output: broadcast::Sender<Vec<u8>>) {
  let (read_half, mut write_half) = stream.into_split();
  let mut lines = BufReader::new(read_half).lines();

  loop {
    let line = match lines.next_line().await {
      Ok(Some(line)) => line,
      _ => return,
    };
    if line.trim().is_empty() {
      continue;
    }

    let request: Request = match serde_json::from_str(&line) {
      Ok(req) => req,
      Err(err) => {
        let _ = write_line(&mut write_half, &json!({ "error": format!("transient: {err}") })).await;
        continue;
      }
    };

    if matches!(request, Request::Attach) {
      let _ = write_line(&mut write_half, &json!({ "ok": true, "attached": true })).await;
      run_attached(lines, write_half, output.subscribe(), &handle).await;
      return;
    }

    let response = handle_request(request, &state, &handle);
    if write_line(&mut write_half, &response).await.is_err() {
      return;
    }
  }
}

fn handle_request(request: Request, state: &RwLock<DiagnosticsSnapshot>, handle: &LoopHandle) -> Value {
  match request {
    Request::Info => {
      let snap = rlock!(state);
      json!({ "app": snap.app_name, "pid": snap.pid, "start_time": snap.start_time_unix, "width": snap.size.width(), "height": snap.size.height() })
    }
    Request::Capture { format: CaptureFormat::Ansi } => {
      let snap = rlock!(state);
      json!({ "format": "ansi", "data": encode_base64(&snap.ansi_frame) })
    }
    Request::Capture { format: CaptureFormat::Svg | CaptureFormat::Text } => {
      json!({ "error": "invalid_argument: capture format not implemented" })
    }
    Request::Tree => {
      let snap = rlock!(state);
      json!({ "tree": snap.tree_json })
    }
    Request::Input { data } => {
      handle.send_input(data.into_bytes());
      json!({ "ok": true })
    }
    Request::Key { key, modifiers } => match parse_key_event(&key, &modifiers) {
      Some(event) => {
        handle.send_key(event);
        json!({ "ok": true })
      }
      None => json!({ "error": "invalid_argument: unrecognized key" }),
    },
    Request::Click { x, y, button } => match parse_mouse_button(&button) {
      Some(button) => {
        let modifiers = Modifiers::empty();
        handle.send_mouse(MouseEvent { button, action: MouseAction::Press, x, y, modifiers });
        handle.send_mouse(MouseEvent { button, action: MouseAction::Release, x, y, modifiers });
        json!({ "ok": true })
      }
      None => json!({ "error": "invalid_argument: unrecognized mouse button" }),
    },
    Request::Resize { width, height } => {
      {
        let mut snap = wlock!(state);
        snap.size = Size::new(width, height);
      }
      handle.resize(width, height);
      json!({ "ok": true })
    }
    Request::Shutdown => {
      handle.request_stop();
      json!({ "ok": true })
    }
    Request::Attach => unreachable!("handled by the caller before dispatch"),
  }
}

async fn run_attached(
  mut lines: tokio::io::Lines<BufReader<tokio::net::unix::OwnedReadHalf>>,
  mut write_half: tokio::net::unix::OwnedWriteHalf,
  mut output: broadcast::Receiver<Vec<u8>>,
  handle: &LoopHandle,
) {
  loop {
    tokio::select! {
      frame = output.recv() => {
        let Ok(bytes) = frame else { return };
        let encoded = format!("o:{}\n", encode_base64(&bytes));
        if write_half.write_all(encoded.as_bytes()).await.is_err() {
          return;
        }
      }
      line = lines.next_line() => {
        let Ok(Some(line)) = line else { return };
        if line == "detach" {
          return;
        }
        if let Some(encoded) = line.strip_prefix("i:") {
          if let Some(bytes) = decode_base64(encoded) {
            handle.send_input(bytes);
          }
        }
      }
    }
  }
}

async fn write_line(write_half: &mut tokio::net::unix::OwnedWriteHalf, value: &Value) -> std::io::Result<()> {
  let mut line = value.to_string();
  line.push('\n');
  write_half.write_all(line.as_bytes()).await
}

fn parse_key_event(key: &str, modifiers: &[String]) -> Option<KeyEvent> {
  let code = match key {
    "Enter" => KeyCode::Enter,
    "Escape" => KeyCode::Escape,
    "Tab" => KeyCode::Tab,
    "Backspace" => KeyCode::Backspace,
    "Left" => KeyCode::Left,
    "Right" => KeyCode::Right,
    "Up" => KeyCode::Up,
    "Down" => KeyCode::Down,
    other if other.chars().count() == 1 => KeyCode::Char(other.chars().next().unwrap()),
    other if other.starts_with('F') && other[1..].parse::<u8>().is_ok() => KeyCode::Function(other[1..].parse().unwrap()),
    _ => return None,
  };
  let mut flags = Modifiers::empty();
  for m in modifiers {
    flags |= match m.as_str() {
      "Shift" => Modifiers::SHIFT,
      "Control" => Modifiers::CONTROL,
      "Alt" => Modifiers::ALT,
      "Super" => Modifiers::SUPER,
      _ => Modifiers::empty(),
    };
  }
  Some(KeyEvent::new(code, flags))
}

fn parse_mouse_button(button: &str) -> Option<MouseButton> {
  match button {
    "left" => Some(MouseButton::Left),
    "right" => Some(MouseButton::Right),
    "middle" => Some(MouseButton::Middle),
    _ => None,
  }
}

const BASE64_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_base64(bytes: &[u8]) -> String {
  let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
  for chunk in bytes.chunks(3) {
    let b0 = chunk[0];
    let b1 = chunk.get(1).copied();
    let b2 = chunk.get(2).copied();
    out.push(BASE64_ALPHABET[(b0 >> 2) as usize] as char);
    out.push(BASE64_ALPHABET[(((b0 & 0b11) << 4) | (b1.unwrap_or(0) >> 4)) as usize] as char);
    out.push(if let Some(b1) = b1 { BASE64_ALPHABET[(((b1 & 0b1111) << 2) | (b2.unwrap_or(0) >> 6)) as usize] as char } else { '=' });
    out.push(if let Some(b2) = b2 { BASE64_ALPHABET[(b2 & 0b0011_1111) as usize] as char } else { '=' });
  }
  out
}

/// Reverse lookup built once per process rather than re-scanning the 64-entry
/// alphabet for every decoded character.
static BASE64_REVERSE: Lazy<[i8; 256]> = Lazy::new(|| {
  let mut table = [-1i8; 256];
  for (value, &byte) in BASE64_ALPHABET.iter().enumerate() {
    table[byte as usize] = value as i8;
  }
  table
});

fn decode_base64(text: &str) -> Option<Vec<u8>> {
  fn index(c: u8) -> Option<u8> {
    match BASE64_REVERSE[c as usize] {
      -1 => None,
      v => Some(v as u8),
    }
  }
  let cleaned: Vec<u8> = text.bytes().filter(|&b| b != b'=').collect();
  let mut out = Vec::with_capacity(cleaned.len() * 3 / 4);
  for chunk in cleaned.chunks(4) {
    let vals: Vec<u8> = chunk.iter().map(|&b| index(b)).collect::<Option<_>>()?;
    out.push((vals[0] << 2) | (vals.get(1).copied().unwrap_or(0) >> 4));
    if vals.len() > 2 {
      out.push((vals[1] << 4) | (vals[2] >> 2));
    }
    if vals.len() > 3 {
      out.push((vals[2] << 6) | vals[3]);
    }
  }
  Some(out)
}

/// `start_time_unix` helper for callers that want seconds-since-epoch without
/// depending on `jiff`/`chrono` themselves.
pub fn now_unix_seconds() -> u64 {
  SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base64_round_trips_arbitrary_byte_lengths() {
    for data in [b"".as_slice(), b"a", b"ab", b"abc", b"hello, diagnostics!"] {
      let encoded = encode_base64(data);
      assert_eq!(decode_base64(&encoded).unwrap(), data);
    }
  }

  #[test]
  fn snapshot_tree_json_nests_children() {
    let mut tree = NodeTree::new();
    let root = crate::ui::reconcile::reconcile_root(
      &mut tree,
      &crate::ui::widget::Widget::Text { value: "hi".into(), style: crate::ui::widget::Style::default() },
    );
    let json = tree_to_json(&tree, root);
    assert_eq!(json["node"]["kind"], "text");
    assert_eq!(json["node"]["value"], "hi");
  }

  #[test]
  fn info_request_parses_from_a_json_line() {
    let req: Request = serde_json::from_str(r#"{"method":"info"}"#).unwrap();
    assert!(matches!(req, Request::Info));
  }

  #[test]
  fn key_request_parses_fields() {
    let req: Request = serde_json::from_str(r#"{"method":"key","key":"Enter","modifiers":["Shift"]}"#).unwrap();
    match req {
      Request::Key { key, modifiers } => {
        assert_eq!(key, "Enter");
        assert_eq!(modifiers, vec!["Shift".to_string()]);
      }
      _ => panic!("expected a key request"),
    }
  }
}
