//! A cheaply cloned handle background tasks use to submit commands to the core
//! without touching its owned state directly (spec §5 "Shared resources": external
//! tasks must not mutate the document/tree/surfaces, only submit commands).

use super::msg::InboundMessage;
use crate::ui::input::{KeyEvent, MouseEvent};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct LoopHandle {
  inbound: UnboundedSender<InboundMessage>,
  cancellation: CancellationToken,
}

impl LoopHandle {
  pub(super) fn new(inbound: UnboundedSender<InboundMessage>, cancellation: CancellationToken) -> Self {
    LoopHandle { inbound, cancellation }
  }

  /// Marks the current frame stale. Idempotent: repeated calls before the next frame
  /// runs still produce exactly one frame.
  pub fn invalidate(&self) {
    let _ = self.inbound.send(InboundMessage::Invalidate);
  }

  /// Signals the loop to stop at its next between-frames point.
  pub fn request_stop(&self) {
    self.cancellation.cancel();
  }

  pub fn send_input(&self, bytes: Vec<u8>) {
    let _ = self.inbound.send(InboundMessage::RawInput(bytes));
  }

  pub fn resize(&self, width: u32, height: u32) {
    let _ = self.inbound.send(InboundMessage::Resize(width, height));
  }

  pub fn send_key(&self, event: KeyEvent) {
    let _ = self.inbound.send(InboundMessage::Key(event));
  }

  pub fn send_mouse(&self, event: MouseEvent) {
    let _ = self.inbound.send(InboundMessage::Mouse(event));
  }

  pub fn send_paste(&self, text: String) {
    let _ = self.inbound.send(InboundMessage::Paste(text));
  }

  pub fn disconnect(&self) {
    let _ = self.inbound.send(InboundMessage::Disconnect);
  }

  pub fn cancellation(&self) -> CancellationToken {
    self.cancellation.clone()
  }
}
