//! Messages posted to the core's inbound queue. Background tasks and presentation/
//! workload adapters communicate with the core exclusively this way (spec §5
//! "Scheduling model").

use crate::ui::input::{KeyEvent, MouseEvent};

#[derive(Debug, Clone)]
pub enum InboundMessage {
  Key(KeyEvent),
  Mouse(MouseEvent),
  Paste(String),
  /// Raw bytes handed to the core by a diagnostics `input{data}` request or a
  /// workload adapter that hasn't decoded them into key/mouse events itself.
  RawInput(Vec<u8>),
  Resize(u32, u32),
  /// An explicit, idempotent invalidation that carries no other state change.
  Invalidate,
  Disconnect,
}
