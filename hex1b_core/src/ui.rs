//! The declarative TUI engine: immutable widgets, a retained node tree,
//! reconciliation, two-pass layout, the focus ring, and input dispatch.

pub mod focus;
pub mod input;
pub mod layout;
pub mod node;
pub mod reconcile;
pub mod widget;

pub use focus::FocusRing;
pub use input::{Dispatch, InputRouter, KeyEvent, MouseEvent};
pub use node::{Node, NodeId, NodeKind, NodeTree};
pub use reconcile::reconcile_root;
pub use widget::{Callback, Key, Style, Widget};
