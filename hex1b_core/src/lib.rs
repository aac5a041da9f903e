//! Hex1b: a declarative TUI engine (widgets, reconciliation, layout, focus, input,
//! cell-diffing render loop) and a document engine (piece-table backed text buffer
//! with UTF-8 dual char/byte editing, multi-cursor management, grouped undo/redo).
//!
//! The two engines are independent; a TUI consumer is free to use only `ui`/`surface`/
//! `evloop`, and an embedder that only needs the text engine is free to use only `doc`.

pub mod config;
pub mod doc;
pub mod evloop;
pub mod geom;
pub mod locks;
pub mod log;
pub mod prelude;
pub mod res;
pub mod surface;
pub mod ui;

#[cfg(feature = "diagnostics")]
pub mod diagnostics;
