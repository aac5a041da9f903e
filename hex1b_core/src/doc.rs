//! Document engine: a byte-oriented piece table backed by a red-black tree, dual
//! character/byte editing over UTF-8, multi-cursor management, and grouped undo/redo.

mod buffer;
mod cursor;
mod document;
mod edit;
mod events;
mod history;
mod piece_tree;
mod utf8_map;

pub use buffer::Source;
pub use cursor::{Cursor, CursorSet, CursorSnapshot};
pub use document::Document;
pub use edit::{ByteEditOperation, EditOperation, EditSource};
pub use events::{ChangeEvent, ObserverHandle};
pub use history::{EditGroup, EditHistory, COALESCE_TIMEOUT};
pub use piece_tree::PieceTree;
pub use utf8_map::Utf8ByteMap;
