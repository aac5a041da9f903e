//! Prelude.

pub use crate::geom::{Constraints, Rect, Size, SizingHint};
pub use crate::res::{AnyErr, AnyResult, Error, Result};

// Re-export `ahash`, matching the hashing strategy used throughout the crate.
pub use ahash::AHashMap as HashMap;
pub use ahash::AHashSet as HashSet;
pub use ahash::RandomState;
