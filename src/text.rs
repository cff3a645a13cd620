//! Text representation utilities.
//!
//! This module provides the building blocks for document text:
//! - A balanced line tree ([`LineIndex`]) with offset/line translation
//! - Line splitting and char/byte conversion helpers
//! - Content hashing for change detection

mod hash;
mod line_index;
mod lines;
mod node;
pub mod position;

pub use hash::fnv1a_hash;
pub use line_index::{DEFAULT_NODE_CAPACITY, LineIndex, LineInfo, Lines};
pub use lines::{char_len, char_to_byte, split_lines};
pub use position::{Position, Range};
