//! Chess book corpus used as coaching reference material

mod library;
mod types;

pub use library::{topics_for_pattern, BookLibrary};
pub use types::*;
