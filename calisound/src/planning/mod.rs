//! Release planning: timeline generation and AI promotional copy.

pub mod copy;
pub mod timeline;
