//! Database request/response models.
//!
//! These types carry data across the repository boundary. Status and platform
//! columns are stored as TEXT and surface here as plain strings; the API layer
//! owns the typed enums and converts at its edge.

pub mod activity;
pub mod cities;
pub mod club;
pub mod comments;
pub mod contact;
pub mod content;
pub mod releases;
pub mod sets;
pub mod social;
pub mod users;
