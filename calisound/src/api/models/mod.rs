//! API request and response models.

pub mod activity;
pub mod auth;
pub mod cities;
pub mod club;
pub mod comments;
pub mod content;
pub mod pagination;
pub mod releases;
pub mod sets;
pub mod social;
