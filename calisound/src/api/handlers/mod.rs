//! Route handlers for the public API, the admin API, auth, and the club.

pub mod activity;
pub mod auth;
pub mod cities;
pub mod club;
pub mod comments;
pub mod content;
pub mod releases;
pub mod search;
pub mod sets;
pub mod social;
pub mod static_assets;
