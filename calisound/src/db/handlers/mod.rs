//! Repository implementations, one per table cluster.

pub mod activity;
pub mod cities;
pub mod club_characters;
pub mod comments;
pub mod contact;
pub mod content;
pub mod releases;
pub mod repository;
pub mod sets;
pub mod social;
pub mod users;

pub use repository::Repository;
