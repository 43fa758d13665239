//! Database layer: repositories, row models, and error translation.

pub mod errors;
pub mod handlers;
pub mod models;
