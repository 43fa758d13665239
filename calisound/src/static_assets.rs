//! Embedded static assets for the public site shell.

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "public/"]
pub struct Assets;
