//! Pipeline stages between the editor's row and the publish request.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested without the network.
//!
//! ## Data Flow
//!
//! ```text
//!  body:  doc URL ──▶ input::fetch_document ──▶ document::convert ─┐
//!         typed text ─────────▶ body::format_body ─────────────────┼─▶ post content
//!  image: Drive URL ─▶ input::fetch_image ─▶ media::normalise_image ─▶ media upload
//! ```
//!
//! 1. [`input`] fetches Google Docs JSON and downloads Drive images into a
//!    self-cleaning work directory
//! 2. [`body`] renders hand-typed text through CommonMark
//! 3. [`media`] re-encodes images that are not JPEG or PNG

pub mod body;
pub mod input;
pub mod media;
