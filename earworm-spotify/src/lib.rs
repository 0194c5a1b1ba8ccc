//! A barebones client for the parts of the Spotify Web API the quiz needs:
//! client-credentials auth, playlist metadata, and paginated playlist tracks
//! with preview URLs.
#![deny(missing_docs)]

mod client;
pub use client::*;

mod auth;

mod track;
pub use track::*;

mod playlist;
pub use playlist::*;
