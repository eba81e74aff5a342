//! MusicBrainz release lookup
//!
//! Releases carry the identifiers (release, release group) and URL
//! relationships the cover art providers work from.
//!
//! API docs: https://musicbrainz.org/doc/MusicBrainz_API

pub mod dto;
mod adapter;
mod client;

pub use adapter::to_metadata;
pub use client::{MusicBrainzClient, MusicBrainzError};
pub use dto::Release;
