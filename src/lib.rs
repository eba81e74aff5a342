//! Cover Minder - cover art acquisition for music releases.
//!
//! Fetches candidate images for a release from a chain of providers (local
//! files, the Cover Art Archive, URL relationships, Amazon), de-duplicates
//! and filters them, resizes or converts them per save target and keeps the
//! accepted images in disk-backed temporary storage.

pub mod album;
pub mod cli;
pub mod config;
pub mod cover;
pub mod error;
pub mod metadata;
pub mod musicbrainz;
pub mod processing;
pub mod providers;
pub mod session;
#[cfg(test)]
pub mod test_utils;
pub mod transport;

pub use error::{Error, Result};
