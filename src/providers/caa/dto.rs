//! Cover Art Archive manifest Data Transfer Objects
//!
//! These types match what `/release/<mbid>/` and `/release-group/<mbid>/`
//! return. Only the fields the provider needs are modelled.
//!
//! API Reference: https://musicbrainz.org/doc/Cover_Art_Archive/API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Manifest listing all images of a release
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CaaManifest {
    pub images: Vec<CaaImage>,
    /// MusicBrainz URL of the release the images belong to
    pub release: Option<String>,
}

/// One archived image
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CaaImage {
    /// Full size image URL
    pub image: String,
    /// Rendition URLs keyed by size ("250", "500", "1200") or legacy alias
    /// ("small", "large")
    pub thumbnails: HashMap<String, String>,
    /// Type names as entered by editors, e.g. "Front", "Booklet"
    pub types: Vec<String>,
    pub front: bool,
    pub back: bool,
    /// Approved by an auto-editor
    pub approved: bool,
    pub comment: String,
}

impl CaaImage {
    pub fn is_pdf(&self) -> bool {
        self.image.ends_with(".pdf")
    }
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// ============================================================================
