//! MusicBrainz release Data Transfer Objects
//!
//! These types match what the `/release/<id>?inc=url-rels+release-groups+artist-credits`
//! lookup returns. Only the fields the cover art pipeline needs are modelled.
//!
//! API Reference: https://musicbrainz.org/doc/MusicBrainz_API

use serde::{Deserialize, Serialize};

/// Release lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Release {
    /// MusicBrainz release ID
    pub id: String,
    /// Release title
    pub title: String,
    /// Release status (Official, Bootleg, etc.)
    pub status: Option<String>,
    /// Release date (YYYY, YYYY-MM, or YYYY-MM-DD)
    pub date: Option<String>,
    /// Country code
    pub country: Option<String>,
    /// Barcode
    pub barcode: Option<String>,
    /// Amazon ASIN, when known
    pub asin: Option<String>,
    /// Release group (groups same album across editions)
    pub release_group: Option<ReleaseGroup>,
    /// Cover Art Archive summary for this release
    pub cover_art_archive: Option<CoverArtArchive>,
    /// Artist credits
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Relationships (only URL relationships are used)
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// Release group
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseGroup {
    pub id: String,
    pub title: Option<String>,
    pub primary_type: Option<String>,
}

/// What the Cover Art Archive holds for a release
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CoverArtArchive {
    /// Any artwork at all
    #[serde(default)]
    pub artwork: bool,
    #[serde(default)]
    pub count: u32,
    /// A front image exists
    #[serde(default)]
    pub front: bool,
    /// A back image exists
    #[serde(default)]
    pub back: bool,
    /// Artwork hidden on request of the rights holder
    #[serde(default)]
    pub darkened: bool,
}

/// Artist credit (can be multiple for collaborations)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistCredit {
    pub artist: Artist,
    /// How this artist is credited (may differ from official name)
    pub name: Option<String>,
    /// Join phrase (e.g., " & ", " feat. ")
    pub joinphrase: Option<String>,
}

/// Artist info
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub sort_name: Option<String>,
}

/// A relationship from the release to another entity
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Relation {
    /// Relationship type, e.g. "cover art link" or "amazon asin"
    #[serde(rename = "type")]
    pub relation_type: String,
    /// Entity type of the target ("url" for URL relationships)
    pub target_type: Option<String>,
    /// URL target
    pub url: Option<UrlTarget>,
}

impl Relation {
    /// Target URL of a URL relationship.
    pub fn url_resource(&self) -> Option<&str> {
        match self.target_type.as_deref() {
            Some("url") | None => self.url.as_ref().map(|u| u.resource.as_str()),
            Some(_) => None,
        }
    }
}

/// URL entity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UrlTarget {
    pub id: Option<String>,
    pub resource: String,
}

/// Error response from MusicBrainz API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
    pub help: Option<String>,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// ============================================================================

#[cfg(test)]
mod contract_tests {
    use super::*;
    use crate::test_utils::release_json;

    #[test]
    fn test_parse_minimal_release() {
        let json = r#"{ "id": "abc123", "title": "Test Album" }"#;
        let release: Release = serde_json::from_str(json).expect("Should parse minimal release");

        assert_eq!(release.id, "abc123");
        assert!(release.release_group.is_none());
        assert!(release.cover_art_archive.is_none());
        assert!(release.relations.is_empty());
    }

    #[test]
    fn test_parse_release_with_relations() {
        let release: Release = serde_json::from_str(&release_json("rel-1")).unwrap();

        assert_eq!(release.release_group.as_ref().unwrap().id, "rg-rel-1");
        let caa = release.cover_art_archive.as_ref().unwrap();
        assert!(caa.artwork && caa.front && caa.back);
        assert_eq!(caa.count, 2);

        assert_eq!(release.relations[0].relation_type, "cover art link");
        assert_eq!(
            release.relations[0].url_resource(),
            Some("http://images.example.com/whitelisted.jpg")
        );
    }

    #[test]
    fn test_non_url_relation_has_no_resource() {
        let json = r#"{
            "type": "transl-tracklisting",
            "target-type": "release"
        }"#;
        let relation: Relation = serde_json::from_str(json).unwrap();
        assert_eq!(relation.url_resource(), None);
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{
            "error": "Not Found",
            "help": "For usage, please see: https://musicbrainz.org/doc/MusicBrainz_API"
        }"#;

        let error: ApiError = serde_json::from_str(json).expect("Should parse error");
        assert_eq!(error.error, "Not Found");
        assert!(error.help.is_some());
    }
}
