//! Adapter layer: convert release DTOs into [`Metadata`].
//!
//! Tag names are the ones filename templates refer to.

use super::dto;
use crate::metadata::Metadata;

/// Release-level metadata for a looked-up release.
pub fn to_metadata(release: &dto::Release) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.set("album", release.title.clone());
    metadata.set("musicbrainz_albumid", release.id.clone());

    if let Some(artist) = build_artist_string(&release.artist_credit) {
        metadata.set("albumartist", artist);
    }
    for credit in &release.artist_credit {
        metadata.add("musicbrainz_albumartistid", credit.artist.id.clone());
    }
    if let Some(group) = &release.release_group {
        metadata.set("musicbrainz_releasegroupid", group.id.clone());
    }
    if let Some(date) = &release.date {
        metadata.set("date", date.clone());
    }
    if let Some(country) = &release.country {
        metadata.set("releasecountry", country.clone());
    }
    if let Some(barcode) = &release.barcode {
        metadata.set("barcode", barcode.clone());
    }
    if let Some(asin) = &release.asin {
        metadata.set("asin", asin.clone());
    }
    metadata
}

/// Build a combined artist string from artist credits
fn build_artist_string(credits: &[dto::ArtistCredit]) -> Option<String> {
    if credits.is_empty() {
        return None;
    }

    let mut result = String::new();
    for credit in credits {
        // Use credited name if available, otherwise official name
        let name = credit.name.as_ref().unwrap_or(&credit.artist.name);
        result.push_str(name);

        if let Some(ref join) = credit.joinphrase {
            result.push_str(join);
        }
    }
    Some(result)
}
