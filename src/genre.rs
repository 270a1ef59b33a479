//! Artist genres from the primary platform.

use std::rc::Rc;

use crate::error::AnalysisError;
use crate::spotify::MusicPlatform;
use crate::track::Track;

/// Looks up a track's genres through its artist.
///
/// Unlike tempo, missing genre data is an error: the track cannot be
/// filtered without it.
pub struct GenreResolver {
    platform: Rc<dyn MusicPlatform>,
}

impl GenreResolver {
    pub fn new(platform: Rc<dyn MusicPlatform>) -> Self {
        GenreResolver { platform }
    }

    pub fn resolve(&self, track: &Track) -> Result<Vec<String>, AnalysisError> {
        let artist = self
            .platform
            .search_artist(track.artist())
            .map_err(|e| {
                AnalysisError::Genre(format!("Failed to get genres for {}: {}", track.artist(), e))
            })?
            .ok_or_else(|| {
                AnalysisError::Genre(format!("No genres found for artist: {}", track.artist()))
            })?;

        tracing::debug!(
            artist = %track.artist(),
            matched = %artist.name,
            genres = artist.genres.len(),
            "Artist genres"
        );
        Ok(artist.genres)
    }
}
