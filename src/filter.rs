//! Tempo and genre filtering over analyzed tracks.
//!
//! All filters are pure: inputs are left untouched and a new list is
//! returned, preserving the input order.

use tracing::info;

use crate::error::FilterError;
use crate::track::Track;

/// Keep tracks with a BPM inside `min..=max`.  Tracks without BPM never match.
pub fn filter_by_bpm(tracks: &[Track], min_bpm: f64, max_bpm: f64) -> Vec<Track> {
    let filtered: Vec<Track> = tracks
        .iter()
        .filter(|t| t.bpm.is_some_and(|bpm| min_bpm <= bpm && bpm <= max_bpm))
        .cloned()
        .collect();

    info!(
        "Filtered {} tracks from {} by BPM range {}-{}",
        filtered.len(),
        tracks.len(),
        min_bpm,
        max_bpm
    );
    filtered
}

/// Keep tracks with at least one genre containing `keyword`, ignoring case.
pub fn filter_by_genre(tracks: &[Track], keyword: &str) -> Vec<Track> {
    let keyword_lower = keyword.to_lowercase();

    let filtered: Vec<Track> = tracks
        .iter()
        .filter(|t| {
            t.genres
                .iter()
                .any(|g| g.to_lowercase().contains(&keyword_lower))
        })
        .cloned()
        .collect();

    info!(
        "Filtered {} tracks from {} by genre keyword '{}'",
        filtered.len(),
        tracks.len(),
        keyword
    );
    filtered
}

/// BPM range first (only when both bounds are given), then genre (only
/// when the keyword is non-blank).
pub fn filter_combined(
    tracks: &[Track],
    min_bpm: Option<f64>,
    max_bpm: Option<f64>,
    genre_keyword: Option<&str>,
) -> Vec<Track> {
    let mut filtered = tracks.to_vec();

    if let (Some(min), Some(max)) = (min_bpm, max_bpm) {
        filtered = filter_by_bpm(&filtered, min, max);
    }

    if let Some(keyword) = genre_keyword.map(str::trim).filter(|k| !k.is_empty()) {
        filtered = filter_by_genre(&filtered, keyword);
    }

    info!(
        "Combined filtering result: {} tracks from {} original tracks",
        filtered.len(),
        tracks.len()
    );
    filtered
}

/// Validated user filter criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackFilter {
    pub bpm_range: Option<(f64, f64)>,
    pub genre: Option<String>,
}

impl TrackFilter {
    /// Bounds must come together, with `0 < min < max`.  A blank genre
    /// keyword means no genre filter.
    pub fn new(
        min_bpm: Option<f64>,
        max_bpm: Option<f64>,
        genre: Option<&str>,
    ) -> Result<Self, FilterError> {
        let bpm_range = match (min_bpm, max_bpm) {
            (None, None) => None,
            (Some(min), Some(max)) => {
                if !(min.is_finite() && min > 0.0) {
                    return Err(FilterError::NonPositiveMin(min));
                }
                if !(max.is_finite() && max > min) {
                    return Err(FilterError::InvertedRange { min, max });
                }
                Some((min, max))
            }
            _ => return Err(FilterError::IncompleteRange),
        };

        let genre = genre
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        Ok(TrackFilter { bpm_range, genre })
    }

    pub fn is_empty(&self) -> bool {
        self.bpm_range.is_none() && self.genre.is_none()
    }

    pub fn apply(&self, tracks: &[Track]) -> Vec<Track> {
        filter_combined(
            tracks,
            self.bpm_range.map(|(min, _)| min),
            self.bpm_range.map(|(_, max)| max),
            self.genre.as_deref(),
        )
    }
}
