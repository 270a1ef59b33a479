//! Track entity and raw record parsing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TrackError;

/// Which data source produced a track's BPM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmSource {
    AcousticBrainz,
    GetSongBpm,
    Spotify,
}

impl BpmSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BpmSource::AcousticBrainz => "acousticbrainz",
            BpmSource::GetSongBpm => "getsongbpm",
            BpmSource::Spotify => "spotify",
        }
    }
}

impl fmt::Display for BpmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A music track with its identity and enrichment data.
///
/// Identity fields are validated once in [`Track::new`] and are read-only
/// afterwards.  The enrichment fields (`bpm`, `bpm_source`, `genres`) are
/// filled in by the batch analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: String,
    name: String,
    artist: String,
    uri: String,
    popularity: u8,
    pub bpm: Option<f64>,
    pub bpm_source: Option<BpmSource>,
    pub genres: Vec<String>,
}

fn require_non_blank(value: &str, field: &str) -> Result<(), TrackError> {
    if value.trim().is_empty() {
        return Err(TrackError::Validation(format!("Track {} cannot be empty", field)));
    }
    Ok(())
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        artist: impl Into<String>,
        uri: impl Into<String>,
        popularity: i64,
    ) -> Result<Self, TrackError> {
        let (id, name, artist, uri) = (id.into(), name.into(), artist.into(), uri.into());

        require_non_blank(&id, "ID")?;
        require_non_blank(&name, "name")?;
        require_non_blank(&artist, "artist")?;
        require_non_blank(&uri, "URI")?;

        if !(0..=100).contains(&popularity) {
            return Err(TrackError::Validation(format!(
                "Track popularity must be between 0 and 100, got {}",
                popularity
            )));
        }

        Ok(Track {
            id,
            name,
            artist,
            uri,
            popularity: popularity as u8,
            bpm: None,
            bpm_source: None,
            genres: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn popularity(&self) -> u8 {
        self.popularity
    }

    /// Builder-style helper for pre-analyzed data.
    pub fn with_bpm(mut self, bpm: f64, source: BpmSource) -> Self {
        self.bpm = Some(bpm);
        self.bpm_source = Some(source);
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.name)
    }
}

// ── Raw records ──────────────────────────────────────────────────────────────

/// A track item as delivered by the primary platform (e.g. a top-tracks page).
#[derive(Debug, Clone, Deserialize)]
pub struct TrackRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub popularity: Option<i64>,
    #[serde(default)]
    pub artists: Option<Vec<RecordArtist>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordArtist {
    pub name: Option<String>,
}

impl TryFrom<TrackRecord> for Track {
    type Error = TrackError;

    fn try_from(record: TrackRecord) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        if record.id.is_none() {
            missing.push("id");
        }
        if record.name.is_none() {
            missing.push("name");
        }
        if record.uri.is_none() {
            missing.push("uri");
        }
        if record.popularity.is_none() {
            missing.push("popularity");
        }
        if record.artists.is_none() {
            missing.push("artists");
        }
        if !missing.is_empty() {
            return Err(TrackError::Parsing(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let artist = record
            .artists
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|a| a.name)
            .ok_or_else(|| TrackError::Parsing("Missing artist information".to_string()))?;

        Track::new(
            record.id.unwrap_or_default(),
            record.name.unwrap_or_default(),
            artist,
            record.uri.unwrap_or_default(),
            record.popularity.unwrap_or_default(),
        )
    }
}

/// Convert raw records into tracks.
///
/// Invalid records never produce a track; they are returned alongside with
/// their 1-based position and the rejection reason.
pub fn parse_tracks(records: Vec<TrackRecord>) -> (Vec<Track>, Vec<(usize, TrackError)>) {
    let mut tracks = Vec::new();
    let mut rejected = Vec::new();

    for (i, record) in records.into_iter().enumerate() {
        match Track::try_from(record) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                tracing::warn!(position = i + 1, error = %e, "Skipping track record");
                rejected.push((i + 1, e));
            }
        }
    }

    (tracks, rejected)
}
