//! What to hand the playlist writer: a name, a description and the track
//! URIs in insertion-sized batches.

use crate::track::Track;

/// The platform accepts at most this many tracks per insertion request.
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistPlan {
    pub name: String,
    pub description: String,
    pub uris: Vec<String>,
}

/// "dance pop" → "Dance Pop", "hip-hop" → "Hip-Hop", "r&b" → "R&B".
///
/// A letter is upper-cased when it does not follow another letter.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_letter = false;
    for c in s.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    out
}

impl PlaylistPlan {
    /// Build the plan for an already filtered selection.  Returns `None` when
    /// nothing matched, since an empty playlist is not worth creating.
    pub fn new(tracks: &[Track], min_bpm: f64, max_bpm: f64, genre: Option<&str>) -> Option<Self> {
        if tracks.is_empty() {
            return None;
        }

        let genre = genre.map(str::trim).filter(|g| !g.is_empty());

        let genre_part = genre
            .map(|g| format!(" - {}", title_case(g)))
            .unwrap_or_default();
        let name = format!(
            "Tempo Craft {}-{} BPM{}",
            min_bpm.trunc() as i64,
            max_bpm.trunc() as i64,
            genre_part
        );

        let mut description = format!("Auto-generated playlist with BPM range {:?}-{:?}", min_bpm, max_bpm);
        if let Some(g) = genre {
            description.push_str(&format!(" and genre containing '{}'", g));
        }
        description.push_str(&format!(
            ". Created by Tempo Craft. Contains {} tracks.",
            tracks.len()
        ));

        Some(PlaylistPlan {
            name,
            description,
            uris: tracks.iter().map(|t| t.uri().to_string()).collect(),
        })
    }

    /// URIs split into request-sized chunks.
    pub fn batches(&self) -> impl Iterator<Item = &[String]> {
        self.uris.chunks(MAX_TRACKS_PER_REQUEST)
    }
}
