//! GetSongBPM tempo lookup.
//!
//! A single keyed free-text search on "<artist> <title>".  Results are
//! fuzzy-matched against the (cleaned) artist and title; when nothing
//! matches, the first result's tempo is used as a best effort.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::provider::{BpmLookup, BpmProvider};
use crate::track::{BpmSource, Track};
use crate::{PROBE_TIMEOUT, USER_AGENT};

pub const GETSONGBPM_BASE_URL: &str = "https://api.getsongbpm.com";

/// Key used when none is configured.
pub const DEMO_API_KEY: &str = "demo";

/// Similarity above which two strings are considered the same name.
const MATCH_THRESHOLD: f64 = 0.7;

/// Annotation suffixes removed before searching (exact, case-sensitive).
const SUFFIXES_TO_REMOVE: &[&str] = &[
    "- Remastered",
    "- Remaster",
    "- Remix",
    "- Radio Edit",
    "- Extended",
    "- Original Mix",
    "- Radio Version",
    "- Album Version",
    "- Single Version",
    "- Bonus Track",
    "- Deluxe",
    "- Edit",
];

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    search: Option<SearchField>,
}

/// `search` is a result list, or an object like `{"error": "no result"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchField {
    Results(Vec<SongResult>),
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongResult {
    pub artist: Option<NameRef>,
    pub song: Option<TitleRef>,
    pub tempo: Option<TempoValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleRef {
    pub title: Option<String>,
}

/// The service reports tempo as a string ("120"), sometimes as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TempoValue {
    Number(f64),
    Text(String),
}

impl SongResult {
    fn artist_name(&self) -> &str {
        self.artist.as_ref().and_then(|a| a.name.as_deref()).unwrap_or("")
    }

    fn song_title(&self) -> &str {
        self.song.as_ref().and_then(|s| s.title.as_deref()).unwrap_or("")
    }

    /// Reported tempo; a missing tempo reads as 0.
    pub fn tempo(&self) -> Result<f64, ProviderError> {
        match &self.tempo {
            None => Ok(0.0),
            Some(TempoValue::Number(v)) => Ok(*v),
            Some(TempoValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ProviderError::Malformed(format!("invalid tempo {:?}", s))),
        }
    }
}

// ── Matching helpers ─────────────────────────────────────────────────────────

/// Strip trailing annotation suffixes and collapse whitespace.
pub fn clean_search_term(term: &str) -> String {
    let mut cleaned = term.trim();
    for suffix in SUFFIXES_TO_REMOVE {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.trim();
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard index over the character sets of two strings (spaces removed,
/// case-folded).  0.0 when either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let chars = |s: &str| -> HashSet<char> {
        s.to_lowercase().chars().filter(|c| *c != ' ').collect()
    };
    let (set_a, set_b) = (chars(a), chars(b));
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Containment in either direction, or similarity above the threshold.
fn names_match(target: &str, candidate: &str) -> bool {
    target.contains(candidate)
        || candidate.contains(target)
        || similarity(target, candidate) > MATCH_THRESHOLD
}

/// Both artist and title must match.
pub fn is_good_match(result: &SongResult, artist: &str, title: &str) -> bool {
    let result_artist = result.artist_name().to_lowercase();
    let result_title = result.song_title().to_lowercase();

    names_match(&artist.to_lowercase(), &result_artist)
        && names_match(&title.to_lowercase(), &result_title)
}

/// Pick a tempo from a result list: the first good match with a positive
/// tempo, else the first result's tempo if positive.
pub fn select_tempo(
    results: &[SongResult],
    artist: &str,
    title: &str,
) -> Result<Option<f64>, ProviderError> {
    for result in results {
        if is_good_match(result, artist, title) {
            let bpm = result.tempo()?;
            if bpm > 0.0 {
                return Ok(Some(bpm));
            }
        }
    }

    if let Some(first) = results.first() {
        let bpm = first.tempo()?;
        if bpm > 0.0 {
            debug!(artist, title, bpm, "No close match, using first result");
            return Ok(Some(bpm));
        }
    }

    Ok(None)
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Tempo-lookup provider backed by the GetSongBPM API.
pub struct GetSongBpmProvider {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl GetSongBpmProvider {
    pub fn new(api_key: Option<&str>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();

        GetSongBpmProvider {
            agent,
            base_url: GETSONGBPM_BASE_URL.to_string(),
            api_key: api_key.unwrap_or(DEMO_API_KEY).to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn search_request(&self, search_type: &str, lookup: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}/search/", self.base_url))
            .query("api_key", &self.api_key)
            .query("type", search_type)
            .query("lookup", lookup)
    }

    /// Run a search and return the decoded result list.
    pub fn search(&self, artist: &str, title: &str) -> Result<Vec<SongResult>, ProviderError> {
        let lookup = format!("{} {}", artist, title);
        info!(artist, title, "Searching GetSongBPM");

        let response = self.search_request("both", &lookup).call().map_err(|e| match e {
            // 403 from this service is a plain service error, not a quota signal.
            ureq::Error::Status(403, _) => ProviderError::Status(403),
            other => ProviderError::from(other),
        })?;

        if response.status() != 200 {
            return Err(ProviderError::Status(response.status()));
        }

        let body: SearchResponse = response
            .into_json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(match body.search {
            Some(SearchField::Results(results)) => results,
            _ => Vec::new(),
        })
    }
}

impl BpmProvider for GetSongBpmProvider {
    fn name(&self) -> &str {
        "GetSongBPM"
    }

    fn source(&self) -> BpmSource {
        BpmSource::GetSongBpm
    }

    fn lookup_bpm(&mut self, track: &Track) -> BpmLookup {
        let artist = clean_search_term(track.artist());
        let title = clean_search_term(track.name());

        let results = match self.search(&artist, &title) {
            Ok(r) => r,
            Err(e) => {
                match e {
                    ProviderError::RateLimited => warn!("GetSongBPM rate limit exceeded"),
                    ProviderError::Authentication => warn!("GetSongBPM API key invalid"),
                    _ => {}
                }
                return BpmLookup::Failed(e);
            }
        };

        match select_tempo(&results, &artist, &title) {
            Ok(Some(bpm)) => BpmLookup::Found(bpm),
            Ok(None) => BpmLookup::NotFound,
            Err(e) => BpmLookup::Failed(e),
        }
    }

    fn is_available(&self) -> bool {
        match self.search_request("song", "test").timeout(PROBE_TIMEOUT).call() {
            Ok(r) => r.status() == 200,
            Err(ureq::Error::Status(404, _)) => true,
            Err(_) => false,
        }
    }
}
