//! AcousticBrainz tempo lookup.
//!
//! Two phases: the recording MBID is found with a MusicBrainz recording
//! search, then the AcousticBrainz analysis documents for that MBID are
//! read.  The high-level document is tried first; the low-level document is
//! only fetched when the high-level one has no usable tempo.
//!
//! No API key is needed.  AcousticBrainz stopped accepting submissions in
//! 2022, so many recordings have no documents at all.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ProviderError;
use crate::provider::{BpmLookup, BpmProvider};
use crate::rate_limiter::RateLimiter;
use crate::track::{BpmSource, Track};
use crate::{PROBE_TIMEOUT, USER_AGENT};

pub const ACOUSTICBRAINZ_BASE_URL: &str = "https://acousticbrainz.org";
pub const MUSICBRAINZ_RECORDING_URL: &str = "https://musicbrainz.org/ws/2/recording";

/// Recording used by the availability probe.
const PROBE_MBID: &str = "5b11f4ce-a62d-471e-81fc-a69a8278c7da";

/// Plausible tempo range; anything outside is discarded.
pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 200.0;

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RecordingSearchResponse {
    #[serde(default)]
    recordings: Vec<RecordingHit>,
}

#[derive(Debug, Deserialize)]
struct RecordingHit {
    id: Option<String>,
}

/// A tempo field as found in analysis documents: either one number or a
/// mapping of named estimates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TempoField {
    Number(f64),
    Estimates(serde_json::Map<String, Value>),
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Default, Deserialize)]
struct RhythmSection {
    bpm: Option<TempoField>,
    tempo: Option<TempoField>,
}

/// The part of a high-level or low-level document we care about.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisDocument {
    #[serde(default, deserialize_with = "lenient_rhythm")]
    rhythm: Option<RhythmSection>,
}

/// A `rhythm` entry of unexpected shape reads as absent.
fn lenient_rhythm<'de, D>(deserializer: D) -> Result<Option<RhythmSection>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Which analysis document to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    fn path(&self) -> &'static str {
        match self {
            Level::High => "high-level",
            Level::Low => "low-level",
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

/// Returns the value if it lies within [`MIN_BPM`]..=[`MAX_BPM`].
pub fn validate_bpm(value: f64) -> Option<f64> {
    (MIN_BPM..=MAX_BPM).contains(&value).then_some(value)
}

impl AnalysisDocument {
    /// High-level: `rhythm.bpm`, then `rhythm.tempo`; only plain numbers
    /// count, first valid one wins.
    pub fn high_level_bpm(&self) -> Option<f64> {
        let rhythm = self.rhythm.as_ref()?;
        [&rhythm.bpm, &rhythm.tempo]
            .into_iter()
            .find_map(|field| match field {
                Some(TempoField::Number(v)) => validate_bpm(*v),
                _ => None,
            })
    }

    /// Every valid tempo candidate of a low-level document, in document
    /// order: `rhythm.tempo` (one number or each estimate), then `rhythm.bpm`.
    pub fn low_level_candidates(&self) -> Vec<f64> {
        let Some(rhythm) = self.rhythm.as_ref() else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        match &rhythm.tempo {
            Some(TempoField::Number(v)) => candidates.extend(validate_bpm(*v)),
            Some(TempoField::Estimates(map)) => {
                candidates.extend(map.values().filter_map(Value::as_f64).filter_map(validate_bpm))
            }
            _ => {}
        }
        if let Some(TempoField::Number(v)) = &rhythm.bpm {
            candidates.extend(validate_bpm(*v));
        }
        candidates
    }

    /// First low-level candidate (encounter order, not the best-scoring one).
    pub fn low_level_bpm(&self) -> Option<f64> {
        self.low_level_candidates().into_iter().next()
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Fingerprint-database provider backed by MusicBrainz + AcousticBrainz.
pub struct AcousticBrainzProvider {
    agent: ureq::Agent,
    musicbrainz_url: String,
    acousticbrainz_url: String,
    search_limiter: RateLimiter,
}

impl AcousticBrainzProvider {
    /// * `timeout`: per-request timeout
    /// * `search_interval_ms`: minimum spacing of MusicBrainz searches
    pub fn new(timeout: Duration, search_interval_ms: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();

        AcousticBrainzProvider {
            agent,
            musicbrainz_url: MUSICBRAINZ_RECORDING_URL.to_string(),
            acousticbrainz_url: ACOUSTICBRAINZ_BASE_URL.to_string(),
            search_limiter: RateLimiter::from_millis("MusicBrainz", search_interval_ms),
        }
    }

    /// Point the client at different service roots.
    pub fn with_endpoints(mut self, musicbrainz_url: &str, acousticbrainz_url: &str) -> Self {
        self.musicbrainz_url = musicbrainz_url.trim_end_matches('/').to_string();
        self.acousticbrainz_url = acousticbrainz_url.trim_end_matches('/').to_string();
        self
    }

    /// Find the MusicBrainz recording ID for an artist/title pair.
    ///
    /// The first returned recording is taken as authoritative.  Any failure
    /// degrades to `None`.
    pub fn search_mbid(&mut self, artist: &str, title: &str) -> Option<String> {
        let query = format!("artist:\"{}\" AND recording:\"{}\"", artist, title);

        self.search_limiter.wait_if_needed();

        let response = self
            .agent
            .get(&self.musicbrainz_url)
            .query("query", &query)
            .query("fmt", "json")
            .query("limit", "5")
            .call();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                if matches!(e, ureq::Error::Status(503, _)) {
                    self.search_limiter.report_failure();
                }
                warn!(artist, title, error = %e, "MusicBrainz recording search failed");
                return None;
            }
        };
        self.search_limiter.report_success();

        let search: RecordingSearchResponse = match response.into_json() {
            Ok(s) => s,
            Err(e) => {
                warn!(artist, title, error = %e, "Unreadable MusicBrainz search response");
                return None;
            }
        };

        let mbid = search.recordings.into_iter().find_map(|r| r.id);
        match &mbid {
            Some(id) => info!(artist, title, mbid = %id, "Found MBID"),
            None => warn!(artist, title, "No MBID found"),
        }
        mbid
    }

    fn document_url(&self, mbid: &str, level: Level) -> String {
        format!("{}/{}/{}", self.acousticbrainz_url, mbid, level.path())
    }

    /// Fetch and decode one analysis document.
    pub fn fetch_document(&self, mbid: &str, level: Level) -> Result<AnalysisDocument, ProviderError> {
        let url = self.document_url(mbid, level);
        debug!(mbid, url = %url, "Querying AcousticBrainz");

        let response = self.agent.get(&url).call().map_err(|e| match e {
            ureq::Error::Status(404, _) => {
                ProviderError::NotFound(format!("MBID {} not in AcousticBrainz", mbid))
            }
            ureq::Error::Status(403, _) => ProviderError::Status(403),
            other => ProviderError::from(other),
        })?;

        if response.status() != 200 {
            return Err(ProviderError::Status(response.status()));
        }

        response
            .into_json::<AnalysisDocument>()
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    /// BPM for a known MBID: high-level first, then low-level.
    pub fn bpm_by_mbid(&self, mbid: &str) -> BpmLookup {
        match self.fetch_document(mbid, Level::High) {
            Ok(doc) => {
                if let Some(bpm) = doc.high_level_bpm() {
                    info!(mbid, bpm, "Found BPM via AcousticBrainz high-level");
                    return BpmLookup::Found(bpm);
                }
            }
            // Non-success statuses on the high-level document just move on
            // to the low-level one.
            Err(ProviderError::Network(e)) => return BpmLookup::Failed(ProviderError::Network(e)),
            Err(e @ ProviderError::Malformed(_)) => return BpmLookup::Failed(e),
            Err(e) => debug!(mbid, error = %e, "No usable high-level document"),
        }

        match self.fetch_document(mbid, Level::Low) {
            Ok(doc) => match doc.low_level_bpm() {
                Some(bpm) => {
                    info!(mbid, bpm, "Found BPM via AcousticBrainz low-level");
                    BpmLookup::Found(bpm)
                }
                None => {
                    warn!(mbid, "No BPM found in AcousticBrainz");
                    BpmLookup::NotFound
                }
            },
            Err(ProviderError::NotFound(msg)) => {
                debug!(mbid, "{}", msg);
                BpmLookup::NotFound
            }
            Err(e) => BpmLookup::Failed(e),
        }
    }
}

impl BpmProvider for AcousticBrainzProvider {
    fn name(&self) -> &str {
        "AcousticBrainz"
    }

    fn source(&self) -> BpmSource {
        BpmSource::AcousticBrainz
    }

    fn lookup_bpm(&mut self, track: &Track) -> BpmLookup {
        match self.search_mbid(track.artist(), track.name()) {
            Some(mbid) => self.bpm_by_mbid(&mbid),
            None => BpmLookup::NotFound,
        }
    }

    fn is_available(&self) -> bool {
        let url = self.document_url(PROBE_MBID, Level::High);
        match self.agent.get(&url).timeout(PROBE_TIMEOUT).call() {
            Ok(r) => r.status() == 200,
            Err(ureq::Error::Status(404, _)) => true,
            Err(_) => false,
        }
    }
}
