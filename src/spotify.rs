//! Spotify Web API client (primary platform).
//!
//! Only the calls the analysis pipeline needs: session check, artist search
//! (for genres) and audio features (for tempo).  Obtaining the access token
//! is left to the caller.

use serde::Deserialize;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ProviderError, SessionError};
use crate::provider::{BpmLookup, BpmProvider};
use crate::track::{BpmSource, Track};
use crate::{PROBE_TIMEOUT, USER_AGENT};

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// An artist as returned by the platform's artist search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlatformArtist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// What the pipeline needs from the primary platform.
pub trait MusicPlatform {
    /// Best artist match for `name`, or `None` when the search is empty.
    fn search_artist(&self, name: &str) -> Result<Option<PlatformArtist>, ProviderError>;

    /// Tempo from the platform's audio features, `None` when unavailable.
    /// A quota rejection is reported as [`ProviderError::QuotaExceeded`].
    fn audio_features(&self, track_id: &str) -> Result<Option<f64>, ProviderError>;

    /// Lightweight reachability check.
    fn is_available(&self) -> bool;
}

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: Option<ArtistPage>,
}

#[derive(Debug, Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<PlatformArtist>,
}

#[derive(Debug, Deserialize)]
struct AudioFeatures {
    tempo: Option<f64>,
}

/// The signed-in user, returned by the session check.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct SpotifyClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(access_token: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();

        SpotifyClient {
            agent,
            base_url: SPOTIFY_API_URL.to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn api_get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Bearer {}", self.access_token))
    }

    /// Verify the session.  Failures here are fatal for a run.
    pub fn connect(&self) -> Result<CurrentUser, SessionError> {
        let response = self.api_get("/me").call().map_err(|e| match e {
            ureq::Error::Status(code @ (401 | 403), _) => SessionError::Authentication(format!(
                "Spotify rejected the access token (status {})",
                code
            )),
            ureq::Error::Status(code, _) => {
                SessionError::Connection(format!("Spotify returned status {}", code))
            }
            ureq::Error::Transport(t) => {
                SessionError::Connection(format!("Network connection failed: {}", t))
            }
        })?;

        let user: CurrentUser = response
            .into_json()
            .map_err(|e| SessionError::Connection(format!("Unreadable user profile: {}", e)))?;

        info!(
            user = user.display_name.as_deref().unwrap_or(&user.id),
            "Connected to Spotify"
        );
        Ok(user)
    }
}

impl MusicPlatform for SpotifyClient {
    fn search_artist(&self, name: &str) -> Result<Option<PlatformArtist>, ProviderError> {
        let response = self
            .api_get("/search")
            .query("q", &format!("artist:{}", name))
            .query("type", "artist")
            .query("limit", "1")
            .call()?;

        let body: ArtistSearchResponse = response
            .into_json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(body.artists.and_then(|page| page.items.into_iter().next()))
    }

    fn audio_features(&self, track_id: &str) -> Result<Option<f64>, ProviderError> {
        let response = match self.api_get(&format!("/audio-features/{}", track_id)).call() {
            Ok(r) => r,
            Err(ureq::Error::Status(404, _)) => {
                debug!(track_id, "No audio features");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let features: AudioFeatures = response
            .into_json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(features.tempo)
    }

    fn is_available(&self) -> bool {
        self.api_get("/me")
            .timeout(PROBE_TIMEOUT)
            .call()
            .map(|r| r.status() == 200)
            .unwrap_or(false)
    }
}

// ── BPM tier ─────────────────────────────────────────────────────────────────

/// Primary-platform audio features as a (last-resort) BPM provider.
pub struct SpotifyTempoProvider {
    platform: Rc<dyn MusicPlatform>,
}

impl SpotifyTempoProvider {
    pub fn new(platform: Rc<dyn MusicPlatform>) -> Self {
        SpotifyTempoProvider { platform }
    }
}

impl BpmProvider for SpotifyTempoProvider {
    fn name(&self) -> &str {
        "Spotify"
    }

    fn source(&self) -> BpmSource {
        BpmSource::Spotify
    }

    fn lookup_bpm(&mut self, track: &Track) -> BpmLookup {
        match self.platform.audio_features(track.id()) {
            Ok(Some(bpm)) if bpm > 0.0 => BpmLookup::Found(bpm),
            Ok(_) => BpmLookup::NotFound,
            Err(e) => BpmLookup::Failed(e),
        }
    }

    fn is_available(&self) -> bool {
        self.platform.is_available()
    }
}
