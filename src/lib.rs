use std::time::Duration;

pub mod acousticbrainz;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod filter;
pub mod genre;
pub mod getsongbpm;
pub mod playlist;
pub mod provider;
pub mod rate_limiter;
pub mod spotify;
pub mod track;

pub use acousticbrainz::AcousticBrainzProvider;
pub use analyzer::{AnalysisReport, BatchAnalyzer, ProviderStatus};
pub use config::Config;
pub use error::{AnalysisError, ConfigError, FilterError, ProviderError, SessionError, TrackError};
pub use filter::{filter_by_bpm, filter_by_genre, filter_combined, TrackFilter};
pub use genre::GenreResolver;
pub use getsongbpm::GetSongBpmProvider;
pub use playlist::PlaylistPlan;
pub use provider::{Attempt, BpmLookup, BpmProvider, BpmResolver, Resolution};
pub use spotify::{MusicPlatform, PlatformArtist, SpotifyClient, SpotifyTempoProvider};
pub use track::{parse_tracks, BpmSource, Track, TrackRecord};

pub const USER_AGENT: &str = concat!(
    "TempoCraft/",
    env!("CARGO_PKG_VERSION"),
    " (BPM playlist builder)"
);

/// Timeout for availability probes (shorter than regular lookups).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
