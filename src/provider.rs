//! BPM resolution with pluggable providers and an ordered fallback strategy.
//!
//! The [`BpmProvider`] trait defines a common interface for looking up the
//! tempo of a track.  Implementations live in separate modules:
//!
//! * [`crate::acousticbrainz::AcousticBrainzProvider`]
//! * [`crate::getsongbpm::GetSongBpmProvider`]
//! * [`crate::spotify::SpotifyTempoProvider`]
//!
//! [`BpmResolver::resolve`] tries each provider in order and stops at the
//! first one that returns a usable BPM.

use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::acousticbrainz::AcousticBrainzProvider;
use crate::config::Config;
use crate::error::{AnalysisError, ProviderError};
use crate::getsongbpm::GetSongBpmProvider;
use crate::spotify::{MusicPlatform, SpotifyTempoProvider};
use crate::track::{BpmSource, Track};

// ── Outcome types ────────────────────────────────────────────────────────────

/// Result of one provider's attempt at producing a BPM.
#[derive(Debug, Clone, PartialEq)]
pub enum BpmLookup {
    /// A BPM value that passed the provider's validator
    Found(f64),
    /// The provider answered but had nothing usable (not an error)
    NotFound,
    /// The provider could not answer
    Failed(ProviderError),
}

/// One entry of a track's resolution history.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub source: BpmSource,
    pub outcome: BpmLookup,
}

/// Final answer of the resolver for a single track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub bpm: Option<f64>,
    pub source: Option<BpmSource>,
    /// Providers actually queried, in order
    pub attempts: Vec<Attempt>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.bpm.is_some()
    }

    /// Copy the BPM and its source onto the track, leaving it untouched when
    /// nothing was found.
    pub fn apply_to(&self, track: &mut Track) {
        if let (Some(bpm), Some(source)) = (self.bpm, self.source) {
            track.bpm = Some(bpm);
            track.bpm_source = Some(source);
        }
    }
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// A data source that can report the tempo of a track.
pub trait BpmProvider {
    /// Short display name, e.g. "AcousticBrainz".
    fn name(&self) -> &str;

    /// Tag recorded on tracks whose BPM came from this provider.
    fn source(&self) -> BpmSource;

    /// Look up the BPM of `track`.  Ordinary misses are `BpmLookup::NotFound`,
    /// service problems are `BpmLookup::Failed`.
    fn lookup_bpm(&mut self, track: &Track) -> BpmLookup;

    /// Lightweight reachability check, independent of any track.
    fn is_available(&self) -> bool;
}

// ── Resolver ─────────────────────────────────────────────────────────────────

/// Tries a fixed, ordered list of providers for each track.
pub struct BpmResolver {
    providers: Vec<Box<dyn BpmProvider>>,
}

impl BpmResolver {
    pub fn new(providers: Vec<Box<dyn BpmProvider>>) -> Self {
        BpmResolver { providers }
    }

    /// Standard chain: AcousticBrainz, then GetSongBPM, then (when enabled)
    /// the primary platform as last resort.
    pub fn from_config(config: &Config, platform: Rc<dyn MusicPlatform>) -> Self {
        let mut providers: Vec<Box<dyn BpmProvider>> = vec![
            Box::new(AcousticBrainzProvider::new(
                config.timeout(),
                config.musicbrainz_interval_ms(),
            )),
            Box::new(GetSongBpmProvider::new(
                config.getsongbpm_api_key.as_deref().filter(|_| config.has_getsongbpm_key()),
                config.timeout(),
            )),
        ];
        if config.platform_tempo_fallback() {
            providers.push(Box::new(SpotifyTempoProvider::new(platform)));
        }
        BpmResolver::new(providers)
    }

    pub fn providers(&self) -> &[Box<dyn BpmProvider>] {
        &self.providers
    }

    /// Resolve the BPM of a track.  Never fails: provider errors are logged
    /// and the next provider is tried.  Returns an empty resolution when all
    /// providers are exhausted.
    pub fn resolve(&mut self, track: &Track) -> Resolution {
        let mut resolution = Resolution::default();

        for provider in self.providers.iter_mut() {
            debug!(provider = provider.name(), track = %track, "Trying BPM provider");

            let outcome = match provider.lookup_bpm(track) {
                BpmLookup::Found(bpm) if bpm.is_finite() && bpm > 0.0 => BpmLookup::Found(bpm),
                BpmLookup::Found(bpm) => {
                    debug!(provider = provider.name(), bpm, "Discarding unusable BPM");
                    BpmLookup::NotFound
                }
                other => other,
            };

            resolution.attempts.push(Attempt {
                source: provider.source(),
                outcome: outcome.clone(),
            });

            match outcome {
                BpmLookup::Found(bpm) => {
                    info!(
                        provider = provider.name(),
                        track = %track,
                        bpm,
                        "Got BPM"
                    );
                    resolution.bpm = Some(bpm);
                    resolution.source = Some(provider.source());
                    return resolution;
                }
                BpmLookup::NotFound => {
                    warn!(provider = provider.name(), track = %track, "No BPM found");
                }
                BpmLookup::Failed(e) => {
                    warn!(
                        provider = provider.name(),
                        track = %track,
                        kind = e.kind(),
                        error = %e,
                        "BPM lookup failed"
                    );
                }
            }
        }

        if !self.providers.is_empty() {
            warn!(track = %track, "No BPM found from any source");
        }
        resolution
    }

    /// Query the primary platform's audio features directly.
    ///
    /// Unlike [`BpmResolver::resolve`] this surfaces failures: a 403 becomes
    /// [`AnalysisError::QuotaExceeded`], anything else [`AnalysisError::Bpm`].
    pub fn resolve_from_platform(
        platform: &dyn MusicPlatform,
        track: &Track,
    ) -> Result<Option<f64>, AnalysisError> {
        match platform.audio_features(track.id()) {
            Ok(Some(bpm)) if bpm > 0.0 => {
                info!(track = %track, bpm, "Got BPM via primary platform");
                Ok(Some(bpm))
            }
            Ok(_) => Ok(None),
            Err(ProviderError::QuotaExceeded) => {
                Err(AnalysisError::QuotaExceeded(track.name().to_string()))
            }
            Err(e) => Err(AnalysisError::Bpm(format!(
                "Failed to get BPM for {}: {}",
                track.name(),
                e
            ))),
        }
    }

    /// Availability of every provider, in resolution order.
    pub fn probe_all(&self) -> Vec<(String, bool)> {
        self.providers
            .iter()
            .map(|p| (p.name().to_string(), p.is_available()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Scripted {
        source: BpmSource,
        answer: BpmLookup,
        calls: Rc<Cell<u32>>,
    }

    impl BpmProvider for Scripted {
        fn name(&self) -> &str {
            self.source.as_str()
        }
        fn source(&self) -> BpmSource {
            self.source
        }
        fn lookup_bpm(&mut self, _track: &Track) -> BpmLookup {
            self.calls.set(self.calls.get() + 1);
            self.answer.clone()
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    fn scripted(source: BpmSource, answer: BpmLookup) -> (Box<dyn BpmProvider>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let p = Scripted { source, answer, calls: calls.clone() };
        (Box::new(p), calls)
    }

    fn track() -> Track {
        Track::new("id", "Song", "Artist", "uri:1", 10).unwrap()
    }

    #[test]
    fn test_first_success_short_circuits() {
        let (ab, ab_calls) = scripted(BpmSource::AcousticBrainz, BpmLookup::Found(128.0));
        let (gs, gs_calls) = scripted(BpmSource::GetSongBpm, BpmLookup::Found(90.0));
        let mut resolver = BpmResolver::new(vec![ab, gs]);

        let r = resolver.resolve(&track());
        assert_eq!(r.bpm, Some(128.0));
        assert_eq!(r.source, Some(BpmSource::AcousticBrainz));
        assert_eq!(r.attempts.len(), 1);
        assert_eq!(ab_calls.get(), 1);
        assert_eq!(gs_calls.get(), 0);
    }

    #[test]
    fn test_errors_fall_through_to_next_provider() {
        let (ab, _) = scripted(
            BpmSource::AcousticBrainz,
            BpmLookup::Failed(ProviderError::Status(500)),
        );
        let (gs, gs_calls) = scripted(BpmSource::GetSongBpm, BpmLookup::Found(101.5));
        let mut resolver = BpmResolver::new(vec![ab, gs]);

        let r = resolver.resolve(&track());
        assert_eq!(r.bpm, Some(101.5));
        assert_eq!(r.source, Some(BpmSource::GetSongBpm));
        assert_eq!(gs_calls.get(), 1);
        assert_eq!(
            r.attempts[0].outcome,
            BpmLookup::Failed(ProviderError::Status(500))
        );
    }

    #[test]
    fn test_zero_bpm_counts_as_no_result() {
        let (ab, _) = scripted(BpmSource::AcousticBrainz, BpmLookup::Found(0.0));
        let (gs, _) = scripted(BpmSource::GetSongBpm, BpmLookup::NotFound);
        let mut resolver = BpmResolver::new(vec![ab, gs]);

        let r = resolver.resolve(&track());
        assert!(!r.is_resolved());
        assert_eq!(r.source, None);
        assert_eq!(r.attempts[0].outcome, BpmLookup::NotFound);
        assert_eq!(r.attempts.len(), 2);
    }

    #[test]
    fn test_empty_resolution_leaves_track_untouched() {
        let mut resolver = BpmResolver::new(Vec::new());
        let mut t = track();
        resolver.resolve(&t).apply_to(&mut t);
        assert_eq!(t.bpm, None);
        assert_eq!(t.bpm_source, None);
    }
}
