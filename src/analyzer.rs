//! Batch analysis: BPM resolution followed by genre lookup for every track.
//!
//! A failure on one track never stops the batch.  BPM problems only leave
//! the track without a tempo; a genre failure removes the track from the
//! analyzed set and is recorded in the report instead.

use std::fmt::Write as _;
use std::rc::Rc;
use tracing::{error, info, warn};

use crate::error::AnalysisError;
use crate::genre::GenreResolver;
use crate::provider::BpmResolver;
use crate::spotify::MusicPlatform;
use crate::track::{BpmSource, Track};

/// Reachability of one configured BPM provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
}

/// Outcome of [`BatchAnalyzer::analyze_tracks`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Tracks that completed both steps, in input order
    pub analyzed: Vec<Track>,
    /// Excluded tracks with the reason, in input order
    pub failures: Vec<(Track, String)>,
}

impl AnalysisReport {
    pub fn total(&self) -> usize {
        self.analyzed.len() + self.failures.len()
    }

    pub fn with_bpm(&self) -> usize {
        self.analyzed.iter().filter(|t| t.bpm.is_some()).count()
    }

    pub fn bpm_from(&self, source: BpmSource) -> usize {
        self.analyzed
            .iter()
            .filter(|t| t.bpm_source == Some(source))
            .count()
    }

    /// Human-readable summary listing at most `failure_limit` failures.
    pub fn summary(&self, failure_limit: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Successfully analyzed {} tracks", self.analyzed.len());
        if !self.failures.is_empty() {
            let _ = writeln!(out, "Failed to analyze {} tracks", self.failures.len());
            for (track, reason) in self.failures.iter().take(failure_limit) {
                let _ = writeln!(out, "   - {}: {}", track.name(), reason);
            }
        }
        out
    }
}

/// Drives BPM and genre resolution over a track collection.
pub struct BatchAnalyzer {
    resolver: BpmResolver,
    genres: GenreResolver,
    platform: Rc<dyn MusicPlatform>,
    platform_first: bool,
}

impl BatchAnalyzer {
    pub fn new(resolver: BpmResolver, platform: Rc<dyn MusicPlatform>) -> Self {
        BatchAnalyzer {
            resolver,
            genres: GenreResolver::new(platform.clone()),
            platform,
            platform_first: false,
        }
    }

    /// Ask the primary platform for tempo before the fallback chain.
    pub fn platform_first(mut self, enabled: bool) -> Self {
        self.platform_first = enabled;
        self
    }

    /// Analyze a single track in place.
    ///
    /// BPM errors are logged and swallowed.  A genre failure is returned.
    pub fn analyze_track(&mut self, track: &mut Track) -> Result<(), AnalysisError> {
        info!(track = %track, "Analyzing");

        if self.platform_first {
            match BpmResolver::resolve_from_platform(self.platform.as_ref(), track) {
                Ok(Some(bpm)) => {
                    track.bpm = Some(bpm);
                    track.bpm_source = Some(BpmSource::Spotify);
                }
                Ok(None) => {}
                Err(e) => error!(track = %track, error = %e, "BPM analysis failed"),
            }
        }

        if track.bpm.is_none() {
            self.resolver.resolve(track).apply_to(track);
        }
        if track.bpm.is_none() {
            warn!(track = %track, "Could not get BPM from any source");
        }

        track.genres = self.genres.resolve(track)?;
        Ok(())
    }

    /// Analyze every track, isolating failures.
    pub fn analyze_tracks(&mut self, tracks: Vec<Track>) -> AnalysisReport {
        let total = tracks.len();
        info!("Analyzing {} tracks...", total);

        let mut report = AnalysisReport::default();

        for (i, mut track) in tracks.into_iter().enumerate() {
            info!("[{}/{}] Processing: {}", i + 1, total, track.name());

            match self.analyze_track(&mut track) {
                Ok(()) => report.analyzed.push(track),
                Err(e) => {
                    error!(track = %track, error = %e, "Failed to analyze track");
                    report.failures.push((track, e.to_string()));
                }
            }
        }

        info!(
            analyzed = report.analyzed.len(),
            failed = report.failures.len(),
            with_bpm = report.with_bpm(),
            "Analysis finished"
        );
        report
    }

    /// Probe every configured BPM provider.  Touches no track.
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        self.resolver
            .probe_all()
            .into_iter()
            .map(|(name, available)| ProviderStatus { name, available })
            .collect()
    }
}
