//! Enrich a list of tracks with BPM and genres, then print the subset that
//! matches the given tempo/genre criteria together with its playlist plan.
//!
//! The track file is a JSON array of platform track items
//! (`{"id", "name", "uri", "popularity", "artists": [{"name"}]}`).
//!
//! Usage:
//!     tempocraft <TRACKS_JSON> [--min-bpm N --max-bpm N] [--genre KEYWORD] [--status] [--verbose]
//!
//! Logging goes to stderr; `RUST_LOG` overrides the default level.

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::process;
use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use tempocraft::{
    parse_tracks, BatchAnalyzer, BpmResolver, BpmSource, Config, MusicPlatform, PlaylistPlan,
    SpotifyClient, TrackFilter, TrackRecord,
};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");

    init_logging(verbose);

    if let Err(e) = run(&args, verbose) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Value following `flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).map(|s| s.as_str())
}

fn parse_bpm_flag(args: &[String], flag: &str) -> Result<Option<f64>, Box<dyn Error>> {
    match flag_value(args, flag) {
        Some(v) => Ok(Some(
            v.parse()
                .map_err(|_| format!("{} must be a number, got {:?}", flag, v))?,
        )),
        None => Ok(None),
    }
}

fn run(args: &[String], verbose: bool) -> Result<(), Box<dyn Error>> {
    let tracks_file = args
        .iter()
        .enumerate()
        .find(|(i, a)| {
            !a.starts_with('-')
                && !(*i > 0 && matches!(args[i - 1].as_str(), "--min-bpm" | "--max-bpm" | "--genre"))
        })
        .map(|(_, a)| a.as_str())
        .ok_or("Usage: tempocraft <TRACKS_JSON> [--min-bpm N --max-bpm N] [--genre KEYWORD] [--status] [--verbose]")?;
    let show_status = args.iter().any(|a| a == "--status");

    // Validate criteria before touching the network.
    let filter = TrackFilter::new(
        parse_bpm_flag(args, "--min-bpm")?,
        parse_bpm_flag(args, "--max-bpm")?,
        flag_value(args, "--genre"),
    )?;

    let mut config = Config::load()?;
    config.apply_env();
    if verbose {
        config.print("Configuration");
        println!();
    }

    let token = config
        .spotify_access_token
        .clone()
        .ok_or("No Spotify access token (set SPOTIFY_ACCESS_TOKEN or spotify_access_token)")?;

    // ── Session ──────────────────────────────────────────────────────────
    let client = Rc::new(SpotifyClient::new(&token, config.timeout()));
    let user = client.connect()?;
    println!(
        "Connected as {}",
        user.display_name.as_deref().unwrap_or(&user.id)
    );

    // ── Tracks ───────────────────────────────────────────────────────────
    let records: Vec<TrackRecord> =
        serde_json::from_reader(BufReader::new(File::open(tracks_file)?))?;
    println!("Parsing {} tracks...", records.len());

    let (tracks, rejected) = parse_tracks(records);
    for (position, reason) in &rejected {
        println!("Skipping track {}: {}", position, reason);
    }

    // ── Analysis ─────────────────────────────────────────────────────────
    let platform: Rc<dyn MusicPlatform> = client.clone();
    let resolver = BpmResolver::from_config(&config, platform.clone());
    let mut analyzer = BatchAnalyzer::new(resolver, platform);

    if show_status {
        println!("Fallback status:");
        for status in analyzer.provider_status() {
            println!(
                "   {}: {}",
                status.name,
                if status.available { "available" } else { "unavailable" }
            );
        }
    }

    let report = analyzer.analyze_tracks(tracks);

    println!();
    println!("=== Analysis Results ===");
    for (i, track) in report.analyzed.iter().enumerate() {
        let bpm = match (track.bpm, track.bpm_source) {
            (Some(bpm), Some(source)) => format!("{:.1} (from {})", bpm, source),
            (Some(bpm), None) => format!("{:.1}", bpm),
            _ => "unknown".to_string(),
        };
        let genres = if track.genres.is_empty() {
            "None".to_string()
        } else {
            track.genres.join(", ")
        };
        println!("{:>3}. {}", i + 1, track);
        println!("     BPM: {}   Genres: {}", bpm, genres);
    }
    println!();
    print!("{}", report.summary(config.failure_report_limit()));
    println!(
        "Tracks with BPM: {} (AcousticBrainz {}, GetSongBPM {}, Spotify {})",
        report.with_bpm(),
        report.bpm_from(BpmSource::AcousticBrainz),
        report.bpm_from(BpmSource::GetSongBpm),
        report.bpm_from(BpmSource::Spotify)
    );

    // ── Selection ────────────────────────────────────────────────────────
    if filter.is_empty() {
        return Ok(());
    }

    let selected = filter.apply(&report.analyzed);
    println!();
    println!("=== Selection ({} tracks) ===", selected.len());
    for track in &selected {
        println!("  {}  {}", track.uri(), track);
    }

    if let Some((min, max)) = filter.bpm_range {
        match PlaylistPlan::new(&selected, min, max, filter.genre.as_deref()) {
            Some(plan) => {
                println!();
                println!("Playlist: {}", plan.name);
                println!("  {}", plan.description);
                println!("  {} insertion request(s)", plan.batches().count());
            }
            None => println!("No tracks match the specified criteria"),
        }
    }

    Ok(())
}
