//! Provider clients against mock HTTP servers.

use std::net::TcpListener;
use std::rc::Rc;
use std::time::Duration;

use mockito::{Matcher, Mock, Server, ServerGuard};

use tempocraft::{
    AcousticBrainzProvider, AnalysisError, BpmLookup, BpmProvider, BpmResolver, GetSongBpmProvider,
    MusicPlatform, ProviderError, SessionError, SpotifyClient, Track,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn json_mock(server: &mut Server, path: impl Into<Matcher>, status: usize, body: &str) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

/// A URL nothing listens on.
fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn track(artist: &str, name: &str) -> Track {
    Track::new("4uLU6hMCjMI75M1A2tKUQC", name, artist, "spotify:track:4uLU6hMCjMI75M1A2tKUQC", 80)
        .unwrap()
}

// ── AcousticBrainz ───────────────────────────────────────────────────────────

const MBID: &str = "0f4e6a1e-ffe5-4a6a-8f8c-0e3f6a9c5b11";

fn recording_search(server: &mut Server, status: usize, body: &str) -> Mock {
    server
        .mock("GET", "/ws/2/recording")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), r#"artist:"Artist" AND recording:"Song""#.into()),
            Matcher::UrlEncoded("fmt".into(), "json".into()),
        ]))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(1)
        .create()
}

fn found_recording(server: &mut Server) -> Mock {
    recording_search(
        server,
        200,
        &format!(r#"{{"recordings": [{{"id": "{}"}}, {{"id": "other"}}]}}"#, MBID),
    )
}

/// Analysis document mock; call `create` (after `expect`, if needed).
fn document(server: &mut Server, level: &str, status: usize, body: &str) -> Mock {
    server
        .mock("GET", format!("/{}/{}", MBID, level).as_str())
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
}

fn acousticbrainz(server: &ServerGuard) -> AcousticBrainzProvider {
    AcousticBrainzProvider::new(TIMEOUT, 0)
        .with_endpoints(&format!("{}/ws/2/recording", server.url()), &server.url())
}

fn song() -> Track {
    track("Artist", "Song")
}

#[test]
fn acousticbrainz_high_level_hit_skips_low_level() {
    let mut server = Server::new();
    let search = found_recording(&mut server);
    let high = document(&mut server, "high-level", 200, r#"{"rhythm": {"bpm": 128.2}}"#)
        .expect(1)
        .create();
    let low = document(&mut server, "low-level", 500, "{}")
        .expect(0)
        .create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::Found(128.2));
    search.assert();
    high.assert();
    low.assert();
}

#[test]
fn acousticbrainz_falls_back_to_low_level_estimates() {
    let mut server = Server::new();
    let _search = found_recording(&mut server);
    let _high = document(&mut server, "high-level", 404, "{}").create();
    let _low = document(
        &mut server,
        "low-level",
        200,
        r#"{"rhythm": {"tempo": {"a": 30.0, "b": 117.0, "c": 140.0}}}"#,
    )
    .create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::Found(117.0));
}

#[test]
fn acousticbrainz_oddly_shaped_high_level_falls_back_to_low_level() {
    let mut server = Server::new();
    let _search = found_recording(&mut server);
    let _high = document(&mut server, "high-level", 200, r#"{"rhythm": []}"#).create();
    let low = document(&mut server, "low-level", 200, r#"{"rhythm": {"bpm": 120.0}}"#)
        .expect(1)
        .create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::Found(120.0));
    low.assert();
}

#[test]
fn acousticbrainz_non_json_high_level_is_a_failure() {
    let mut server = Server::new();
    let _search = found_recording(&mut server);
    let _high = document(&mut server, "high-level", 200, "<html>maintenance</html>").create();
    let low = document(&mut server, "low-level", 200, r#"{"rhythm": {"bpm": 120.0}}"#)
        .expect(0)
        .create();

    assert!(matches!(
        acousticbrainz(&server).lookup_bpm(&song()),
        BpmLookup::Failed(ProviderError::Malformed(_))
    ));
    low.assert();
}

#[test]
fn acousticbrainz_out_of_range_tempo_is_not_found() {
    let mut server = Server::new();
    let _search = found_recording(&mut server);
    let _high = document(&mut server, "high-level", 200, r#"{"rhythm": {"bpm": 250.0}}"#).create();
    let _low = document(&mut server, "low-level", 200, r#"{"rhythm": {"bpm": 45.0}}"#).create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::NotFound);
}

#[test]
fn acousticbrainz_missing_documents_are_not_found() {
    let mut server = Server::new();
    let _search = found_recording(&mut server);
    let _high = document(&mut server, "high-level", 404, "{}").create();
    let _low = document(&mut server, "low-level", 404, "{}").create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::NotFound);
}

#[test]
fn acousticbrainz_document_errors_are_plain_status_failures() {
    for status in [500, 403] {
        let mut server = Server::new();
        let _search = found_recording(&mut server);
        let _high = document(&mut server, "high-level", 404, "{}").create();
        let _low = document(&mut server, "low-level", status, "{}").create();

        assert_eq!(
            acousticbrainz(&server).lookup_bpm(&song()),
            BpmLookup::Failed(ProviderError::Status(status as u16))
        );
    }
}

#[test]
fn acousticbrainz_empty_search_is_not_found() {
    let mut server = Server::new();
    let search = recording_search(&mut server, 200, r#"{"recordings": []}"#);
    let high = document(&mut server, "high-level", 200, r#"{"rhythm": {"bpm": 99.0}}"#)
        .expect(0)
        .create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::NotFound);
    search.assert();
    high.assert();
}

#[test]
fn acousticbrainz_failed_search_degrades_to_not_found() {
    let mut server = Server::new();
    let search = recording_search(&mut server, 503, r#"{"error": "busy"}"#);
    let high = document(&mut server, "high-level", 200, r#"{"rhythm": {"bpm": 99.0}}"#)
        .expect(0)
        .create();

    assert_eq!(acousticbrainz(&server).lookup_bpm(&song()), BpmLookup::NotFound);
    search.assert();
    high.assert();
}

#[test]
fn acousticbrainz_unreachable_document_service_is_a_network_failure() {
    let mut server = Server::new();
    let _search = found_recording(&mut server);
    let mut provider = AcousticBrainzProvider::new(TIMEOUT, 0)
        .with_endpoints(&format!("{}/ws/2/recording", server.url()), &unreachable_url());

    assert!(matches!(
        provider.lookup_bpm(&song()),
        BpmLookup::Failed(ProviderError::Network(_))
    ));
}

#[test]
fn acousticbrainz_probe_treats_404_as_reachable() {
    let mut server = Server::new();
    let _mock = json_mock(&mut server, Matcher::Regex(r"^/[^/]+/high-level$".into()), 404, "{}");

    assert!(acousticbrainz(&server).is_available());
}

// ── GetSongBPM ───────────────────────────────────────────────────────────────

/// Server answering every search with `status`/`body`.  Keep the returned
/// mock alive for the duration of the test.
fn getsongbpm(status: usize, body: &str) -> (ServerGuard, Mock, GetSongBpmProvider) {
    let mut server = Server::new();
    let search = json_mock(&mut server, "/search/", status, body);
    let provider = GetSongBpmProvider::new(None, TIMEOUT).with_base_url(&server.url());
    (server, search, provider)
}

#[test]
fn getsongbpm_matches_cleaned_title() {
    let mut server = Server::new();
    let search = server
        .mock("GET", "/search/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("api_key".into(), "demo".into()),
            Matcher::UrlEncoded("type".into(), "both".into()),
            Matcher::UrlEncoded("lookup".into(), "Daft Punk One More Time".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"search": [
                {"artist": {"name": "Someone Else"}, "song": {"title": "Other"}, "tempo": "90"},
                {"artist": {"name": "Daft Punk"}, "song": {"title": "One More Time"}, "tempo": "123"}
            ]}"#,
        )
        .expect(1)
        .create();
    let mut provider = GetSongBpmProvider::new(None, TIMEOUT).with_base_url(&server.url());

    assert_eq!(
        provider.lookup_bpm(&track("Daft Punk", "One More Time - Radio Edit")),
        BpmLookup::Found(123.0)
    );
    search.assert();
}

#[test]
fn getsongbpm_no_result_object_is_not_found() {
    let (_server, _search, mut provider) =
        getsongbpm(200, r#"{"search": {"error": "no result"}}"#);
    assert_eq!(provider.lookup_bpm(&song()), BpmLookup::NotFound);
}

#[test]
fn getsongbpm_rate_limit_and_bad_key_are_failures() {
    let (_limited_server, _limited_search, mut limited) = getsongbpm(429, "{}");
    assert_eq!(
        limited.lookup_bpm(&song()),
        BpmLookup::Failed(ProviderError::RateLimited)
    );

    let (_unauthorized_server, _unauthorized_search, mut unauthorized) = getsongbpm(401, "{}");
    assert_eq!(
        unauthorized.lookup_bpm(&song()),
        BpmLookup::Failed(ProviderError::Authentication)
    );
}

#[test]
fn getsongbpm_other_statuses_are_plain_service_errors() {
    for status in [500, 403] {
        let (_server, _search, mut provider) = getsongbpm(status, "{}");
        assert_eq!(
            provider.lookup_bpm(&song()),
            BpmLookup::Failed(ProviderError::Status(status as u16))
        );
    }
}

#[test]
fn getsongbpm_unreachable_service_is_a_network_failure() {
    let mut provider = GetSongBpmProvider::new(None, TIMEOUT).with_base_url(&unreachable_url());
    assert!(matches!(
        provider.lookup_bpm(&song()),
        BpmLookup::Failed(ProviderError::Network(_))
    ));
}

#[test]
fn getsongbpm_malformed_tempo_is_a_failure() {
    let (_server, _search, mut provider) = getsongbpm(
        200,
        r#"{"search": [{"artist": {"name": "Artist"}, "song": {"title": "Song"}, "tempo": "fast"}]}"#,
    );
    assert!(matches!(
        provider.lookup_bpm(&song()),
        BpmLookup::Failed(ProviderError::Malformed(_))
    ));
}

// ── Spotify ──────────────────────────────────────────────────────────────────

#[test]
fn spotify_rejected_token_is_an_authentication_error() {
    let mut server = Server::new();
    let _me = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer expired")
        .with_status(401)
        .with_body(r#"{"error": {"status": 401}}"#)
        .create();
    let client = SpotifyClient::new("expired", TIMEOUT).with_base_url(&server.url());

    assert!(matches!(client.connect(), Err(SessionError::Authentication(_))));
}

#[test]
fn spotify_artist_genres() {
    let mut server = Server::new();
    let search = server
        .mock("GET", "/search")
        .match_header("authorization", "Bearer token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "artist:Daft Punk".into()),
            Matcher::UrlEncoded("type".into(), "artist".into()),
            Matcher::UrlEncoded("limit".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"artists": {"items": [{"name": "Daft Punk", "genres": ["filter house", "french house"]}]}}"#,
        )
        .expect(1)
        .create();
    let client = SpotifyClient::new("token", TIMEOUT).with_base_url(&server.url());

    let artist = client.search_artist("Daft Punk").unwrap().unwrap();
    assert_eq!(artist.genres, vec!["filter house", "french house"]);
    search.assert();
}

#[test]
fn spotify_audio_features_quota_is_surfaced() {
    let mut server = Server::new();
    let _mock = json_mock(&mut server, "/audio-features/4uLU6hMCjMI75M1A2tKUQC", 403, "{}");
    let client = SpotifyClient::new("token", TIMEOUT).with_base_url(&server.url());
    let platform: Rc<dyn MusicPlatform> = Rc::new(client);

    let result = BpmResolver::resolve_from_platform(platform.as_ref(), &song());
    assert!(matches!(result, Err(AnalysisError::QuotaExceeded(_))));
}

#[test]
fn spotify_missing_audio_features_is_none() {
    let mut server = Server::new();
    let _mock = json_mock(&mut server, "/audio-features/4uLU6hMCjMI75M1A2tKUQC", 404, "{}");
    let client = SpotifyClient::new("token", TIMEOUT).with_base_url(&server.url());

    assert_eq!(client.audio_features("4uLU6hMCjMI75M1A2tKUQC").unwrap(), None);
}
