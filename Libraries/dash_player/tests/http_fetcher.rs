use std::time::Duration;

use dash_player::segment::{Fetcher, HttpFetcher};
use dash_player::{DashPlayer, DownloadErrorKind, PlayerConfig, Termination};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MPD: &str = r#"<MPD type="static"><Period><AdaptationSet contentType="video">
  <Representation id="only" bandwidth="800000"><BaseURL>media/segment_1_.m4s</BaseURL></Representation>
</AdaptationSet></Period></MPD>"#;

#[tokio::test]
async fn success_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5));
    let body = fetcher.fetch(&format!("{}/seg.m4s", server.uri())).await.unwrap();
    assert_eq!(body.len(), 64);
}

#[tokio::test]
async fn empty_2xx_body_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::default();
    let body = fetcher.fetch(&format!("{}/empty", server.uri())).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn non_success_status_is_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5));
    let url = format!("{}/missing.m4s", server.uri());
    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.kind(), DownloadErrorKind::HttpStatus);
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.url(), url);
}

#[tokio::test]
async fn slow_response_is_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_millis(100));
    let err = fetcher.fetch(&format!("{}/slow.m4s", server.uri())).await.unwrap_err();
    assert_eq!(err.kind(), DownloadErrorKind::Timeout);
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    // Nothing listens on a port once its listener is dropped.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let url = format!("http://127.0.0.1:{}/gone.m4s", port);

    let fetcher = HttpFetcher::new(Duration::from_secs(5));
    let err = fetcher.fetch(&url).await.unwrap_err();
    assert_eq!(err.kind(), DownloadErrorKind::Network);
}

#[tokio::test]
async fn session_over_http_uses_numbered_segment_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/manifest.mpd"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MPD))
        .mount(&server)
        .await;
    for n in 1..=3u8 {
        Mock::given(method("GET"))
            .and(path(format!("/content/media/segment_{}_.m4s", n)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![n; 10]))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = PlayerConfig::new(&format!("{}/content/manifest.mpd", server.uri()))
        .terminate_after(Termination::Segments(3));
    let player = DashPlayer::new(config);
    let mut output = Vec::new();

    let summary = player.run(&mut output).await;

    assert!(summary.is_complete(), "{:?}", summary.error);
    assert_eq!(summary.bytes_written, 30);
    assert_eq!(&output[..10], &[1u8; 10]);
    assert_eq!(&output[20..], &[3u8; 10]);
}
