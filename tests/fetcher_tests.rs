use httpxray_rs::error::FetchError;
use httpxray_rs::fetcher::{Fetcher, HttpFetcher, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use httpxray_rs::types::{RedirectHop, ScanTarget};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(DEFAULT_USER_AGENT).expect("client builds")
}

#[tokio::test]
async fn follows_redirects_and_records_each_hop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/final"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Server", "nginx/1.25.3")
                .set_body_string("hello"),
        )
        .mount(&server)
        .await;

    let target = ScanTarget::get(format!("{}/old", server.uri()));
    let resp = fetcher().fetch(&target, DEFAULT_TIMEOUT).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "hello");
    assert_eq!(resp.byte_size, 5);
    assert_eq!(resp.header("server"), Some("nginx/1.25.3"));
    assert_eq!(
        resp.redirects,
        vec![
            RedirectHop {
                url: format!("{}/old", server.uri()),
                status: 301
            },
            RedirectHop {
                url: format!("{}/new", server.uri()),
                status: 302
            },
        ]
    );
}

#[tokio::test]
async fn sends_identifying_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let resp = fetcher()
        .fetch(&ScanTarget::get(server.uri()), DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(resp.status, 204);
    assert!(resp.redirects.is_empty());
}

#[tokio::test]
async fn redirect_loop_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(
            &ScanTarget::get(format!("{}/loop", server.uri())),
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::TooManyRedirects { hops: 30, .. }));
}

#[tokio::test]
async fn non_redirect_3xx_with_location_is_final() {
    let server = MockServer::start().await;
    for (route, status) in [("/choices", 300), ("/cached", 304), ("/proxy", 305)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).insert_header("Location", "/final"))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    for (route, status) in [("/choices", 300), ("/cached", 304), ("/proxy", 305)] {
        let resp = fetcher()
            .fetch(
                &ScanTarget::get(format!("{}{route}", server.uri())),
                DEFAULT_TIMEOUT,
            )
            .await
            .unwrap();
        assert_eq!(resp.status, status);
        assert!(resp.redirects.is_empty());
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&ScanTarget::get(server.uri()), Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn connection_refused_is_reported_not_raised() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = fetcher()
        .fetch(
            &ScanTarget::get(format!("http://127.0.0.1:{port}/")),
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap_err();
    match err {
        FetchError::Request { message, .. } => assert!(!message.is_empty()),
        other => panic!("unexpected error: {other}"),
    }
}
