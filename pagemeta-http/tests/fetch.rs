use pagemeta_http::{DEFAULT_USER_AGENT, FetchOptions, FetchedPage, HttpError, PageFetcher};
use reqwest::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn read_all(page: &mut FetchedPage) -> Result<Vec<u8>, HttpError> {
    let mut body = Vec::new();
    while let Some(chunk) = page.chunk().await? {
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn url_for(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

#[tokio::test]
async fn sends_browser_user_agent_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(FetchOptions::default()).unwrap();
    let mut page = fetcher.fetch(&url_for(&server, "/article")).await.unwrap();
    assert_eq!(page.status(), 200);
    let body = read_all(&mut page).await.unwrap();
    assert_eq!(body, b"<html></html>");
    assert_eq!(page.bytes_received(), body.len());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let ua = requests[0]
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(ua, DEFAULT_USER_AGENT);
}

#[tokio::test]
async fn custom_user_agent_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let fetcher =
        PageFetcher::new(FetchOptions::default().with_user_agent("pagemeta-test/1.0")).unwrap();
    let _page = fetcher.fetch(&url_for(&server, "/")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let ua = requests[0]
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(ua, "pagemeta-test/1.0");
}

#[tokio::test]
async fn error_status_still_yields_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<title>Not Found</title>"))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(FetchOptions::default()).unwrap();
    let mut page = fetcher.fetch(&url_for(&server, "/missing")).await.unwrap();
    assert_eq!(page.status(), 404);
    let body = read_all(&mut page).await.unwrap();
    assert_eq!(body, b"<title>Not Found</title>");
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

    let fetcher = PageFetcher::new(FetchOptions::default()).unwrap();
    let err = fetcher.fetch(&url).await.err().expect("fetch should fail");
    assert!(
        matches!(err, HttpError::Connect(_) | HttpError::Network(_)),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn non_http_scheme_is_rejected_before_sending() {
    let fetcher = PageFetcher::new(FetchOptions::default()).unwrap();
    let url = Url::parse("ftp://example.com/file").unwrap();
    let err = fetcher.fetch(&url).await.err().expect("fetch should fail");
    assert!(matches!(err, HttpError::Url(_)));
    assert_eq!(err.to_string(), "invalid URL: unsupported scheme: ftp");
}
