use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    Router,
};
use rdns_graphql_api::{create_api_routes, AppState};
use rdns_graphql_application::{
    ports::HostnameResolver, services::build_schema, use_cases::ExecuteQueryUseCase,
};
use rdns_graphql_domain::{DomainError, Hostname};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

struct FixedResolver;

#[async_trait]
impl HostnameResolver for FixedResolver {
    async fn resolve_hostname(&self, ip: &str) -> Result<Hostname, DomainError> {
        Hostname::from_ptr_names(ip, ["dns.google."])
    }
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn create_test_app() -> Router {
    let schema = build_schema(Arc::new(FixedResolver)).unwrap();
    let state = AppState {
        execute_query: Arc::new(ExecuteQueryUseCase::new(Arc::new(schema))),
    };
    create_api_routes(state)
}

fn graphql_post() -> Request<Body> {
    Request::builder()
        .uri("/graphql")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"query":"{hostname(ip:\"8.8.8.8\"){name}}"}"#))
        .unwrap()
}

/// Sends `request` through the router with a subscriber capturing this
/// thread's events and returns the log line of the request logger.
async fn send_and_capture(request: Request<Body>) -> String {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let response = create_test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    logs.contents()
        .lines()
        .find(|line| line.contains("request_logger"))
        .map(str::to_string)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_request_logged_with_remote_address() {
    let mut request = graphql_post();
    let remote: SocketAddr = "10.1.2.3:53124".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(remote));

    let line = send_and_capture(request).await;

    assert!(line.contains("INFO"), "{line}");
    assert!(line.contains("method=POST"), "{line}");
    assert!(line.contains("remote=10.1.2.3:53124"), "{line}");
    assert!(line.contains("path=/graphql"), "{line}");
}

#[tokio::test]
async fn test_request_logged_without_connect_info() {
    let line = send_and_capture(graphql_post()).await;

    assert!(line.contains("method=POST"), "{line}");
    assert!(line.contains("remote=unknown"), "{line}");
    assert!(line.contains("path=/graphql"), "{line}");
}

#[tokio::test]
async fn test_get_request_logs_path_without_query_string() {
    let request = Request::builder()
        .uri("/graphql?query=%7Bhostname(ip%3A%228.8.8.8%22)%7Bname%7D%7D")
        .body(Body::empty())
        .unwrap();

    let line = send_and_capture(request).await;

    assert!(line.contains("method=GET"), "{line}");
    assert!(line.contains("path=/graphql"), "{line}");
    assert!(!line.contains("query="), "{line}");
}
