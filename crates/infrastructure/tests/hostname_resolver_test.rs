mod helpers;

use helpers::{CapturedLogs, MockPtrServer, PtrAnswer};
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use rdns_graphql_application::ports::HostnameResolver;
use rdns_graphql_domain::DomainError;
use rdns_graphql_infrastructure::system::SystemHostnameResolver;

fn resolver_for(server: &MockPtrServer) -> SystemHostnameResolver {
    let addr = server.addr();
    let name_servers = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
    let config = ResolverConfig::from_parts(None, vec![], name_servers);
    let resolver =
        TokioResolver::builder_with_config(config, TokioConnectionProvider::default()).build();
    SystemHostnameResolver::from_resolver(resolver)
}

#[tokio::test]
async fn test_resolve_uses_first_ptr_name() {
    let server = MockPtrServer::start(PtrAnswer::Names(vec![
        "first.example.",
        "second.example.",
    ]))
    .await
    .unwrap();
    let resolver = resolver_for(&server);

    let hostname = resolver.resolve_hostname("192.0.2.1").await.unwrap();

    assert_eq!(hostname.ip, "192.0.2.1");
    assert_eq!(hostname.name.as_deref(), Some("first.example."));

    server.shutdown();
}

#[tokio::test]
async fn test_resolve_ipv6_address() {
    let server = MockPtrServer::start(PtrAnswer::Names(vec!["v6.example."]))
        .await
        .unwrap();
    let resolver = resolver_for(&server);

    let hostname = resolver.resolve_hostname("2001:db8::1").await.unwrap();

    assert_eq!(hostname.ip, "2001:db8::1");
    assert_eq!(hostname.name.as_deref(), Some("v6.example."));
}

#[tokio::test]
async fn test_successful_lookup_is_logged_at_debug() {
    let server = MockPtrServer::start(PtrAnswer::Names(vec!["dns.example."]))
        .await
        .unwrap();
    let resolver = resolver_for(&server);
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    resolver.resolve_hostname("192.0.2.7").await.unwrap();

    let line = logs
        .contents()
        .lines()
        .find(|line| line.contains("PTR lookup successful"))
        .map(str::to_string)
        .unwrap_or_default();
    assert!(line.contains("DEBUG"), "{line}");
    assert!(line.contains("ip=192.0.2.7"), "{line}");
    assert!(line.contains("dns.example."), "{line}");
}

#[tokio::test]
async fn test_nxdomain_is_lookup_failure() {
    let server = MockPtrServer::start(PtrAnswer::NxDomain).await.unwrap();
    let resolver = resolver_for(&server);
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let err = resolver.resolve_hostname("192.0.2.1").await.unwrap_err();

    assert!(
        matches!(&err, DomainError::LookupFailed { ip, .. } if ip == "192.0.2.1"),
        "{err:?}"
    );
    assert!(err.to_string().starts_with("lookup 192.0.2.1: "), "{err}");

    let line = logs
        .contents()
        .lines()
        .find(|line| line.contains("Reverse lookup failed"))
        .map(str::to_string)
        .unwrap_or_default();
    assert!(line.contains("ERROR"), "{line}");
    assert!(line.contains("ip=192.0.2.1"), "{line}");
}

#[tokio::test]
async fn test_empty_answer_is_reported_as_error() {
    let server = MockPtrServer::start(PtrAnswer::Empty).await.unwrap();
    let resolver = resolver_for(&server);
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let err = resolver.resolve_hostname("192.0.2.9").await.unwrap_err();

    assert!(
        matches!(
            &err,
            DomainError::LookupFailed { ip, .. } | DomainError::NoPtrRecords(ip) if ip == "192.0.2.9"
        ),
        "{err:?}"
    );
    assert!(err.to_string().starts_with("lookup 192.0.2.9: "), "{err}");
    assert!(logs.contents().contains("Reverse lookup failed"));
}

#[tokio::test]
async fn test_resolve_rejects_unparsable_address() {
    let server = MockPtrServer::start(PtrAnswer::Empty).await.unwrap();
    let resolver = resolver_for(&server);
    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber());

    let result = resolver.resolve_hostname("not-an-ip").await;

    assert_eq!(
        result,
        Err(DomainError::InvalidIpAddress("not-an-ip".to_string()))
    );
    assert!(logs.contents().contains("Reverse lookup failed"));
}

#[tokio::test]
async fn test_resolve_rejects_empty_address() {
    let resolver = SystemHostnameResolver::new();

    let result = resolver.resolve_hostname("").await;

    assert!(matches!(result, Err(DomainError::InvalidIpAddress(_))));
}
