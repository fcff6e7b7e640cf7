use node_index::services::{
    CountryResolver, HttpProfileProbe, LibraryCountryResolver, ProbeOutcome, ProfileProbe,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn probe_with(response: ResponseTemplate) -> ProbeOutcome {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile.json"))
        .respond_with(response)
        .mount(&server)
        .await;

    let probe = HttpProfileProbe::new(Duration::from_secs(2)).unwrap();
    probe.probe(&format!("{}/profile.json", server.uri())).await
}

#[tokio::test]
async fn test_json_profile_is_reachable() {
    let outcome =
        probe_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "IC3" }))).await;
    assert_eq!(outcome, ProbeOutcome::Reachable { status: 200 });
}

#[tokio::test]
async fn test_json_error_body_is_reachable_with_status() {
    let outcome =
        probe_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" }))).await;
    assert_eq!(outcome, ProbeOutcome::Reachable { status: 500 });
}

#[tokio::test]
async fn test_missing_profile_is_gone() {
    let outcome = probe_with(ResponseTemplate::new(404).set_body_json(json!({}))).await;
    assert!(outcome.is_gone());
}

#[tokio::test]
async fn test_redirect_is_gone() {
    let outcome = probe_with(
        ResponseTemplate::new(301).insert_header("Location", "https://elsewhere.org/profile.json"),
    )
    .await;
    assert!(outcome.is_gone());
}

#[tokio::test]
async fn test_html_body_is_gone() {
    let outcome =
        probe_with(ResponseTemplate::new(200).set_body_string("<html>parked domain</html>")).await;
    assert!(outcome.is_gone());
}

#[tokio::test]
async fn test_unreachable_host_is_gone() {
    let probe = HttpProfileProbe::new(Duration::from_millis(500)).unwrap();
    let outcome = probe.probe("http://127.0.0.1:1/profile.json").await;
    assert!(outcome.is_gone());
}

#[tokio::test]
async fn test_country_aliases_are_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DE": ["Germany", "Deutschland"],
            "CI": ["Côte d'Ivoire", "Ivory Coast"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = LibraryCountryResolver::new(&server.uri(), Duration::from_secs(2)).unwrap();

    assert_eq!(resolver.find_alpha2("deutschland").await.unwrap().as_deref(), Some("DE"));
    assert_eq!(resolver.find_alpha2(" Ivory Coast ").await.unwrap().as_deref(), Some("CI"));
    assert_eq!(resolver.find_alpha2("Atlantis").await.unwrap(), None);
}

#[tokio::test]
async fn test_country_service_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/countries"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let resolver = LibraryCountryResolver::new(&server.uri(), Duration::from_secs(2)).unwrap();
    let err = resolver.find_alpha2("Germany").await.unwrap_err();
    assert!(err.is_transient());
}
