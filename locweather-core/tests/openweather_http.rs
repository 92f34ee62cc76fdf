//! Integration tests for OpenWeatherFetcher using wiremock.
//!
//! These tests verify request construction and response classification
//! against a mock HTTP server.

use std::sync::Arc;

use locweather_core::{
    Coordinate, FetchError, FetchOutcome, NoProgress, OpenWeatherFetcher, StaticConnectivity,
    WeatherFetcher,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BERLIN: Coordinate = Coordinate { latitude: 52.52, longitude: 13.405 };

fn fetcher(server: &MockServer, online: bool) -> OpenWeatherFetcher {
    OpenWeatherFetcher::new("TEST_KEY".into(), Arc::new(StaticConnectivity(online)))
        .with_base_url(server.uri())
}

fn current_weather() -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 13.405, "lat": 52.52},
        "weather": [
            {"id": 804, "main": "Clouds", "description": "overcast", "icon": "04d"},
            {"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}
        ],
        "main": {"temp": 21.5, "feels_like": 20.9, "pressure": 1012, "humidity": 64},
        "name": "Berlin",
        "cod": 200
    })
}

#[tokio::test]
async fn test_success_sends_coordinates_units_and_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "52.52"))
        .and(query_param("lon", "13.405"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = fetcher(&mock_server, true).fetch(BERLIN, &NoProgress).await.unwrap();

    let FetchOutcome::Success(result) = &outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(result.temperature, 21.5);
    assert_eq!(result.conditions.len(), 2);
    assert_eq!(result.conditions[1].main, "Rain");
    assert_eq!(result.conditions[1].description, "light rain");
}

#[tokio::test]
async fn test_configured_units_are_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = fetcher(&mock_server, true).with_units("imperial").fetch(BERLIN, &NoProgress).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    for (status, expected) in [
        (400u16, FetchOutcome::ClientError(400)),
        (404, FetchOutcome::NotFound),
        (401, FetchOutcome::GenericError(401)),
        (500, FetchOutcome::GenericError(500)),
        (599, FetchOutcome::GenericError(599)),
    ] {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(serde_json::json!({"cod": status, "message": "nope"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = fetcher(&mock_server, true).fetch(BERLIN, &NoProgress).await.unwrap();
        assert_eq!(outcome, expected, "status {status}");
        assert_eq!(outcome.user_notice(), None);
    }
}

#[tokio::test]
async fn test_offline_never_calls_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let outcome = fetcher(&mock_server, false).fetch(BERLIN, &NoProgress).await.unwrap();

    assert_eq!(outcome, FetchOutcome::NetworkUnavailable);
    assert_eq!(outcome.user_notice(), Some("No internet connection"));
}

#[tokio::test]
async fn test_malformed_success_body_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"weather": "sunny"})),
        )
        .mount(&mock_server)
        .await;

    let err = fetcher(&mock_server, true).fetch(BERLIN, &NoProgress).await.unwrap_err();

    match err {
        FetchError::MalformedPayload { body, .. } => assert!(body.contains("sunny")),
        other => panic!("expected malformed payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let fetcher = OpenWeatherFetcher::new("TEST_KEY".into(), Arc::new(StaticConnectivity(true)))
        .with_base_url("http://127.0.0.1:1");

    let outcome = fetcher.fetch(BERLIN, &NoProgress).await.unwrap();

    assert!(matches!(outcome, FetchOutcome::TransportFailure(ref msg) if !msg.is_empty()));
    assert_eq!(outcome.user_notice(), None);
}
