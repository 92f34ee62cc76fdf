use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, error, info};

use crate::{
    config::{Config, DEFAULT_BASE_URL, DEFAULT_UNITS},
    connectivity::Connectivity,
    error::FetchError,
    model::{Condition, Coordinate, FetchOutcome, WeatherResult},
};

/// Busy indicator shown while a request is on the wire.
pub trait Progress: Send + Sync {
    fn set_loading(&self, loading: bool);
}

/// For callers with nothing to indicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_loading(&self, _loading: bool) {}
}

/// Raises `progress` and lowers it again when dropped, including on cancellation.
struct Loading<'a>(&'a dyn Progress);

impl<'a> Loading<'a> {
    fn raise(progress: &'a dyn Progress) -> Self {
        progress.set_loading(true);
        Self(progress)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}

#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    /// Issues at most one request for `coordinate` and classifies the answer.
    ///
    /// `progress` is raised only while a request is actually in flight. Only a
    /// success body that cannot be decoded is an `Err`.
    async fn fetch(
        &self,
        coordinate: Coordinate,
        progress: &dyn Progress,
    ) -> Result<FetchOutcome, FetchError>;
}

/// Current weather from the OpenWeatherMap `data/2.5/weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    api_key: String,
    base_url: String,
    units: String,
    http: Client,
    connectivity: Arc<dyn Connectivity>,
}

impl OpenWeatherFetcher {
    pub fn new(api_key: String, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: DEFAULT_UNITS.to_string(),
            http: Client::new(),
            connectivity,
        }
    }

    pub fn from_config(config: &Config, connectivity: Arc<dyn Connectivity>) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?.to_owned();
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            units: config.units.clone(),
            http,
            connectivity,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    weather: Vec<OwWeather>,
    main: OwMain,
}

impl From<OwCurrentResponse> for WeatherResult {
    fn from(parsed: OwCurrentResponse) -> Self {
        WeatherResult {
            conditions: parsed
                .weather
                .into_iter()
                .map(|w| Condition { main: w.main, description: w.description })
                .collect(),
            temperature: parsed.main.temp,
        }
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherFetcher {
    async fn fetch(
        &self,
        coordinate: Coordinate,
        progress: &dyn Progress,
    ) -> Result<FetchOutcome, FetchError> {
        if !self.connectivity.is_available().await {
            info!("no network connection, weather request not sent");
            return Ok(FetchOutcome::NetworkUnavailable);
        }

        let _loading = Loading::raise(progress);

        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();

        let sent = self
            .http
            .get(self.endpoint())
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", self.units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await;

        let res = match sent {
            Ok(res) => res,
            Err(err) => return Ok(logged(FetchOutcome::TransportFailure(err.to_string()))),
        };

        let status = res.status();
        if !status.is_success() {
            return Ok(logged(classify_status(status.as_u16())));
        }

        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => return Ok(logged(FetchOutcome::TransportFailure(err.to_string()))),
        };

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|source| FetchError::MalformedPayload { source, body: truncate_body(&body) })?;

        let result = WeatherResult::from(parsed);
        debug!(?result, "weather response");
        Ok(FetchOutcome::Success(result))
    }
}

/// Maps a non-success HTTP status to its outcome.
pub fn classify_status(code: u16) -> FetchOutcome {
    match code {
        400 => FetchOutcome::ClientError(400),
        404 => FetchOutcome::NotFound,
        other => FetchOutcome::GenericError(other),
    }
}

fn logged(outcome: FetchOutcome) -> FetchOutcome {
    match &outcome {
        FetchOutcome::ClientError(code) => error!(status = code, "Bad connection"),
        FetchOutcome::NotFound => error!(status = 404, "Not found"),
        FetchOutcome::GenericError(code) => error!(status = code, "generic error"),
        FetchOutcome::TransportFailure(message) => error!("fail: {message}"),
        FetchOutcome::Success(_) | FetchOutcome::NetworkUnavailable => {}
    }
    outcome
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
