use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};

use crate::{
    error::ScreenError,
    fetcher::{Progress, WeatherFetcher},
    location::{LocationProvider, LocationSource},
    model::{DenialReason, FetchOutcome, PermissionDecision},
    notify::Notifier,
    permission::{PermissionGate, PermissionSystem},
    presenter::{DisplaySurface, ResultPresenter},
};

/// Where a retrieval attempt stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalReport {
    LocationDisabled,
    PermissionDenied,
    /// No location permission was held when the fix was requested.
    LocationSkipped,
    LocationUnavailable,
    Rendered(FetchOutcome),
}

/// Platform collaborators a screen is wired to.
#[derive(Debug, Clone)]
pub struct Platform {
    pub permissions: Arc<dyn PermissionSystem>,
    pub notifier: Arc<dyn Notifier>,
    pub location: Arc<dyn LocationProvider>,
    pub display: Arc<dyn DisplaySurface>,
}

/// One weather screen: permission, one fix, one fetch, one render.
#[derive(Debug)]
pub struct WeatherScreen {
    gate: PermissionGate,
    location: LocationSource,
    fetcher: Arc<dyn WeatherFetcher>,
    presenter: ResultPresenter,
    notifier: Arc<dyn Notifier>,
    display: Arc<dyn DisplaySurface>,
    in_flight: AtomicBool,
}

impl WeatherScreen {
    pub fn new(platform: Platform, fetcher: Arc<dyn WeatherFetcher>, presenter: ResultPresenter) -> Self {
        Self {
            gate: PermissionGate::new(platform.permissions.clone(), platform.notifier.clone()),
            location: LocationSource::new(platform.location, platform.permissions),
            fetcher,
            presenter,
            notifier: platform.notifier,
            display: platform.display,
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn start(&self) -> Result<RetrievalReport, ScreenError> {
        let _attempt = Attempt::begin(&self.in_flight)?;

        match self.gate.check_and_request().await {
            PermissionDecision::Granted => {}
            PermissionDecision::Denied(DenialReason::LocationServicesOff) => {
                return Ok(RetrievalReport::LocationDisabled);
            }
            PermissionDecision::Denied(DenialReason::UserDenied) => {
                return Ok(RetrievalReport::PermissionDenied);
            }
        }

        let coordinate = match self.location.request_once().await {
            Ok(Some(coordinate)) => coordinate,
            Ok(None) => return Ok(RetrievalReport::LocationSkipped),
            Err(err) => {
                debug!("{err}");
                return Ok(RetrievalReport::LocationUnavailable);
            }
        };

        info!(latitude = coordinate.latitude, longitude = coordinate.longitude, "fetching weather");
        let outcome = self.fetcher.fetch(coordinate, &DisplayProgress(self.display.as_ref())).await?;

        if let Some(notice) = outcome.user_notice() {
            self.notifier.notice(notice);
        }
        self.presenter.render(&outcome, self.display.as_ref());

        Ok(RetrievalReport::Rendered(outcome))
    }

    /// Releases the pending location subscription, if any.
    pub fn teardown(&self) {
        self.location.teardown();
    }
}

/// Routes the fetcher's busy indicator to the display.
struct DisplayProgress<'a>(&'a dyn DisplaySurface);

impl Progress for DisplayProgress<'_> {
    fn set_loading(&self, loading: bool) {
        self.0.set_loading(loading);
    }
}

/// Marks the screen busy for the lifetime of one attempt.
struct Attempt<'a>(&'a AtomicBool);

impl<'a> Attempt<'a> {
    fn begin(flag: &'a AtomicBool) -> Result<Self, ScreenError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScreenError::AlreadyRunning)?;
        Ok(Self(flag))
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
