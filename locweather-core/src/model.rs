use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// A validated geographic position, forwarded to the weather endpoint as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A fix exactly as a platform location provider delivered it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude: Some(latitude), longitude: Some(longitude) }
    }
}

impl TryFrom<RawFix> for Coordinate {
    type Error = LocationError;

    fn try_from(fix: RawFix) -> Result<Self, Self::Error> {
        match (fix.latitude, fix.longitude) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Ok(Coordinate { latitude, longitude })
            }
            (None, _) | (_, None) => {
                Err(LocationError::Unavailable("fix is missing a coordinate component".into()))
            }
            _ => Err(LocationError::Unavailable(format!(
                "fix has a non-finite coordinate ({:?}, {:?})",
                fix.latitude, fix.longitude
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
}

/// Current weather at a coordinate, as decoded from the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub conditions: Vec<Condition>,
    pub temperature: f64,
}

/// Result of one fetch attempt, covering success and every distinguished failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(WeatherResult),
    ClientError(u16),
    NotFound,
    GenericError(u16),
    NetworkUnavailable,
    TransportFailure(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Text to show the user for this outcome.
    ///
    /// Only a missing network connection is surfaced; HTTP and transport
    /// failures are logged and otherwise stay silent.
    pub fn user_notice(&self) -> Option<&'static str> {
        match self {
            FetchOutcome::NetworkUnavailable => Some(NO_CONNECTION_NOTICE),
            _ => None,
        }
    }
}

pub const NO_CONNECTION_NOTICE: &str = "No internet connection";

/// The two location permission identifiers, in the order they are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    FineLocation,
    CoarseLocation,
}

impl Permission {
    pub const fn all() -> &'static [Permission] {
        &[Permission::FineLocation, Permission::CoarseLocation]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::FineLocation => "fine-location",
            Permission::CoarseLocation => "coarse-location",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Device location services are switched off; no request was made.
    LocationServicesOff,
    /// The user refused every requested identifier.
    UserDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied(DenialReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    HighAccuracy,
}
