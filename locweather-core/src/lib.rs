//! Core library for the `locweather` CLI.
//!
//! This crate defines:
//! - Shared domain models (coordinates, weather results, fetch outcomes)
//! - Configuration & credentials handling
//! - Traits for the platform collaborators (permissions, location, display, notices)
//! - The single-shot retrieval pipeline that sequences them
//!
//! It is used by `locweather-cli`, but any front-end that can implement the
//! platform traits can drive a [`WeatherScreen`].

pub mod config;
pub mod connectivity;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod model;
pub mod notify;
pub mod permission;
pub mod presenter;
pub mod screen;

pub use config::{Config, HomeLocation};
pub use connectivity::{Connectivity, DnsConnectivity, StaticConnectivity};
pub use error::{FetchError, LocationError, ScreenError};
pub use fetcher::{NoProgress, OpenWeatherFetcher, Progress, WeatherFetcher};
pub use location::{FixHandler, LocationProvider, LocationSource, SubscriptionId};
pub use model::{
    Condition, Coordinate, DenialReason, FetchOutcome, Permission, PermissionDecision, Priority,
    RawFix, WeatherResult,
};
pub use notify::{Notifier, Prompt, SettingsTarget};
pub use permission::{PermissionGate, PermissionSystem};
pub use presenter::{DisplaySurface, ResultPresenter, unit_for_region};
pub use screen::{Platform, RetrievalReport, WeatherScreen};
