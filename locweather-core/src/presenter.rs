use std::fmt::Debug;

use crate::model::FetchOutcome;

/// Region codes whose users are shown Fahrenheit.
const FAHRENHEIT_REGIONS: [&str; 3] = ["US", "LR", "MM"];

/// Locale variables consulted for the region signal, most specific first.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// The three text fields weather is rendered into, plus a busy indicator.
pub trait DisplaySurface: Send + Sync + Debug {
    fn set_condition_main(&self, text: &str);

    fn set_condition_description(&self, text: &str);

    fn set_temperature(&self, text: &str);

    /// Raised while a network request is in flight.
    fn set_loading(&self, _loading: bool) {}
}

pub fn unit_for_region(region_signal: &str) -> &'static str {
    if FAHRENHEIT_REGIONS.iter().any(|code| region_signal.contains(code)) {
        "°F"
    } else {
        "°C"
    }
}

/// Formats like a JVM double: integral values keep one decimal (`21.0`).
pub fn format_temperature(value: f64, unit: &str) -> String {
    format!("{value:?}{unit}")
}

/// Builds a region signal from the first non-empty locale variable.
pub fn region_signal_from<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    LOCALE_VARS
        .iter()
        .filter_map(|&name| lookup(name))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

pub fn region_signal_from_env() -> String {
    region_signal_from(|name| std::env::var(name).ok())
}

#[derive(Debug, Clone)]
pub struct ResultPresenter {
    region_signal: String,
}

impl ResultPresenter {
    pub fn new(region_signal: impl Into<String>) -> Self {
        Self { region_signal: region_signal.into() }
    }

    /// Writes a successful outcome into `surface`; anything else leaves it untouched.
    ///
    /// Conditions overwrite each other in order, so the last one is what stays
    /// visible. Returns whether any field was written.
    pub fn render(&self, outcome: &FetchOutcome, surface: &dyn DisplaySurface) -> bool {
        let FetchOutcome::Success(result) = outcome else {
            return false;
        };

        for condition in &result.conditions {
            surface.set_condition_main(&condition.main);
            surface.set_condition_description(&condition.description);
        }

        let unit = unit_for_region(&self.region_signal);
        surface.set_temperature(&format_temperature(result.temperature, unit));
        true
    }
}
