use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, Select};
use locweather_core::{
    Config, Coordinate, DnsConnectivity, HomeLocation, OpenWeatherFetcher, Platform,
    ResultPresenter, WeatherScreen, presenter::region_signal_from_env,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    geo::{self, NoLocation},
    terminal::{ConsentPermissions, TerminalDisplay, TerminalNotifier},
};

const UNIT_SYSTEMS: [&str; 3] = ["metric", "imperial", "standard"];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "locweather", version, about = "Current weather where you are")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the API key, unit system and home location.
    Configure,

    /// Locate this device and show the current weather there.
    Show {
        /// Latitude to use instead of looking the device up.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude to use instead of looking the device up.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Region signal for the unit glyph, e.g. "en_US". Defaults to the locale.
        #[arg(long)]
        region: Option<String>,

        /// Grant location access without asking.
        #[arg(short = 'y', long)]
        yes: bool,

        /// Never fall back to IP-based geolocation.
        #[arg(long)]
        no_ip_lookup: bool,
    },

    /// Print the path of the configuration file.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon, region, yes, no_ip_lookup } => {
                let explicit = lat.zip(lon).map(|(latitude, longitude)| Coordinate { latitude, longitude });
                show(explicit, region, yes, !no_ip_lookup).await
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

async fn show(
    explicit: Option<Coordinate>,
    region: Option<String>,
    assume_yes: bool,
    allow_ip_lookup: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    let connectivity = Arc::new(DnsConnectivity::from_config(&config)?);
    let fetcher = OpenWeatherFetcher::from_config(&config, connectivity)?;

    let provider = geo::select_provider(explicit, config.home.map(Coordinate::from), allow_ip_lookup);
    let location_enabled = provider.is_some();

    let region = region.or_else(|| config.region.clone()).unwrap_or_else(region_signal_from_env);
    info!(%region, "region signal");

    let display = Arc::new(TerminalDisplay::default());
    let platform = Platform {
        permissions: Arc::new(ConsentPermissions::new(location_enabled, assume_yes)),
        notifier: Arc::new(TerminalNotifier),
        location: provider.unwrap_or_else(|| Arc::new(NoLocation)),
        display: display.clone(),
    };

    let screen = WeatherScreen::new(platform, Arc::new(fetcher), ResultPresenter::new(region));
    let report = screen.start().await.context("Weather retrieval failed")?;
    screen.teardown();
    info!(?report, "retrieval finished");

    if let Some(text) = display.render_text() {
        println!("{text}");
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .with_help_message("Find it under \"My API keys\" on openweathermap.org")
        .prompt()
        .context("API key prompt aborted")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let current = UNIT_SYSTEMS.iter().position(|u| *u == config.units).unwrap_or(0);
    let units = Select::new("Unit system sent to the API:", UNIT_SYSTEMS.to_vec())
        .with_starting_cursor(current)
        .prompt()
        .context("Unit prompt aborted")?;
    config.units = units.to_string();

    let wants_home = Confirm::new("Set a fixed home location?")
        .with_default(config.home.is_some())
        .prompt()
        .context("Home location prompt aborted")?;
    config.home = if wants_home {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a number")
            .prompt()
            .context("Latitude prompt aborted")?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a number")
            .prompt()
            .context("Longitude prompt aborted")?;
        Some(HomeLocation { latitude, longitude })
    } else {
        None
    };

    config.require_api_key()?;
    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}
