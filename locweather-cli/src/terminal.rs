use async_trait::async_trait;
use inquire::{Confirm, InquireError, Select};
use locweather_core::{
    Config, DisplaySurface, Notifier, Permission, PermissionSystem, Prompt, SettingsTarget,
};
use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};
use tracing::debug;

/// Notices go to stderr, prompts are interactive.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

#[async_trait]
impl Notifier for TerminalNotifier {
    fn notice(&self, message: &str) {
        eprintln!("{message}");
    }

    async fn prompt(&self, prompt: &Prompt) -> bool {
        let prompt = *prompt;
        match tokio::task::spawn_blocking(move || ask(&prompt)).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(err)) => {
                debug!("prompt dismissed: {err}");
                false
            }
            Err(err) => {
                debug!("prompt task failed: {err}");
                false
            }
        }
    }

    fn open_settings(&self, target: SettingsTarget) -> anyhow::Result<()> {
        let path = Config::config_file_path()?;
        match target {
            SettingsTarget::AppDetails => {
                eprintln!(
                    "Settings live in {}. Re-run with --yes to grant location access.",
                    path.display()
                );
            }
            SettingsTarget::LocationSources => {
                eprintln!(
                    "No location source available. Pass --lat/--lon, set [home] in {}, \
                     or allow IP lookup.",
                    path.display()
                );
            }
        }
        Ok(())
    }
}

fn ask(prompt: &Prompt) -> Result<bool, InquireError> {
    match prompt.dismiss {
        Some(dismiss) => Select::new(prompt.message, vec![prompt.action, dismiss])
            .prompt()
            .map(|choice| choice == prompt.action),
        None => Confirm::new(&format!("{}. {}?", prompt.message, prompt.action))
            .with_default(false)
            .prompt(),
    }
}

/// Asks once for consent covering both location identifiers.
#[derive(Debug)]
pub struct ConsentPermissions {
    location_enabled: bool,
    assume_yes: bool,
    granted: Mutex<HashSet<Permission>>,
}

impl ConsentPermissions {
    pub fn new(location_enabled: bool, assume_yes: bool) -> Self {
        Self { location_enabled, assume_yes, granted: Mutex::new(HashSet::new()) }
    }

    async fn consent(&self) -> bool {
        if self.assume_yes {
            return true;
        }

        let asked = tokio::task::spawn_blocking(|| {
            Confirm::new("Allow locweather to access this device's location?")
                .with_default(false)
                .prompt()
        })
        .await;

        matches!(asked, Ok(Ok(true)))
    }
}

#[async_trait]
impl PermissionSystem for ConsentPermissions {
    fn location_services_enabled(&self) -> bool {
        self.location_enabled
    }

    fn is_granted(&self, permission: Permission) -> bool {
        self.granted.lock().unwrap_or_else(PoisonError::into_inner).contains(&permission)
    }

    async fn request(&self, permissions: &[Permission]) -> Vec<(Permission, bool)> {
        let allowed = self.consent().await;
        if allowed {
            self.granted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(permissions.iter().copied());
        }
        permissions.iter().map(|p| (*p, allowed)).collect()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Fields {
    main: Option<String>,
    description: Option<String>,
    temperature: Option<String>,
}

/// Buffers field writes so only the final value of each is printed.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    fields: Mutex<Fields>,
}

impl TerminalDisplay {
    fn fields(&self) -> std::sync::MutexGuard<'_, Fields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Renders the visible fields, one per line; nothing if none were set.
    pub fn render_text(&self) -> Option<String> {
        let fields = self.fields();
        if *fields == Fields::default() {
            return None;
        }

        let dash = || "-".to_string();
        Some(format!(
            "{}\n{}\n{}",
            fields.main.clone().unwrap_or_else(dash),
            fields.description.clone().unwrap_or_else(dash),
            fields.temperature.clone().unwrap_or_else(dash),
        ))
    }
}

impl DisplaySurface for TerminalDisplay {
    fn set_condition_main(&self, text: &str) {
        self.fields().main = Some(text.to_string());
    }

    fn set_condition_description(&self, text: &str) {
        self.fields().description = Some(text.to_string());
    }

    fn set_temperature(&self, text: &str) {
        self.fields().temperature = Some(text.to_string());
    }

    fn set_loading(&self, loading: bool) {
        if loading {
            eprintln!("Fetching weather...");
        }
    }
}
