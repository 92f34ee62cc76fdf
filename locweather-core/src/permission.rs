use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tracing::{info, warn};

use crate::{
    model::{DenialReason, Permission, PermissionDecision},
    notify::{Notifier, Prompt, SettingsTarget},
};

pub const GRANTED_NOTICE: &str = "you granted for location";
pub const DENIED_NOTICE: &str = "you denied for location, enable it in settings";

pub const LOCATION_DISABLED_PROMPT: Prompt =
    Prompt { message: "Location disabled", action: "Open settings", dismiss: None };

pub const PERMISSIONS_REQUIRED_PROMPT: Prompt = Prompt {
    message: "Permissions required, Enable them in setting",
    action: "go to settings",
    dismiss: Some("cancel"),
};

/// The platform permission system.
#[async_trait]
pub trait PermissionSystem: Send + Sync + Debug {
    /// Whether any device location source (GPS or network) is switched on.
    fn location_services_enabled(&self) -> bool;

    fn is_granted(&self, permission: Permission) -> bool;

    /// Asks the user for `permissions`, returning one entry per identifier.
    async fn request(&self, permissions: &[Permission]) -> Vec<(Permission, bool)>;
}

/// Obtains location permission before a fix is requested.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    permissions: Arc<dyn PermissionSystem>,
    notifier: Arc<dyn Notifier>,
}

impl PermissionGate {
    pub fn new(permissions: Arc<dyn PermissionSystem>, notifier: Arc<dyn Notifier>) -> Self {
        Self { permissions, notifier }
    }

    pub async fn check_and_request(&self) -> PermissionDecision {
        if !self.permissions.location_services_enabled() {
            info!("location services disabled, skipping permission request");
            self.offer_settings(&LOCATION_DISABLED_PROMPT, SettingsTarget::LocationSources).await;
            return PermissionDecision::Denied(DenialReason::LocationServicesOff);
        }

        let answers = self.permissions.request(Permission::all()).await;

        let mut granted = false;
        for (permission, is_granted) in answers {
            if is_granted {
                info!(%permission, "location permission granted");
                self.notifier.notice(GRANTED_NOTICE);
                granted = true;
            } else {
                info!(%permission, "location permission denied");
                self.notifier.notice(DENIED_NOTICE);
                self.offer_settings(&PERMISSIONS_REQUIRED_PROMPT, SettingsTarget::AppDetails).await;
            }
        }

        if granted {
            PermissionDecision::Granted
        } else {
            PermissionDecision::Denied(DenialReason::UserDenied)
        }
    }

    async fn offer_settings(&self, prompt: &Prompt, target: SettingsTarget) {
        if !self.notifier.prompt(prompt).await {
            return;
        }

        if let Err(err) = self.notifier.open_settings(target) {
            warn!(?target, "failed to open settings: {err:#}");
        }
    }
}
