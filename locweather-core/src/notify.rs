use async_trait::async_trait;
use std::fmt::Debug;

/// System settings screens a prompt can deep-link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTarget {
    /// Device-wide location source settings.
    LocationSources,
    /// This application's own settings page, where permissions are granted.
    AppDetails,
}

/// A dismissible message with one action and an optional explicit dismiss button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub message: &'static str,
    pub action: &'static str,
    pub dismiss: Option<&'static str>,
}

/// User-visible feedback that is not one of the display fields.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Short transient notice.
    fn notice(&self, message: &str);

    /// Shows `prompt` and resolves to `true` if the user took its action.
    async fn prompt(&self, prompt: &Prompt) -> bool;

    fn open_settings(&self, target: SettingsTarget) -> anyhow::Result<()>;
}
