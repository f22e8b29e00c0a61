//! Session defaults and the one-shot practice settings resolver.

use tracing::{debug, info, warn};

use auditflow_core::practice::PracticeSettingsState;
use auditflow_core::provider::PracticeSettingsSource;
use auditflow_core::session::DisplayMode;

use crate::orchestrator::AuditOrchestrator;

pub const DEFAULT_MATERIALITY_THRESHOLD: f64 = 500.0;

/// Built-in values a session starts from before practice settings arrive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionDefaults {
    pub materiality_threshold: f64,
    pub display_mode: DisplayMode,
}

impl SessionDefaults {
    pub fn new(materiality_threshold: f64, display_mode: DisplayMode) -> Self {
        Self {
            materiality_threshold,
            display_mode,
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self::new(DEFAULT_MATERIALITY_THRESHOLD, DisplayMode::Strict)
    }
}

/// Values the provider state resolves to, if it is ready and usable.
fn resolve(provider: &PracticeSettingsState) -> Option<(f64, DisplayMode)> {
    if provider.is_loading {
        return None;
    }
    let settings = provider.practice_settings.as_ref()?;
    let threshold = settings.default_materiality.as_ref()?.threshold()?;
    let mode = if settings.show_immaterial_by_default {
        DisplayMode::Lenient
    } else {
        DisplayMode::Strict
    };
    Some((threshold, mode))
}

impl AuditOrchestrator {
    /// Feed the current practice settings provider state to the resolver.
    ///
    /// Applies the practice defaults at most once per session. Returns whether
    /// this call fired the latch.
    pub fn observe_practice_settings(&self, provider: &PracticeSettingsState) -> bool {
        let mut state = self.inner.state.lock();
        if state.threshold_initialized {
            return false;
        }
        let Some((threshold, mode)) = resolve(provider) else {
            debug!(
                session_id = %self.inner.session_id,
                is_loading = provider.is_loading,
                "practice settings not applicable, keeping defaults"
            );
            return false;
        };
        state.materiality_threshold = threshold;
        if !state.display_mode_pinned {
            state.display_mode = mode;
        }
        state.threshold_initialized = true;
        info!(
            session_id = %self.inner.session_id,
            threshold,
            display_mode = %state.display_mode,
            "practice settings applied"
        );
        true
    }

    /// Drive the resolver through a provider fetch: loading, then loaded.
    ///
    /// A failed fetch resolves as "no settings" so the defaults stay in place.
    pub async fn load_practice_settings(&self, source: &dyn PracticeSettingsSource) -> bool {
        let _ = self.observe_practice_settings(&PracticeSettingsState::loading());
        let settings = match source.fetch_practice_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(session_id = %self.inner.session_id, error = %e, "failed to load practice settings");
                None
            }
        };
        self.observe_practice_settings(&PracticeSettingsState::loaded(settings))
    }
}
