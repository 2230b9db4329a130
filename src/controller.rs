// controller.rs: panel-side state. Owns the settings record and the usage
// timer, persists every edit, and drives the engine over the request channel.

use crate::engine::{FilterMessage, FilterReply, FilterRequest, FilterStatus};
use crate::settings::{Algorithm, Color, SCALE_DEFAULT, Settings, SettingsStore, load_settings};
use crate::timer::{self, FilterTimer};
use tokio::sync::{mpsc, oneshot};

pub struct Controller {
    settings: Settings,
    timer: FilterTimer,
    store: Box<dyn SettingsStore>,
    engine_tx: mpsc::Sender<FilterRequest>,
}

impl Controller {
    /// Build from already-merged settings. The timer picks up the persisted
    /// anchors so elapsed time keeps counting across restarts.
    pub fn new(
        settings: Settings,
        store: Box<dyn SettingsStore>,
        engine_tx: mpsc::Sender<FilterRequest>,
    ) -> Self {
        let timer = FilterTimer::new(settings.start_time, settings.elapsed_ms);
        Self {
            settings,
            timer,
            store,
            engine_tx,
        }
    }

    pub fn load(store: Box<dyn SettingsStore>, engine_tx: mpsc::Sender<FilterRequest>) -> Self {
        let settings = load_settings(store.as_ref());
        tracing::info!(
            enabled = settings.enabled,
            algorithm = %settings.algorithm,
            "settings loaded"
        );
        Self::new(settings, store, engine_tx)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// MM:SS of total filter-on time, the running stretch included.
    pub fn elapsed_display(&self) -> String {
        timer::format_elapsed(self.timer.elapsed(timer::now_millis()))
    }

    /// Flip the filter and drive the engine to the new state. A failed round
    /// trip rolls the flip back so the panel never reports a state the
    /// document does not have.
    pub async fn toggle(&mut self) -> FilterStatus {
        let previous = (self.settings.clone(), self.timer.clone());
        let now = timer::now_millis();
        if self.settings.enabled {
            self.settings.enabled = false;
            self.timer.stop(now);
        } else {
            self.settings.enabled = true;
            self.timer.start(now);
        }
        self.sync_timer_fields();
        self.persist();
        match self.send_settings().await {
            Some(reply) => reply.status,
            None => {
                let (settings, saved_timer) = previous;
                self.settings = settings;
                self.timer = saved_timer;
                self.persist();
                self.status()
            }
        }
    }

    pub async fn set_color_a(&mut self, color: Color) {
        self.settings.color_a = color;
        self.commit_change().await;
    }

    pub async fn set_color_b(&mut self, color: Color) {
        self.settings.color_b = color;
        self.commit_change().await;
    }

    pub async fn set_background(&mut self, color: Color) {
        self.settings.background = color;
        self.commit_change().await;
    }

    pub async fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.settings.algorithm = algorithm;
        self.commit_change().await;
    }

    pub async fn set_text_scale(&mut self, scale: u16) {
        self.settings.text_scale = Settings::clamp_scale(scale);
        self.commit_change().await;
    }

    /// Bump the scale by `delta` percent, clamped to the allowed range.
    pub async fn adjust_text_scale(&mut self, delta: i32) {
        let target = (i32::from(self.settings.text_scale) + delta).max(0) as u16;
        self.set_text_scale(target).await;
    }

    pub async fn reset_text_scale(&mut self) {
        self.set_text_scale(SCALE_DEFAULT).await;
    }

    /// Re-assert the persisted enabled state against a fresh document. The
    /// original start anchor survives, so a stretch that spans sessions is
    /// counted once and in full. The store is written only when a missing
    /// anchor had to be set; session-only CLI overrides never persist here.
    pub async fn resume(&mut self) -> FilterStatus {
        if !self.settings.enabled {
            return FilterStatus::Disabled;
        }
        self.timer.start(timer::now_millis());
        if self.settings.start_time != self.timer.started_at() {
            self.sync_timer_fields();
            self.persist();
        }
        match self.send_settings().await {
            Some(reply) => reply.status,
            None => self.status(),
        }
    }

    fn status(&self) -> FilterStatus {
        if self.settings.enabled {
            FilterStatus::Enabled
        } else {
            FilterStatus::Disabled
        }
    }

    /// Persist a setting edit and, while the filter is on, push it to the
    /// engine so the recoloring picks it up immediately. The edit is kept
    /// even if the engine is unreachable.
    async fn commit_change(&mut self) {
        self.persist();
        if self.settings.enabled {
            self.send_settings().await;
        }
    }

    fn sync_timer_fields(&mut self) {
        self.settings.start_time = self.timer.started_at();
        self.settings.elapsed_ms = self.timer.accumulated_ms();
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.settings.to_record()) {
            tracing::warn!(error = %e, "failed to persist settings");
        }
    }

    /// One request/reply round trip with the engine. `None` means the engine
    /// is gone or dropped the reply slot.
    async fn send_settings(&self) -> Option<FilterReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = FilterRequest {
            message: FilterMessage::ToggleFilter {
                settings: self.settings.clone(),
            },
            reply: reply_tx,
        };
        if let Err(e) = self.engine_tx.send(request).await {
            tracing::warn!(error = %e, "engine request channel closed");
            return None;
        }
        match reply_rx.await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(error = %e, "engine dropped the reply");
                None
            }
        }
    }
}
