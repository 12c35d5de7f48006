//! Live theme preference service.
//!
//! # Responsibility
//! - Expose the dark-theme flag as a current value plus subscription.
//! - Persist changes on the blocking pool before publishing them.
//!
//! # Invariants
//! - Observers only see values that were durably written.
//! - Writes are serialized, so publish order matches commit order.

use crate::live::{LiveValue, Subscription};
use crate::model::preference::ThemePreference;
use crate::repo::preference_repo::{PreferenceError, PreferenceRepository, PreferenceResult};
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct ThemeService<P: PreferenceRepository + 'static> {
    repo: Arc<P>,
    value: LiveValue<bool>,
    write_lock: Mutex<()>,
}

impl<P: PreferenceRepository + 'static> ThemeService<P> {
    /// Loads the stored flag (defaulting it on first use).
    ///
    /// Performs blocking I/O.
    pub fn new(repo: P) -> PreferenceResult<Self> {
        let preference = repo.read()?;
        Ok(Self {
            repo: Arc::new(repo),
            value: LiveValue::new(preference.is_dark),
            write_lock: Mutex::new(()),
        })
    }

    pub fn is_dark(&self) -> bool {
        self.value.get()
    }

    /// Subscribes to the flag; the first value is the current one.
    pub fn observe(&self) -> Subscription<bool> {
        self.value.subscribe()
    }

    pub async fn set_dark(&self, is_dark: bool) -> PreferenceResult<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(is_dark).await
    }

    /// Flips the flag and returns the new value.
    pub async fn toggle(&self) -> PreferenceResult<bool> {
        let _guard = self.write_lock.lock().await;
        let next = !self.value.get();
        self.persist(next).await?;
        Ok(next)
    }

    async fn persist(&self, is_dark: bool) -> PreferenceResult<()> {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || repo.write(ThemePreference { is_dark }))
            .await
            .map_err(|join_err| PreferenceError::BackgroundTask(join_err.to_string()))??;

        if self.value.publish(is_dark) {
            info!("event=theme_change module=service status=ok is_dark={is_dark}");
        }
        Ok(())
    }
}
