//! Which onboarding step the user is on, persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::OnboardingError;

/// Number of intro steps shown before the search screen.
pub const DEFAULT_TOTAL_STEPS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingProgress {
    pub current_step: u32,
    pub total_steps: u32,
    pub is_completed: bool,
}

impl Default for OnboardingProgress {
    fn default() -> Self {
        Self {
            current_step: 0,
            total_steps: DEFAULT_TOTAL_STEPS,
            is_completed: false,
        }
    }
}

impl OnboardingProgress {
    /// Move forward one step, stopping at the last one.
    pub fn next_step(&mut self) {
        let last = self.total_steps.saturating_sub(1);
        self.current_step = self.current_step.saturating_add(1).min(last);
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step.saturating_add(1) >= self.total_steps
    }

    pub fn complete(&mut self) {
        self.is_completed = true;
        self.current_step = 0;
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
        self.is_completed = false;
    }
}

/// JSON file holding [`OnboardingProgress`] between launches.
pub struct OnboardingStore {
    path: PathBuf,
}

impl OnboardingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved progress; a missing file means a first launch.
    pub async fn load(&self) -> Result<OnboardingProgress, OnboardingError> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved onboarding progress");
                Ok(OnboardingProgress::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, progress: &OnboardingProgress) -> Result<(), OnboardingError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(progress)?;
        fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_step_saturates_at_last() {
        let mut progress = OnboardingProgress::default();
        progress.next_step();
        progress.next_step();
        assert!(progress.is_last_step());
        progress.next_step();
        assert_eq!(progress.current_step, 2);
    }

    #[test]
    fn complete_and_reset() {
        let mut progress = OnboardingProgress::default();
        progress.next_step();
        progress.complete();
        assert!(progress.is_completed);
        assert_eq!(progress.current_step, 0);

        progress.reset();
        assert_eq!(progress, OnboardingProgress::default());
    }

    #[test]
    fn out_of_range_step_from_disk_does_not_overflow() {
        let mut progress: OnboardingProgress = serde_json::from_str(
            r#"{"currentStep": 4294967295, "totalSteps": 3, "isCompleted": false}"#,
        )
        .unwrap();
        assert!(progress.is_last_step());
        progress.next_step();
        assert_eq!(progress.current_step, 2);
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = OnboardingStore::new(dir.path().join("onboarding.json"));
        assert_eq!(store.load().await.unwrap(), OnboardingProgress::default());
    }

    #[tokio::test]
    async fn progress_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = OnboardingStore::new(dir.path().join("nested/onboarding.json"));

        let mut progress = OnboardingProgress::default();
        progress.next_step();
        store.save(&progress).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.current_step, 1);
        assert!(!loaded.is_completed);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"currentStep\": 1"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onboarding.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = OnboardingStore::new(path);
        assert!(matches!(
            store.load().await,
            Err(OnboardingError::Serialization(_))
        ));
    }
}
