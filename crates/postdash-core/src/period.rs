//! Process-wide reporting period selection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use postdash_api::ReportingPeriod;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;

/// Key the selected period is stored under.
pub const PERIOD_KEY: &str = "postalStatsPeriod";

/// Somewhere the selected period survives restarts.
pub trait PeriodStorage: Send + Sync {
    /// Reads the stored value, if any. Unreadable storage reads as empty.
    fn load(&self) -> Option<String>;

    /// Replaces the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, value: &str) -> Result<()>;

    /// Removes the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self) -> Result<()>;
}

/// Stores the period in a JSON preferences file, next to any other keys the
/// file already holds.
#[derive(Debug, Clone)]
pub struct FilePeriodStorage {
    path: PathBuf,
}

impl FilePeriodStorage {
    /// Storage backed by the file at `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the preferences file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Map<String, Value> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!("Ignoring malformed preferences file {}", self.path.display());
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }

    fn write(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl PeriodStorage for FilePeriodStorage {
    fn load(&self) -> Option<String> {
        match self.read().remove(PERIOD_KEY) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        }
    }

    fn save(&self, value: &str) -> Result<()> {
        let mut map = self.read();
        map.insert(PERIOD_KEY.to_string(), Value::String(value.to_string()));
        self.write(map)
    }

    fn remove(&self) -> Result<()> {
        let mut map = self.read();
        if map.remove(PERIOD_KEY).is_some() {
            self.write(map)?;
        }
        Ok(())
    }
}

/// In-process period storage.
#[derive(Debug, Default)]
pub struct MemoryPeriodStorage(Mutex<Option<String>>);

impl MemoryPeriodStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage holding `value`.
    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        Self(Mutex::new(Some(value.into())))
    }
}

impl PeriodStorage for MemoryPeriodStorage {
    fn load(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn save(&self, value: &str) -> Result<()> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Holds the selected [`ReportingPeriod`] and notifies subscribers when it
/// changes.
#[derive(Clone)]
pub struct PeriodStore {
    storage: Arc<dyn PeriodStorage>,
    current: Arc<watch::Sender<ReportingPeriod>>,
}

impl fmt::Debug for PeriodStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodStore")
            .field("current", &self.period())
            .finish_non_exhaustive()
    }
}

impl PeriodStore {
    /// Loads the stored period; a missing or unknown value yields the
    /// default.
    #[must_use]
    pub fn new(storage: Arc<dyn PeriodStorage>) -> Self {
        let period = storage
            .load()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        debug!("Reporting period is {period}");
        let (current, _) = watch::channel(period);
        Self {
            storage,
            current: Arc::new(current),
        }
    }

    /// Selected period.
    #[must_use]
    pub fn period(&self) -> ReportingPeriod {
        *self.current.borrow()
    }

    /// Subscribes to period changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReportingPeriod> {
        self.current.subscribe()
    }

    /// Selects `period` and persists it. Subscribers are notified only when
    /// the value changes.
    pub fn set_period(&self, period: ReportingPeriod) {
        if let Err(e) = self.storage.save(period.as_str()) {
            warn!("Could not persist reporting period: {e}");
        }
        let changed = self.current.send_if_modified(|current| {
            let changed = *current != period;
            *current = period;
            changed
        });
        if changed {
            debug!("Reporting period changed to {period}");
        }
    }

    /// Selects the period named by `value`. Unknown names are ignored and the
    /// current period is kept.
    ///
    /// Returns true if `value` named a period.
    pub fn set_period_str(&self, value: &str) -> bool {
        match value.parse() {
            Ok(period) => {
                self.set_period(period);
                true
            }
            Err(e) => {
                debug!("{e}");
                false
            }
        }
    }

    /// Resets to the default period and removes the stored value.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove() {
            warn!("Could not remove stored reporting period: {e}");
        }
        self.current.send_if_modified(|current| {
            let changed = *current != ReportingPeriod::default();
            *current = ReportingPeriod::default();
            changed
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(storage: &Arc<MemoryPeriodStorage>) -> PeriodStore {
        PeriodStore::new(storage.clone())
    }

    #[test]
    fn test_default_when_nothing_stored() {
        let storage = Arc::new(MemoryPeriodStorage::new());
        assert_eq!(store(&storage).period(), ReportingPeriod::Last7Days);
    }

    #[test]
    fn test_unknown_stored_value_falls_back() {
        let storage = Arc::new(MemoryPeriodStorage::with_value("90d"));
        assert_eq!(store(&storage).period(), ReportingPeriod::Last7Days);
    }

    #[test]
    fn test_stored_value_is_loaded() {
        let storage = Arc::new(MemoryPeriodStorage::with_value("yesterday"));
        assert_eq!(store(&storage).period(), ReportingPeriod::Yesterday);
    }

    #[test]
    fn test_set_period_persists_and_notifies() {
        let storage = Arc::new(MemoryPeriodStorage::new());
        let periods = store(&storage);
        let mut rx = periods.subscribe();

        periods.set_period(ReportingPeriod::Last30Days);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ReportingPeriod::Last30Days);
        assert_eq!(storage.load().as_deref(), Some("30d"));

        periods.set_period(ReportingPeriod::Last30Days);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_unknown_input_is_rejected_silently() {
        let storage = Arc::new(MemoryPeriodStorage::new());
        let periods = store(&storage);
        periods.set_period(ReportingPeriod::Today);
        let mut rx = periods.subscribe();

        assert!(!periods.set_period_str("last-year"));
        assert_eq!(periods.period(), ReportingPeriod::Today);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(storage.load().as_deref(), Some("today"));

        assert!(periods.set_period_str("14d"));
        assert_eq!(*rx.borrow_and_update(), ReportingPeriod::Last14Days);
    }

    #[test]
    fn test_clear_resets_and_removes() {
        let storage = Arc::new(MemoryPeriodStorage::with_value("today"));
        let periods = store(&storage);
        periods.clear();
        assert_eq!(periods.period(), ReportingPeriod::Last7Days);
        assert_eq!(storage.load(), None);
    }

    #[test]
    fn test_file_storage_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let storage = FilePeriodStorage::new(&path);
        assert_eq!(storage.load(), None);
        storage.save("today").unwrap();
        assert_eq!(storage.load().as_deref(), Some("today"));

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw[PERIOD_KEY], "today");

        storage.remove().unwrap();
        assert_eq!(storage.load(), None);
    }

    #[test]
    fn test_file_storage_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = Arc::new(FilePeriodStorage::new(&path));
        assert_eq!(PeriodStore::new(storage.clone()).period(), ReportingPeriod::Last7Days);
        storage.save("30d").unwrap();
        assert_eq!(PeriodStore::new(storage).period(), ReportingPeriod::Last30Days);
    }
}
