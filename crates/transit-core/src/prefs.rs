//! Small key-value state that must survive restarts.
//!
//! Two values are kept: when the reference dataset was last reloaded
//! successfully, and which area the user last filtered lines by.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use transit_types::Area;

use crate::error::{Error, Result};

/// Storage for the reload timestamp and the last area filter.
pub trait PreferenceStore: Send + Sync {
    /// Unix seconds of the last successful full reload, if any.
    fn last_reload(&self) -> Result<Option<i64>>;

    fn set_last_reload(&self, unix_seconds: i64) -> Result<()>;

    /// Area the user last filtered lines by.
    fn last_area_filter(&self) -> Result<Option<Area>>;

    fn set_last_area_filter(&self, area: Option<Area>) -> Result<()>;
}

/// On-disk layout of [`FilePreferences`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reload_seconds: Option<i64>,
    /// Area code, see [`Area::code`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_area_filter: Option<u8>,
}

/// Preferences kept in a TOML file.
///
/// The file is read on every access and rewritten on every change, so
/// several processes see each other's updates.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default preferences path following platform conventions.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("transit")
            .join("preferences.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::Preferences(format!("{}: {e}", self.path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Preferences(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Preferences(format!("{}: {e}", parent.display())))?;
        }
        let content =
            toml::to_string_pretty(prefs).map_err(|e| Error::Preferences(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| Error::Preferences(format!("{}: {e}", self.path.display())))?;
        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }

    /// Apply `f` and save. An unreadable file is replaced, starting from
    /// defaults.
    fn update(&self, f: impl FnOnce(&mut Preferences)) -> Result<()> {
        let mut prefs = self.load().unwrap_or_else(|e| {
            warn!("Discarding unreadable preferences: {}", e);
            Preferences::default()
        });
        f(&mut prefs);
        self.save(&prefs)
    }
}

fn area_from_code(code: Option<u8>) -> Result<Option<Area>> {
    code.map(|c| Area::try_from(i64::from(c)))
        .transpose()
        .map_err(|e| Error::Preferences(e.to_string()))
}

impl PreferenceStore for FilePreferences {
    fn last_reload(&self) -> Result<Option<i64>> {
        Ok(self.load()?.last_reload_seconds)
    }

    fn set_last_reload(&self, unix_seconds: i64) -> Result<()> {
        self.update(|p| p.last_reload_seconds = Some(unix_seconds))
    }

    fn last_area_filter(&self) -> Result<Option<Area>> {
        area_from_code(self.load()?.last_area_filter)
    }

    fn set_last_area_filter(&self, area: Option<Area>) -> Result<()> {
        self.update(|p| p.last_area_filter = area.map(|a| a.code()))
    }
}

/// Preferences held in memory, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    inner: Mutex<Preferences>,
    fail_writes: bool,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known reload timestamp.
    pub fn with_last_reload(unix_seconds: i64) -> Self {
        Self {
            inner: Mutex::new(Preferences {
                last_reload_seconds: Some(unix_seconds),
                last_area_filter: None,
            }),
            fail_writes: false,
        }
    }

    /// Make every write fail, simulating a read-only preference store.
    #[must_use]
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Preferences>> {
        self.inner
            .lock()
            .map_err(|_| Error::Preferences("preference lock poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            Err(Error::Preferences("preference store is read-only".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn last_reload(&self) -> Result<Option<i64>> {
        Ok(self.lock()?.last_reload_seconds)
    }

    fn set_last_reload(&self, unix_seconds: i64) -> Result<()> {
        self.check_writable()?;
        self.lock()?.last_reload_seconds = Some(unix_seconds);
        Ok(())
    }

    fn last_area_filter(&self) -> Result<Option<Area>> {
        area_from_code(self.lock()?.last_area_filter)
    }

    fn set_last_area_filter(&self, area: Option<Area>) -> Result<()> {
        self.check_writable()?;
        self.lock()?.last_area_filter = area.map(|a| a.code());
        Ok(())
    }
}
