use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rootcause::{Report, option_ext::OptionExt, report};
use serde::{Deserialize, Serialize};

use crate::APP_DIR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Quiet period before a query is searched, in milliseconds.
    pub debounce_ms: u64,
    /// Placeholder shown while the query is empty.
    pub hint_text: String,
    pub max_suggestions: usize,
    /// Remember which entry was picked for a query, and rank it first next time.
    pub remember_selections: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            hint_text: "Search".to_string(),
            max_suggestions: 8,
            remember_selections: true,
        }
    }
}

impl Configuration {
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// `config.toml` in the platform config directory.
    ///
    /// # Errors
    ///
    /// The platform has no well-defined config directory.
    pub fn default_path() -> Result<PathBuf, Report> {
        let mut path = dirs::config_dir().ok_or_report()?;
        path.push(APP_DIR);
        path.push("config.toml");

        Ok(path)
    }

    /// Loads [`Self::default_path`], or the defaults when there is no such file.
    ///
    /// # Errors
    ///
    /// See [`Self::from_path`].
    pub fn load() -> Result<Self, Report> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        Self::from_path(&path)
    }

    /// # Errors
    ///
    /// The file can't be read or isn't valid configuration TOML.
    pub fn from_path(path: &Path) -> Result<Self, Report> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| report!(err).attach(format!("reading {}", path.display())))?;

        Self::from_toml_str(&text)
            .map_err(|err| err.attach(format!("parsing {}", path.display())))
    }

    /// # Errors
    ///
    /// `text` isn't valid configuration TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, Report> {
        let config: Self = toml::from_str(text)?;

        Ok(config)
    }
}
