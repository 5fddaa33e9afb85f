use log::warn;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

use crate::storage::{KeyValueStore, StorageError, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// Text of the toggle button.
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme {other}")),
        }
    }
}

pub struct ThemePreference {
    store: Arc<dyn KeyValueStore>,
}

impl ThemePreference {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved theme, dark when nothing usable is saved.
    pub fn current(&self) -> Theme {
        match self.store.get(THEME_KEY) {
            Some(saved) => saved.parse().unwrap_or_else(|e| {
                warn!("Ignoring saved theme: {}", e);
                Theme::default()
            }),
            None => Theme::default(),
        }
    }

    pub fn set(&self, theme: Theme) -> Result<Theme, StorageError> {
        self.store.set(THEME_KEY, theme.as_str())?;
        Ok(theme)
    }

    pub fn toggle(&self) -> Result<Theme, StorageError> {
        self.set(self.current().toggled())
    }
}
