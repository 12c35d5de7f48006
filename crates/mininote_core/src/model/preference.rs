//! Theme preference model.

use serde::{Deserialize, Serialize};

/// Storage key of the theme flag inside the `preferences` table.
pub const DARK_THEME_KEY: &str = "dark_theme";

/// Value reported before the user ever toggles the theme.
pub const DEFAULT_DARK_THEME: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePreference {
    pub is_dark: bool,
}

impl Default for ThemePreference {
    fn default() -> Self {
        Self {
            is_dark: DEFAULT_DARK_THEME,
        }
    }
}
