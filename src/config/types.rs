//! Configuration types with serde defaults for every field.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys;
use crate::modes::Mode;

/// Root configuration. Unknown keys are tolerated for forward compatibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub hotkeys: HotkeysConfig,
    pub hints: HintsConfig,
    pub grid: GridConfig,
    pub recursive_grid: RecursiveGridConfig,
    pub scroll: ScrollConfig,
    pub action: ActionConfig,
    pub exclusions: ExclusionsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Restore the cursor to its captured position when a mode exits.
    pub restore_cursor_position: bool,
    /// Keys that exit any mode. Canonicalized against byte and named forms.
    pub mode_exit_keys: Vec<String>,
    /// When true, a timed-out foreground-app exclusion check refuses
    /// activation instead of allowing it.
    pub exclusion_fail_closed: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            restore_cursor_position: true,
            mode_exit_keys: vec!["escape".to_string()],
            exclusion_fail_closed: false,
        }
    }
}

/// Global hotkey bindings. An empty string disables the binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeysConfig {
    pub hints: String,
    pub grid: String,
    pub recursive_grid: String,
    pub scroll: String,
}

impl Default for HotkeysConfig {
    fn default() -> Self {
        Self {
            hints: "cmd+shift+h".to_string(),
            grid: "cmd+shift+g".to_string(),
            recursive_grid: "cmd+shift+r".to_string(),
            scroll: "cmd+shift+s".to_string(),
        }
    }
}

impl HotkeysConfig {
    /// `(mode, binding)` pairs for the non-empty bindings.
    pub fn bindings(&self) -> Vec<(Mode, &str)> {
        [
            (Mode::Hints, self.hints.as_str()),
            (Mode::Grid, self.grid.as_str()),
            (Mode::RecursiveGrid, self.recursive_grid.as_str()),
            (Mode::Scroll, self.scroll.as_str()),
        ]
        .into_iter()
        .filter(|(_, spec)| !spec.trim().is_empty())
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintsConfig {
    pub enabled: bool,
    /// Label alphabet. Uppercased before use.
    pub hint_characters: String,
}

impl Default for HintsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hint_characters: "ASDFGHJKL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub enabled: bool,
    /// Cell label alphabet. Uppercased before use.
    pub characters: String,
    /// Key string for the 3x3 subgrid. Empty falls back to `characters`.
    pub sublayer_keys: String,
    /// Hide cells whose label no longer matches the typed prefix.
    pub hide_unmatched: bool,
    /// Clears the typed prefix (and exits an open subgrid).
    pub reset_key: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            characters: "ABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            sublayer_keys: String::new(),
            hide_unmatched: false,
            reset_key: "ctrl+r".to_string(),
        }
    }
}

impl GridConfig {
    /// Effective subgrid key string.
    pub fn effective_sublayer_keys(&self) -> &str {
        if self.sublayer_keys.trim().is_empty() {
            &self.characters
        } else {
            &self.sublayer_keys
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecursiveGridConfig {
    pub enabled: bool,
    /// One key per cell, row-major; length must equal `grid_cols * grid_rows`.
    pub keys: String,
    pub reset_key: String,
    /// Uniform minimum cell size; the split fields below win when present.
    pub min_size: Option<i32>,
    pub min_size_width: Option<i32>,
    pub min_size_height: Option<i32>,
    pub max_depth: u32,
    pub grid_cols: u32,
    pub grid_rows: u32,
}

impl Default for RecursiveGridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keys: "uijk".to_string(),
            reset_key: "ctrl+r".to_string(),
            min_size: None,
            min_size_width: None,
            min_size_height: None,
            max_depth: 10,
            grid_cols: 2,
            grid_rows: 2,
        }
    }
}

impl RecursiveGridConfig {
    pub fn min_width(&self) -> i32 {
        self.min_size_width.or(self.min_size).unwrap_or(25)
    }

    pub fn min_height(&self) -> i32 {
        self.min_size_height.or(self.min_size).unwrap_or(25)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub enabled: bool,
    /// Pixels per `j`/`k`/`h`/`l` step.
    pub step: i32,
    /// Pixels per Ctrl-D / Ctrl-U.
    pub half_page: i32,
    /// Pixels for `gg` / `G`. The OS clamps at the content edge.
    pub full_page: i32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step: 40,
            half_page: 400,
            full_page: 1_000_000,
        }
    }
}

/// Keys interpreted while in action mode (standalone or Tab-toggled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub left_click_key: String,
    pub right_click_key: String,
    pub middle_click_key: String,
    pub mouse_down_key: String,
    pub mouse_up_key: String,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            left_click_key: "l".to_string(),
            right_click_key: "r".to_string(),
            middle_click_key: "m".to_string(),
            mouse_down_key: "d".to_string(),
            mouse_up_key: "u".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionsConfig {
    /// Bundle identifiers of apps in which activation is refused.
    pub app_bundle_ids: Vec<String>,
}

impl Config {
    /// Per-mode enabled flag checked by the exclusion gate.
    pub fn mode_enabled(&self, mode: Mode) -> bool {
        match mode {
            Mode::Idle => true,
            Mode::Hints => self.hints.enabled,
            Mode::Grid => self.grid.enabled,
            Mode::RecursiveGrid => self.recursive_grid.enabled,
            Mode::Scroll => self.scroll.enabled,
            // Standalone action mode has no dedicated flag; it rides on the
            // global kill-switch only.
            Mode::Action => true,
        }
    }

    /// Validate the whole config. Returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        validate_alphabet("hints.hint_characters", &self.hints.hint_characters)?;
        validate_alphabet("grid.characters", &self.grid.characters)?;
        let sublayer = self.grid.effective_sublayer_keys();
        validate_alphabet("grid.sublayer_keys", sublayer)?;
        if sublayer.trim().len() < 9 {
            return Err(Error::ConfigValidation(
                "grid.sublayer_keys must provide at least 9 keys for the 3x3 subgrid".into(),
            ));
        }

        let rg = &self.recursive_grid;
        if rg.grid_cols < 2 || rg.grid_rows < 2 {
            return Err(Error::ConfigValidation(
                "recursive_grid.grid_cols and grid_rows must be >= 2".into(),
            ));
        }
        if rg.max_depth < 1 {
            return Err(Error::ConfigValidation(
                "recursive_grid.max_depth must be >= 1".into(),
            ));
        }
        if rg.min_width() < 1 || rg.min_height() < 1 {
            return Err(Error::ConfigValidation(
                "recursive_grid.min_size must be >= 1".into(),
            ));
        }
        let expected = (rg.grid_cols * rg.grid_rows) as usize;
        validate_alphabet("recursive_grid.keys", &rg.keys)?;
        if rg.keys.chars().count() != expected {
            return Err(Error::ConfigValidation(format!(
                "recursive_grid.keys must have exactly {} keys for a {}x{} grid, got {}",
                expected,
                rg.grid_cols,
                rg.grid_rows,
                rg.keys.chars().count()
            )));
        }

        if self.scroll.step < 1 || self.scroll.half_page < 1 || self.scroll.full_page < 1 {
            return Err(Error::ConfigValidation(
                "scroll.step, scroll.half_page and scroll.full_page must be >= 1".into(),
            ));
        }

        if self.general.mode_exit_keys.is_empty() {
            return Err(Error::ConfigValidation(
                "general.mode_exit_keys must not be empty".into(),
            ));
        }
        keys::parse_key_list(&self.general.mode_exit_keys)?;
        keys::parse_key(&self.grid.reset_key)?;
        keys::parse_key(&self.recursive_grid.reset_key)?;
        for spec in [
            &self.action.left_click_key,
            &self.action.right_click_key,
            &self.action.middle_click_key,
            &self.action.mouse_down_key,
            &self.action.mouse_up_key,
        ] {
            keys::parse_key(spec)?;
        }

        for (mode, binding) in self.hotkeys.bindings() {
            crate::hotkeys::parse_hotkey(binding).map_err(|err| {
                Error::ConfigValidation(format!("hotkeys.{mode}: {err}"))
            })?;
        }

        Ok(())
    }
}

/// Alphabets must be ASCII-alphanumeric and unique ignoring case; a repeated
/// key would make two cells or hints indistinguishable.
fn validate_alphabet(field: &str, alphabet: &str) -> Result<()> {
    let trimmed = alphabet.trim();
    if trimmed.chars().count() < 2 {
        return Err(Error::ConfigValidation(format!(
            "{field} must contain at least 2 characters"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for c in trimmed.chars() {
        if !c.is_ascii_alphanumeric() {
            return Err(Error::ConfigValidation(format!(
                "{field} contains non-alphanumeric character {c:?}"
            )));
        }
        if !seen.insert(c.to_ascii_uppercase()) {
            return Err(Error::ConfigValidation(format!(
                "{field} contains duplicate character '{c}'"
            )));
        }
    }
    Ok(())
}
