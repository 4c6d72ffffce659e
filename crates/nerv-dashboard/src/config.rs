use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use nerv_feeds::{CalendarSource, NotionConfig};
use serde::{Deserialize, Serialize};

use crate::palette::{InkColor, Role, Theme};

pub const CONFIG_FILE: &str = "dashboard.json";
pub const SECRETS_FILE: &str = "secrets.json";
pub const PAGE_NAMES: [&str; 4] = ["dashboard", "todos", "satellite", "experimental"];

pub fn config_dir(root: &Path) -> PathBuf {
    root.join("config")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub pins: PinConfig,
    #[serde(default)]
    pub pages: PagesConfig,
}

impl DashboardConfig {
    /// Loads `config/dashboard.json`, creating it with defaults when missing
    /// and re-saving it when normalisation repaired anything.
    pub fn load(root: &Path) -> Result<Self> {
        let path = config_dir(root).join(CONFIG_FILE);
        if !path.exists() {
            let default = DashboardConfig::default();
            default.save(&path)?;
            return Ok(default);
        }

        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let mut config: DashboardConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        if config.normalize() {
            tracing::info!(path = %path.display(), "Repaired dashboard config");
            config.save(&path)?;
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        // Renamed over the target so a reader never sees a partial file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("replacing {} with {}", path.display(), tmp.display()))?;
        Ok(())
    }

    pub fn normalize(&mut self) -> bool {
        let display = self.display.normalize();
        let theme = self.theme.normalize();
        let pins = self.pins.normalize();
        let pages = self.pages.normalize();
        display || theme || pins || pages
    }

    /// Applies `NERV_DISPLAY_BACKEND` and `NERV_UPDATE_INTERVAL`. Invalid
    /// values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Ok(backend) = env::var("NERV_DISPLAY_BACKEND") {
            self.apply_backend_override(&backend);
        }
        if let Ok(interval) = env::var("NERV_UPDATE_INTERVAL") {
            self.apply_interval_override(&interval);
        }
    }

    pub fn apply_backend_override(&mut self, value: &str) {
        match DisplayBackend::from_name(value) {
            Some(backend) => self.display.backend = backend,
            None => tracing::warn!(value, "Ignoring unknown NERV_DISPLAY_BACKEND"),
        }
    }

    pub fn apply_interval_override(&mut self, value: &str) {
        match value.trim().parse::<u64>() {
            Ok(secs) => {
                self.display.update_interval_secs = secs;
                self.display.normalize();
            }
            Err(_) => tracing::warn!(value, "Ignoring invalid NERV_UPDATE_INTERVAL"),
        }
    }

    pub fn build_theme(&self) -> Theme {
        self.theme.build()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    #[default]
    Inky,
    Preview,
}

impl DisplayBackend {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "inky" => Some(Self::Inky),
            "preview" | "png" => Some(Self::Preview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_width")]
    pub width: u32,
    #[serde(default = "DisplayConfig::default_height")]
    pub height: u32,
    #[serde(default)]
    pub backend: DisplayBackend,
    #[serde(default = "DisplayConfig::default_preview_path")]
    pub preview_path: PathBuf,
    #[serde(default = "DisplayConfig::default_update_interval")]
    pub update_interval_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            backend: DisplayBackend::default(),
            preview_path: Self::default_preview_path(),
            update_interval_secs: Self::default_update_interval(),
        }
    }
}

impl DisplayConfig {
    pub const MIN_UPDATE_INTERVAL: u64 = 30;
    pub const MAX_UPDATE_INTERVAL: u64 = 24 * 60 * 60;

    const fn default_width() -> u32 {
        600
    }

    const fn default_height() -> u32 {
        448
    }

    fn default_preview_path() -> PathBuf {
        PathBuf::from("preview/frame.png")
    }

    const fn default_update_interval() -> u64 {
        300
    }

    /// Relative preview paths are resolved against `root`.
    pub fn preview_path_in(&self, root: &Path) -> PathBuf {
        if self.preview_path.is_absolute() {
            self.preview_path.clone()
        } else {
            root.join(&self.preview_path)
        }
    }

    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        // The page layouts are fixed to the 600x448 panel.
        if self.width != Self::default_width() || self.height != Self::default_height() {
            self.width = Self::default_width();
            self.height = Self::default_height();
            changed = true;
        }
        let clamped = self
            .update_interval_secs
            .clamp(Self::MIN_UPDATE_INTERVAL, Self::MAX_UPDATE_INTERVAL);
        if clamped != self.update_interval_secs {
            self.update_interval_secs = clamped;
            changed = true;
        }
        if self.preview_path.as_os_str().is_empty() {
            self.preview_path = Self::default_preview_path();
            changed = true;
        }
        changed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationConfig {
    #[serde(default = "LocationConfig::default_name")]
    pub name: String,
    #[serde(default = "LocationConfig::default_region")]
    pub region: String,
    #[serde(default = "LocationConfig::default_latitude")]
    pub latitude: f64,
    #[serde(default = "LocationConfig::default_longitude")]
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            region: Self::default_region(),
            latitude: Self::default_latitude(),
            longitude: Self::default_longitude(),
        }
    }
}

impl LocationConfig {
    fn default_name() -> String {
        "Hacienda Heights".to_string()
    }

    fn default_region() -> String {
        "California".to_string()
    }

    const fn default_latitude() -> f64 {
        33.9931
    }

    const fn default_longitude() -> f64 {
        -117.9687
    }
}

/// Role to colour-name mapping; names are resolved through [`InkColor::from_name`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeConfig {
    #[serde(default = "ThemeConfig::default_background")]
    pub background: String,
    #[serde(default = "ThemeConfig::default_primary")]
    pub primary: String,
    #[serde(default = "ThemeConfig::default_secondary")]
    pub secondary: String,
    #[serde(default = "ThemeConfig::default_accent")]
    pub accent: String,
    #[serde(default = "ThemeConfig::default_warning")]
    pub warning: String,
    #[serde(default = "ThemeConfig::default_success")]
    pub success: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: Self::default_background(),
            primary: Self::default_primary(),
            secondary: Self::default_secondary(),
            accent: Self::default_accent(),
            warning: Self::default_warning(),
            success: Self::default_success(),
        }
    }
}

impl ThemeConfig {
    fn default_background() -> String {
        "black".to_string()
    }
    fn default_primary() -> String {
        "orange".to_string()
    }
    fn default_secondary() -> String {
        "green".to_string()
    }
    fn default_accent() -> String {
        "red".to_string()
    }
    fn default_warning() -> String {
        "yellow".to_string()
    }
    fn default_success() -> String {
        "green".to_string()
    }

    fn slot(&self, role: Role) -> &str {
        match role {
            Role::Background => &self.background,
            Role::Primary => &self.primary,
            Role::Secondary => &self.secondary,
            Role::Accent => &self.accent,
            Role::Warning => &self.warning,
            Role::Success => &self.success,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut String {
        match role {
            Role::Background => &mut self.background,
            Role::Primary => &mut self.primary,
            Role::Secondary => &mut self.secondary,
            Role::Accent => &mut self.accent,
            Role::Warning => &mut self.warning,
            Role::Success => &mut self.success,
        }
    }

    /// Replaces unknown colour names with the role default and lower-cases
    /// the rest.
    pub fn normalize(&mut self) -> bool {
        let defaults = Theme::default();
        let mut changed = false;
        for role in Role::ALL {
            let slot = self.slot_mut(role);
            let repaired = match InkColor::from_name(slot) {
                Some(color) => color.name(),
                None => defaults.role(role).name(),
            };
            if slot.as_str() != repaired {
                *slot = repaired.to_string();
                changed = true;
            }
        }
        changed
    }

    pub fn build(&self) -> Theme {
        let mut theme = Theme::default();
        for role in Role::ALL {
            if let Some(color) = InkColor::from_name(self.slot(role)) {
                theme.set(role, color);
            }
        }
        theme
    }
}

/// BCM line numbers of the four buttons. The lines are requested without a
/// bias, so the board needs its pull-ups enabled (`gpio=5,6,16,24=pu` in
/// config.txt); a line reading low at startup is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinConfig {
    #[serde(default = "PinConfig::default_button_a")]
    pub button_a: u32,
    #[serde(default = "PinConfig::default_button_b")]
    pub button_b: u32,
    #[serde(default = "PinConfig::default_button_c")]
    pub button_c: u32,
    #[serde(default = "PinConfig::default_button_d")]
    pub button_d: u32,
    #[serde(default = "PinConfig::default_chips")]
    pub gpio_chips: Vec<PathBuf>,
    #[serde(default = "PinConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            button_a: Self::default_button_a(),
            button_b: Self::default_button_b(),
            button_c: Self::default_button_c(),
            button_d: Self::default_button_d(),
            gpio_chips: Self::default_chips(),
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

impl PinConfig {
    const fn default_button_a() -> u32 {
        5
    }
    const fn default_button_b() -> u32 {
        6
    }
    const fn default_button_c() -> u32 {
        16
    }
    const fn default_button_d() -> u32 {
        24
    }
    fn default_chips() -> Vec<PathBuf> {
        vec![PathBuf::from("/dev/gpiochip4"), PathBuf::from("/dev/gpiochip0")]
    }
    const fn default_debounce_ms() -> u64 {
        100
    }

    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.gpio_chips.is_empty() {
            self.gpio_chips = Self::default_chips();
            changed = true;
        }
        if self.debounce_ms > 1000 {
            self.debounce_ms = Self::default_debounce_ms();
            changed = true;
        }
        changed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PagesConfig {
    #[serde(default = "PagesConfig::default_order")]
    pub order: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
        }
    }
}

impl PagesConfig {
    fn default_order() -> Vec<String> {
        PAGE_NAMES.iter().map(|name| name.to_string()).collect()
    }

    /// Drops unknown and repeated page names; an empty list gets the default order.
    pub fn normalize(&mut self) -> bool {
        let mut kept: Vec<String> = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let name = name.trim().to_ascii_lowercase();
            if PAGE_NAMES.contains(&name.as_str()) && !kept.contains(&name) {
                kept.push(name);
            }
        }
        if kept.is_empty() {
            kept = Self::default_order();
        }
        if kept != self.order {
            self.order = kept;
            return true;
        }
        false
    }
}

/// Integration credentials from `config/secrets.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Secrets {
    #[serde(default)]
    pub calendars: Vec<CalendarSource>,
    #[serde(default)]
    pub notion: NotionConfig,
}

impl Secrets {
    /// `Ok(None)` when the file does not exist.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = config_dir(root).join(SECRETS_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.display(),
                    "No secrets file; calendar and task integrations disabled"
                );
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        let secrets: Secrets = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(secrets))
    }
}

pub fn resolve_root(input: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = input {
        return Ok(path);
    }

    if let Ok(env_path) = env::var("NERV_ROOT") {
        return Ok(PathBuf::from(env_path));
    }

    let default = PathBuf::from("/var/lib/nerv-dashboard");
    if default.exists() {
        return Ok(default);
    }

    env::current_dir().context("determining current directory")
}
