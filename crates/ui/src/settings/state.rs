use std::path::{Path, PathBuf};
use std::time::Duration;

use charla_history::{DEFAULT_HISTORY_URL, DEFAULT_REQUEST_TIMEOUT, HistoryConfig};
use charla_transport::{DEFAULT_SERVER_URL, TransportConfig};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use gpui::*;
use gpui_component::{Theme, ThemeMode, ThemeRegistry};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "charla";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "CHARLA_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_history_url")]
    pub history_url: String,
    #[serde(default = "default_history_timeout_secs")]
    pub history_timeout_secs: u64,
    #[serde(
        default = "default_theme_mode",
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub theme_name: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            history_url: default_history_url(),
            history_timeout_secs: default_history_timeout_secs(),
            theme_mode: default_theme_mode(),
            theme_name: String::new(),
        }
    }
}

impl ChatSettings {
    pub fn normalized(mut self) -> Self {
        self.server_url = non_blank_or(self.server_url, default_server_url);
        self.history_url = non_blank_or(self.history_url, default_history_url);
        if self.history_timeout_secs == 0 {
            self.history_timeout_secs = default_history_timeout_secs();
        }
        self.theme_name = self.theme_name.trim().to_string();
        self
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(&self.server_url)
    }

    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig::new(&self.history_url)
            .with_timeout(Duration::from_secs(self.history_timeout_secs))
    }

    pub fn apply_theme(&self, window: Option<&mut Window>, cx: &mut App) {
        if let Some(theme_config) = ThemeRegistry::global(cx)
            .themes()
            .get(&SharedString::from(self.theme_name.clone()))
            .cloned()
        {
            let mode = theme_config.mode;
            let theme = Theme::global_mut(cx);
            if mode.is_dark() {
                theme.dark_theme = theme_config;
            } else {
                theme.light_theme = theme_config;
            }
            Theme::change(mode, window, cx);
            return;
        }

        Theme::change(self.theme_mode, window, cx);
    }
}

/// Read-only settings resolved once at startup.
///
/// Sources, later ones winning: built-in defaults, the JSON settings file,
/// `CHARLA_*` environment variables.
pub struct SettingsStore {
    settings: ChatSettings,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".charla"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings,
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn extract(path: &Path) -> Result<ChatSettings, SettingsError> {
        let mut figment = Figment::from(Serialized::defaults(ChatSettings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        }
        figment = figment.merge(Env::prefixed(SETTINGS_ENV_PREFIX));

        let settings = figment
            .extract::<ChatSettings>()
            .map_err(Box::new)
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })?;
        Ok(settings.normalized())
    }

    fn load_from_disk(path: &Path) -> ChatSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        match Self::extract(path) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("{error}. using defaults");
                ChatSettings::default()
            }
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        source: Box<figment::Error>,
    },
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_history_url() -> String {
    DEFAULT_HISTORY_URL.to_string()
}

fn default_history_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Light
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("dark") {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("absent.json");
            let settings = SettingsStore::extract(&path).expect("defaults extract");
            assert_eq!(settings, ChatSettings::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_environment_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{"server_url":" http://localhost:4000/ ","history_url":"","theme_mode":"dark"}"#,
            )?;
            jail.set_env("CHARLA_HISTORY_TIMEOUT_SECS", "3");

            let settings = SettingsStore::extract(&jail.directory().join("settings.json"))
                .expect("settings extract");
            assert_eq!(settings.server_url, "http://localhost:4000/");
            assert_eq!(settings.history_url, DEFAULT_HISTORY_URL);
            assert_eq!(settings.history_timeout_secs, 3);
            assert_eq!(settings.theme_mode, ThemeMode::Dark);
            assert_eq!(
                settings.history_config().timeout,
                Duration::from_secs(3)
            );
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_an_error_and_store_falls_back() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", "{ not json")?;
            let path = jail.directory().join("settings.json");

            assert!(SettingsStore::extract(&path).is_err());
            let store = SettingsStore::new(path);
            assert_eq!(store.settings(), &ChatSettings::default());
            Ok(())
        });
    }
}
