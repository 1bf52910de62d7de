use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientSettings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub callback: CallbackSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Base URL of the notes backend
    pub backend_url: String,
    /// Public base URL the backend redirects to after login
    pub app_base_url: String,
}

/// Local listener that receives the OAuth redirect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackSettings {
    pub host: String,
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    /// Token file; defaults to `~/.notekeep/tokens.json`
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            path: "/auth-success".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ClientSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        // RUST_LOG wins over the configured level
        env_logger::Builder::new()
            .parse_filters(&settings.logging.level)
            .parse_default_env()
            .try_init()?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `NOTEKEEP_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml_file(&default_config_path)?;
            eprintln!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(config_dir) = std::env::var("NOTEKEEP_CONFIG_DIR") {
            let config_path = std::path::Path::new(&config_dir).join("Settings.toml");
            if config_path.exists() {
                settings = Self::from_toml_file(&config_path)?;
                eprintln!("✓ Overriding settings from {}", config_path.display());
            } else {
                eprintln!(
                    "ℹ NOTEKEEP_CONFIG_DIR set but no Settings.toml found at: {}",
                    config_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_callback_env_overrides(&mut settings.callback);
        Self::apply_storage_env_overrides(&mut settings.storage);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(backend_url) = std::env::var("BACKEND_URL") {
            app_settings.backend_url = backend_url;
        }
        if let Ok(app_base_url) = std::env::var("APP_BASE_URL") {
            app_settings.app_base_url = app_base_url;
        }
    }

    fn apply_callback_env_overrides(callback_settings: &mut CallbackSettings) {
        if let Ok(host) = std::env::var("CALLBACK_HOST") {
            callback_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("CALLBACK_PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                callback_settings.port = port;
            }
        }
    }

    fn apply_storage_env_overrides(storage_settings: &mut StorageSettings) {
        if let Ok(path) = std::env::var("TOKEN_STORE_PATH") {
            if !path.is_empty() {
                storage_settings.token_path = Some(PathBuf::from(path));
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Resolved location of the token file
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.storage.token_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".notekeep")
                .join("tokens.json")
        })
    }

    /// URL the backend sends the browser to after a Google login
    ///
    /// # Errors
    ///
    /// Returns an error if `app_base_url` is not a valid URL.
    pub fn redirect_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.application.app_base_url)?.join(&self.callback.path)
    }

    /// Whether the backend's redirect lands on the local listener's port
    #[must_use]
    pub fn redirect_reaches_listener(&self, listener_port: u16) -> bool {
        self.redirect_url()
            .ok()
            .and_then(|url| url.port_or_known_default())
            .is_some_and(|port| port == listener_port)
    }

    /// Address the callback listener binds to
    #[must_use]
    pub fn get_callback_bind_address(&self) -> String {
        format!("{}:{}", self.callback.host, self.callback.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clean_env_vars() {
        for var in [
            "BACKEND_URL",
            "APP_BASE_URL",
            "CALLBACK_HOST",
            "CALLBACK_PORT",
            "TOKEN_STORE_PATH",
            "NOTEKEEP_CONFIG_DIR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.application.backend_url, "http://localhost:8000");
        assert_eq!(settings.callback.path, "/auth-success");
        assert_eq!(settings.get_callback_bind_address(), "127.0.0.1:3000");
        assert!(settings.token_path().ends_with(".notekeep/tokens.json"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clean_env_vars();
        std::env::set_var("BACKEND_URL", "https://notes.example.com");
        std::env::set_var("CALLBACK_PORT", "4567");
        std::env::set_var("TOKEN_STORE_PATH", "/tmp/notekeep-test/tokens.json");

        let mut settings = ClientSettings::default();
        ClientSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.backend_url, "https://notes.example.com");
        assert_eq!(settings.callback.port, 4567);
        assert_eq!(
            settings.token_path(),
            PathBuf::from("/tmp/notekeep-test/tokens.json")
        );

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_port_is_ignored() {
        clean_env_vars();
        std::env::set_var("CALLBACK_PORT", "not-a-port");

        let mut settings = ClientSettings::default();
        ClientSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings.callback.port, 3000);

        clean_env_vars();
    }

    #[test]
    fn test_redirect_url_follows_app_base_url() {
        let mut settings = ClientSettings::default();
        assert_eq!(
            settings.redirect_url().unwrap().as_str(),
            "http://localhost:3000/auth-success"
        );
        assert!(settings.redirect_reaches_listener(3000));
        assert!(!settings.redirect_reaches_listener(4000));

        settings.application.app_base_url = "https://notes.example.com".to_string();
        assert!(settings.redirect_reaches_listener(443));

        settings.application.app_base_url = "not a url".to_string();
        assert!(settings.redirect_url().is_err());
        assert!(!settings.redirect_reaches_listener(3000));
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Settings.toml");
        fs::write(
            &path,
            "[application]\nbackend_url = \"http://api.local\"\napp_base_url = \"http://app.local\"\n",
        )
        .unwrap();

        let settings = ClientSettings::from_toml_file(&path).unwrap();
        assert_eq!(settings.application.backend_url, "http://api.local");
        assert_eq!(settings.callback.port, 3000);
        assert_eq!(settings.logging.level, "info");
    }
}
