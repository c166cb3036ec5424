use config::{builder::DefaultState, Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub image_api: ImageApiConfig,
    pub uploads: UploadConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// "development" exposes panic details in 500 responses
    pub environment: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: "production".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3002".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Upstream image-edit API; the credentials only seed the runtime store
/// and can be replaced through `POST /api/images/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for ImageApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_seconds: 300,
        }
    }
}

impl ImageApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: String,
    pub max_file_size_bytes: usize,
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            max_file_size_bytes: 25 * 1024 * 1024,
            max_files: 10,
        }
    }
}

impl UploadConfig {
    /// Largest request body the edit endpoint accepts (all files plus form fields)
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        // one mask on top of the image files, plus 1 MiB for text fields and framing
        self.max_file_size_bytes
            .saturating_mul(self.max_files.saturating_add(1))
            .saturating_add(1024 * 1024)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_inactive_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_inactive_seconds: 30 * 60,
            sweep_interval_seconds: 10 * 60,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn max_inactive(&self) -> Duration {
        Duration::from_secs(self.max_inactive_seconds)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Plain deployment variables (`PORT`, `API_BASE_URL`, `API_KEY`, ...)
    /// 2. `CLASSROOM__*` environment variables
    /// 3. Config file (if provided)
    /// 4. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // CLASSROOM__IMAGE_API__BASE_URL, CLASSROOM__SERVER__PORT, ...
        builder = builder.add_source(
            Environment::with_prefix("CLASSROOM")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        builder = apply_legacy_env(builder, |key| std::env::var(key).ok())?;

        builder.build()?.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check the loaded values, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }
        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            errors.push(format!("logging.level is invalid: {}", self.logging.level));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got {}",
                self.logging.format
            ));
        }
        if self.image_api.timeout_seconds == 0 {
            errors.push("image_api.timeout_seconds must be greater than 0".to_string());
        }
        if self.uploads.dir.trim().is_empty() {
            errors.push("uploads.dir must not be empty".to_string());
        }
        if self.uploads.max_files == 0 {
            errors.push("uploads.max_files must be greater than 0".to_string());
        }
        if self.uploads.max_file_size_bytes == 0 {
            errors.push("uploads.max_file_size_bytes must be greater than 0".to_string());
        }
        if self.sessions.max_inactive_seconds == 0 {
            errors.push("sessions.max_inactive_seconds must be greater than 0".to_string());
        }
        if self.sessions.sweep_interval_seconds == 0 {
            errors.push("sessions.sweep_interval_seconds must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Map the plain deployment variables (`PORT`, `API_KEY`, ...) onto config keys
fn apply_legacy_env(
    builder: config::ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let port = non_empty("PORT")
        .map(|p| {
            p.trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Message(format!("PORT is not a valid port: {e}")))
        })
        .transpose()?
        .map(i64::from);

    let cors_origins = non_empty("CORS_ORIGIN").map(|origins| {
        origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect::<Vec<_>>()
    });

    builder
        .set_override_option("server.port", port)?
        .set_override_option("server.environment", non_empty("NODE_ENV"))?
        .set_override_option("server.cors_origins", cors_origins)?
        .set_override_option("image_api.base_url", non_empty("API_BASE_URL"))?
        .set_override_option("image_api.api_key", non_empty("API_KEY"))?
        .set_override_option("uploads.dir", non_empty("UPLOAD_DIR"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.image_api.timeout(), Duration::from_secs(300));
        assert_eq!(config.sessions.max_inactive(), Duration::from_secs(1800));
        assert_eq!(config.sessions.sweep_interval(), Duration::from_secs(600));
        assert_eq!(config.uploads.max_file_size_bytes, 25 * 1024 * 1024);
        assert!(!config.server.is_development());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_body_bytes() {
        let uploads = UploadConfig::default();
        assert_eq!(uploads.max_body_bytes(), 25 * 1024 * 1024 * 11 + 1024 * 1024);

        let huge = UploadConfig {
            max_file_size_bytes: usize::MAX / 2,
            max_files: usize::MAX,
            ..UploadConfig::default()
        };
        assert_eq!(huge.max_body_bytes(), usize::MAX);
    }

    #[test]
    fn test_http_address() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                ..ServerConfig::default()
            },
            ..Config::default()
        };

        assert_eq!(config.http_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.server.port = 0;
        config.logging.format = "xml".to_string();
        config.image_api.timeout_seconds = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("server.port")));
        assert!(errors.iter().any(|e| e.contains("logging.format")));
        assert!(errors.iter().any(|e| e.contains("timeout_seconds")));
    }

    #[test]
    fn test_legacy_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "4000"),
            ("API_BASE_URL", "https://api.example.com"),
            ("API_KEY", "sk-test"),
            ("CORS_ORIGIN", "http://a.test, http://b.test"),
            ("NODE_ENV", "development"),
            ("UPLOAD_DIR", ""),
        ]);

        let builder = apply_legacy_env(ConfigBuilder::builder(), |k| {
            vars.get(k).map(|v| (*v).to_string())
        })
        .unwrap();
        let config: Config = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.image_api.base_url, "https://api.example.com");
        assert_eq!(config.image_api.api_key, "sk-test");
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(config.server.is_development());
        // empty values leave the default in place
        assert_eq!(config.uploads.dir, "uploads");
    }

    #[test]
    fn test_legacy_env_rejects_bad_port() {
        let result = apply_legacy_env(ConfigBuilder::builder(), |k| {
            (k == "PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
