//! Run configuration.
//!
//! [`StitchConfig`] carries every tunable of a stitching run. It can be built
//! in code with the `with_*` methods or loaded from an INI file:
//!
//! ```ini
//! [fetch]
//! workers = 10
//! queue_capacity = 20
//! request_timeout = 30
//! run_timeout = 600
//! user_agent = Mozilla/5.0 ...
//!
//! [output]
//! jpeg_quality = 75
//!
//! [templates]
//! google = http://mt2.google.cn/vt/lyrs={style}&x={x}&y={y}&z={z}
//!
//! [defaults]
//! provider = google
//! style = satellite
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::provider::{
    LayerStyle, Provider, UrlTemplates, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT,
};

/// Default number of concurrent fetch workers.
pub const DEFAULT_WORKERS: usize = 10;

/// Default capacity of the request and data queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Default JPEG quality for encoded output.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// At least one worker is required
    #[error("worker count must be at least 1")]
    NoWorkers,

    /// Queues need room for at least one item
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,

    /// JPEG quality outside 1..=100
    #[error("JPEG quality {0} outside range [1, 100]")]
    InvalidQuality(u8),

    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Tunables for one stitching run.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchConfig {
    /// Number of concurrent fetch workers
    pub workers: usize,
    /// Capacity of the bounded request and data queues
    pub queue_capacity: usize,
    /// Timeout for each HTTP request
    pub request_timeout: Duration,
    /// Overall deadline for a run, if any
    pub run_timeout: Option<Duration>,
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Quality used when encoding JPEG output
    pub jpeg_quality: u8,
    /// Provider URL templates
    pub templates: UrlTemplates,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            run_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            templates: UrlTemplates::default(),
        }
    }
}

impl StitchConfig {
    /// Set the number of fetch workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the request/data queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set an overall deadline for the run.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Set the User-Agent header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the JPEG output quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Replace the URL template table.
    pub fn with_templates(mut self, templates: UrlTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub stitch: StitchConfig,
    /// Provider used when none is given on the command line
    pub provider: Option<Provider>,
    /// Layer style used when none is given on the command line
    pub style: Option<LayerStyle>,
}

impl ConfigFile {
    /// Loads a configuration file, starting from defaults for absent keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini =
            Ini::load_from_str(text).map_err(|e| ConfigError::ReadError(ini::Error::Parse(e)))?;
        parse_ini(&ini)
    }
}

/// Path of the per-user configuration file (`~/.config/mapstitch/config.ini`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mapstitch").join("config.ini"))
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut file = ConfigFile::default();
    let config = &mut file.stitch;

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("workers") {
            config.workers = parse_value("fetch", "workers", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("queue_capacity") {
            config.queue_capacity =
                parse_value("fetch", "queue_capacity", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("request_timeout") {
            let secs: u64 = parse_value("fetch", "request_timeout", v, "must be seconds")?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = section.get("run_timeout") {
            let secs: u64 = parse_value("fetch", "run_timeout", v, "must be seconds")?;
            config.run_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = section.get("user_agent") {
            if !v.trim().is_empty() {
                config.user_agent = v.trim().to_string();
            }
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("jpeg_quality") {
            config.jpeg_quality =
                parse_value("output", "jpeg_quality", v, "must be between 1 and 100")?;
        }
    }

    // [templates] section
    if let Some(section) = ini.section(Some("templates")) {
        let templates = &mut config.templates;
        for (key, slot) in [
            ("google", &mut templates.google),
            ("amap", &mut templates.amap),
            ("tencent_satellite", &mut templates.tencent_satellite),
            ("tencent_map", &mut templates.tencent_map),
        ] {
            if let Some(v) = section.get(key) {
                if !v.contains("{x}") || !v.contains("{z}") {
                    return Err(ConfigError::InvalidValue {
                        section: "templates".to_string(),
                        key: key.to_string(),
                        value: v.to_string(),
                        reason: "template must contain {x} and {z} placeholders".to_string(),
                    });
                }
                *slot = v.trim().to_string();
            }
        }
    }

    // [defaults] section
    if let Some(section) = ini.section(Some("defaults")) {
        if let Some(v) = section.get("provider") {
            file.provider = Some(parse_value("defaults", "provider", v, "unknown provider")?);
        }
        if let Some(v) = section.get("style") {
            file.style = Some(parse_value("defaults", "style", v, "unknown style")?);
        }
    }

    file.stitch.validate().map_err(|e| match e {
        ConfigError::NoWorkers => invalid("fetch", "workers", "0", "must be at least 1"),
        ConfigError::ZeroQueueCapacity => {
            invalid("fetch", "queue_capacity", "0", "must be at least 1")
        }
        ConfigError::InvalidQuality(q) => invalid(
            "output",
            "jpeg_quality",
            &q.to_string(),
            "must be between 1 and 100",
        ),
        other => other,
    })?;

    Ok(file)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = StitchConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.queue_capacity, 20);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.run_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StitchConfig::default()
            .with_workers(4)
            .with_queue_capacity(8)
            .with_request_timeout(Duration::from_secs(5))
            .with_run_timeout(Duration::from_secs(60))
            .with_user_agent("agent/1.0")
            .with_jpeg_quality(90);

        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.run_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.user_agent, "agent/1.0");
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = StitchConfig::default().with_workers(0);
        assert!(matches!(config.validate(), Err(ConfigError::NoWorkers)));
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        for quality in [0, 101] {
            let config = StitchConfig::default().with_jpeg_quality(quality);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidQuality(q)) if q == quality
            ));
        }
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[fetch]\nworkers = 3\nrun_timeout = 120\n\n\
             [output]\njpeg_quality = 92\n\n\
             [templates]\namap = http://localhost:8080/{{z}}/{{x}}/{{y}}?s={{style}}\n\n\
             [defaults]\nprovider = amap\nstyle = map"
        )
        .unwrap();

        let loaded = ConfigFile::load(file.path()).unwrap();
        assert_eq!(loaded.stitch.workers, 3);
        assert_eq!(loaded.stitch.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(loaded.stitch.run_timeout, Some(Duration::from_secs(120)));
        assert_eq!(loaded.stitch.jpeg_quality, 92);
        assert_eq!(
            loaded.stitch.templates.amap,
            "http://localhost:8080/{z}/{x}/{y}?s={style}"
        );
        assert_eq!(loaded.stitch.templates.google, UrlTemplates::default().google);
        assert_eq!(loaded.provider, Some(Provider::Amap));
        assert_eq!(loaded.style, Some(LayerStyle::Map));
    }

    #[test]
    fn test_zero_run_timeout_means_none() {
        let loaded = ConfigFile::parse("[fetch]\nrun_timeout = 0\n").unwrap();
        assert_eq!(loaded.stitch.run_timeout, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = ConfigFile::parse("[fetch]\nworkers = many\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "workers"
        ));

        let err = ConfigFile::parse("[fetch]\nworkers = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "workers"
        ));

        let err = ConfigFile::parse("[defaults]\nprovider = bing\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "provider"
        ));

        let err = ConfigFile::parse("[templates]\ngoogle = http://example.com/tile\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref section, .. } if section == "templates"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ini");

        assert!(matches!(
            ConfigFile::load(&path),
            Err(ConfigError::ReadError(_))
        ));
        assert_eq!(ConfigFile::load_or_default(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("mapstitch/config.ini"));
        }
    }
}
