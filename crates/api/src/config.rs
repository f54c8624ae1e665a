use std::path::PathBuf;
use std::time::Duration;

use shortgen_core::types::JobKind;
use shortgen_pipeline::PollConfig;
use shortgen_replicate::ReplicateConfig;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Poll configuration per job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollDefaults {
    pub image: PollConfig,
    pub video: PollConfig,
}

impl PollDefaults {
    pub fn for_kind(&self, kind: JobKind) -> PollConfig {
        match kind {
            JobKind::ImageGeneration => self.image,
            JobKind::VideoGeneration => self.video,
        }
    }
}

impl Default for PollDefaults {
    fn default() -> Self {
        Self {
            image: PollConfig::for_kind(JobKind::ImageGeneration),
            video: PollConfig::for_kind(JobKind::VideoGeneration),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// Everything except the provider token has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`). Inline generation
    /// endpoints hold the request open for the whole job.
    pub request_timeout_secs: u64,
    /// Replicate connection settings.
    pub provider: ReplicateConfig,
    pub poll: PollDefaults,
    /// Where finished generations are recorded. `None` disables the sink.
    pub output_dir: Option<PathBuf>,
    /// Also download produced artifacts next to the JSON records.
    pub download_outputs: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                      |
    /// |--------------------------|------------------------------|
    /// | `HOST`                   | `0.0.0.0`                    |
    /// | `PORT`                   | `3000`                       |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`      |
    /// | `REQUEST_TIMEOUT_SECS`   | `600`                        |
    /// | `REPLICATE_API_TOKEN`    | required                     |
    /// | `REPLICATE_BASE_URL`     | `https://api.replicate.com`  |
    /// | `PROVIDER_TIMEOUT_SECS`  | `30`                         |
    /// | `IMAGE_POLL_INTERVAL_MS` | `3000`                       |
    /// | `IMAGE_MAX_ATTEMPTS`     | `30`                         |
    /// | `VIDEO_POLL_INTERVAL_MS` | `5000`                       |
    /// | `VIDEO_MAX_ATTEMPTS`     | `60`                         |
    /// | `MAX_STATUS_ERRORS`      | `5` (`0` disables)           |
    /// | `OUTPUT_DIR`             | unset (sink disabled)        |
    /// | `DOWNLOAD_OUTPUTS`       | `false`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.get("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = env.parse("PORT", 3000)?;

        let cors_origins: Vec<String> = env
            .get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env.parse("REQUEST_TIMEOUT_SECS", 600)?;

        let api_token = env
            .get("REPLICATE_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("REPLICATE_API_TOKEN"))?;
        let mut provider = ReplicateConfig::new(api_token);
        if let Some(base_url) = env.get("REPLICATE_BASE_URL") {
            provider.base_url = base_url;
        }
        provider.request_timeout = Duration::from_secs(env.parse("PROVIDER_TIMEOUT_SECS", 30)?);

        let max_status_errors: u32 = env.parse("MAX_STATUS_ERRORS", 5)?;
        let max_status_errors = (max_status_errors > 0).then_some(max_status_errors);
        let defaults = PollDefaults::default();
        let poll = PollDefaults {
            image: PollConfig::new(
                Duration::from_millis(env.parse(
                    "IMAGE_POLL_INTERVAL_MS",
                    defaults.image.poll_interval.as_millis() as u64,
                )?),
                env.parse("IMAGE_MAX_ATTEMPTS", defaults.image.max_attempts)?,
            )
            .with_max_consecutive_status_errors(max_status_errors),
            video: PollConfig::new(
                Duration::from_millis(env.parse(
                    "VIDEO_POLL_INTERVAL_MS",
                    defaults.video.poll_interval.as_millis() as u64,
                )?),
                env.parse("VIDEO_MAX_ATTEMPTS", defaults.video.max_attempts)?,
            )
            .with_max_consecutive_status_errors(max_status_errors),
        };
        for (var, config) in [("IMAGE_MAX_ATTEMPTS", poll.image), ("VIDEO_MAX_ATTEMPTS", poll.video)] {
            config.validate().map_err(|e| ConfigError::Invalid {
                var,
                value: config.max_attempts.to_string(),
                reason: e.to_string(),
            })?;
        }

        let output_dir = env
            .get("OUTPUT_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);
        let download_outputs = env.parse_bool("DOWNLOAD_OUTPUTS", false)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            provider,
            poll,
            output_dir,
            download_outputs,
        })
    }

    /// Directory for generated media files. Falls back to a temp
    /// subdirectory when no output directory is configured.
    pub fn media_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("shortgen"))
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn parse_bool(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(var).as_deref().map(str::trim) {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off" | "") => Ok(false),
            Some(other) => Err(ConfigError::Invalid {
                var,
                value: other.to_string(),
                reason: "expected true or false".into(),
            }),
        }
    }
}
