pub mod toml_config;

use crate::core::dispatcher::DispatcherSettings;
use crate::core::ConfigProvider;
use crate::domain::model::FuelFamily;
use crate::utils::error::{BotError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
pub use toml_config::TomlConfig;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
/// Telegram caps long polling at 50 seconds.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "fuel-report-bot")]
#[command(about = "Telegram bot that fills fuel analysis templates and returns them as PDF")]
pub struct CliConfig {
    #[arg(long, short = 'c', env = "BOT_CONFIG", help = "Path to a TOML config file")]
    pub config: Option<String>,

    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "TELEGRAM_API_BASE")]
    pub api_base: Option<String>,

    #[arg(long, env = "POLL_TIMEOUT_SECONDS")]
    pub poll_timeout_seconds: Option<u64>,

    #[arg(long, env = "TEMPLATES_DIR")]
    pub templates_dir: Option<String>,

    #[arg(long, env = "CONVERTER_PROGRAM")]
    pub converter_program: Option<String>,

    #[arg(long, env = "CONVERSION_TIMEOUT_SECONDS")]
    pub conversion_timeout_seconds: Option<u64>,

    #[arg(long, env = "MAX_CONCURRENT_CONVERSIONS")]
    pub max_concurrent_conversions: Option<usize>,

    #[arg(long, env = "SCRATCH_DIR", help = "Directory for conversion work files")]
    pub scratch_dir: Option<String>,

    #[arg(long, env = "SESSION_IDLE_TIMEOUT_SECONDS")]
    pub session_idle_timeout_seconds: Option<u64>,

    #[arg(long, help = "Log process CPU/memory around each report")]
    pub monitor: bool,

    #[arg(long, env = "LOG_JSON", help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[arg(long, short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Check the office engine and templates, then exit")]
    pub check: bool,
}

/// Loads `KEY=value` lines into the process environment, `./.env` (or a
/// parent's) when `path` is `None`. Variables that are already set win, and
/// a missing file is not an error.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(BotError::ConfigError {
            message: format!("could not load environment file: {}", e),
        }),
    }
}

/// Fully resolved settings: defaults, then the TOML file, then CLI/env.
#[derive(Clone)]
pub struct BotConfig {
    pub token: String,
    pub api_base: String,
    pub poll_timeout: Duration,
    pub templates_dir: String,
    pub mdo_template: String,
    pub hfo_template: String,
    pub converter_program: String,
    pub conversion_timeout: Duration,
    pub max_concurrent_conversions: usize,
    pub scratch_dir: Option<String>,
    pub session_idle_timeout: Duration,
    pub monitor: bool,
    pub json_logs: bool,
    pub verbose: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout: Duration::from_secs(30),
            templates_dir: "./templates".to_string(),
            mdo_template: "MDO.docx".to_string(),
            hfo_template: "HFO.docx".to_string(),
            converter_program: "libreoffice".to_string(),
            conversion_timeout: Duration::from_secs(120),
            max_concurrent_conversions: 1,
            scratch_dir: None,
            session_idle_timeout: Duration::from_secs(30 * 60),
            monitor: false,
            json_logs: false,
            verbose: false,
        }
    }
}

// The token is a credential; keep it out of debug logs.
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_base", &self.api_base)
            .field("poll_timeout", &self.poll_timeout)
            .field("templates_dir", &self.templates_dir)
            .field("mdo_template", &self.mdo_template)
            .field("hfo_template", &self.hfo_template)
            .field("converter_program", &self.converter_program)
            .field("conversion_timeout", &self.conversion_timeout)
            .field("max_concurrent_conversions", &self.max_concurrent_conversions)
            .field("scratch_dir", &self.scratch_dir)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .field("monitor", &self.monitor)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl BotConfig {
    pub fn from_toml(file: TomlConfig) -> Self {
        let mut config = Self::default();

        if let Some(telegram) = file.telegram {
            if let Some(token) = telegram.token {
                config.token = token;
            }
            if let Some(api_base) = telegram.api_base {
                config.api_base = api_base;
            }
            if let Some(secs) = telegram.poll_timeout_seconds {
                config.poll_timeout = Duration::from_secs(secs);
            }
        }
        if let Some(templates) = file.templates {
            if let Some(directory) = templates.directory {
                config.templates_dir = directory;
            }
            if let Some(mdo) = templates.mdo {
                config.mdo_template = mdo;
            }
            if let Some(hfo) = templates.hfo {
                config.hfo_template = hfo;
            }
        }
        if let Some(converter) = file.converter {
            if let Some(program) = converter.program {
                config.converter_program = program;
            }
            if let Some(secs) = converter.timeout_seconds {
                config.conversion_timeout = Duration::from_secs(secs);
            }
            if let Some(max) = converter.max_concurrent {
                config.max_concurrent_conversions = max;
            }
            if converter.scratch_dir.is_some() {
                config.scratch_dir = converter.scratch_dir;
            }
        }
        if let Some(secs) = file.session.and_then(|s| s.idle_timeout_seconds) {
            config.session_idle_timeout = Duration::from_secs(secs);
        }
        if let Some(monitoring) = file.monitoring {
            config.monitor = monitoring.enabled.unwrap_or(false);
            config.json_logs = monitoring.json_logs.unwrap_or(false);
        }

        config
    }

    #[cfg(feature = "cli")]
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_toml(TomlConfig::from_file(path)?),
            None => Self::default(),
        };

        if let Some(token) = &cli.token {
            config.token = token.clone();
        }
        if let Some(api_base) = &cli.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(secs) = cli.poll_timeout_seconds {
            config.poll_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &cli.templates_dir {
            config.templates_dir = dir.clone();
        }
        if let Some(program) = &cli.converter_program {
            config.converter_program = program.clone();
        }
        if let Some(secs) = cli.conversion_timeout_seconds {
            config.conversion_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = cli.max_concurrent_conversions {
            config.max_concurrent_conversions = max;
        }
        if let Some(dir) = &cli.scratch_dir {
            config.scratch_dir = Some(dir.clone());
        }
        if let Some(secs) = cli.session_idle_timeout_seconds {
            config.session_idle_timeout = Duration::from_secs(secs);
        }
        config.monitor |= cli.monitor;
        config.json_logs |= cli.json_logs;
        config.verbose = cli.verbose;

        Ok(config)
    }

    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            poll_timeout: self.poll_timeout,
            session_idle_timeout: self.session_idle_timeout,
            // In-flight conversions get their full timeout before shutdown gives up.
            shutdown_grace: self.conversion_timeout + Duration::from_secs(30),
            ..DispatcherSettings::default()
        }
    }

    /// Checks everything except the token, which `--check` does not need.
    pub fn validate_runtime(&self) -> Result<()> {
        validate_url("telegram.api_base", &self.api_base)?;
        validate_range(
            "telegram.poll_timeout_seconds",
            self.poll_timeout.as_secs(),
            0,
            MAX_POLL_TIMEOUT_SECS,
        )?;
        validate_path("templates.directory", &self.templates_dir)?;
        validate_file_extensions(
            "templates",
            &[self.mdo_template.clone(), self.hfo_template.clone()],
            &["docx"],
        )?;
        validate_non_empty_string("converter.program", &self.converter_program)?;
        validate_range(
            "converter.timeout_seconds",
            self.conversion_timeout.as_secs(),
            1,
            3600,
        )?;
        validate_positive_number(
            "converter.max_concurrent",
            self.max_concurrent_conversions,
            1,
        )?;
        if let Some(dir) = &self.scratch_dir {
            validate_path("converter.scratch_dir", dir)?;
        }
        validate_range(
            "session.idle_timeout_seconds",
            self.session_idle_timeout.as_secs(),
            60,
            7 * 24 * 3600,
        )?;
        Ok(())
    }
}

impl Validate for BotConfig {
    fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(BotError::MissingConfigError {
                field: "BOT_TOKEN".to_string(),
            });
        }
        if self.token.contains("${") {
            return Err(BotError::InvalidConfigValueError {
                field: "telegram.token".to_string(),
                value: "<redacted>".to_string(),
                reason: "environment variable in the token was not set".to_string(),
            });
        }
        self.validate_runtime()
    }
}

impl ConfigProvider for BotConfig {
    fn templates_dir(&self) -> &str {
        &self.templates_dir
    }

    fn template_file(&self, family: FuelFamily) -> &str {
        match family {
            FuelFamily::Mdo => &self.mdo_template,
            FuelFamily::Hfo => &self.hfo_template,
        }
    }

    fn converter_program(&self) -> &str {
        &self.converter_program
    }

    fn conversion_timeout(&self) -> Duration {
        self.conversion_timeout
    }

    fn max_concurrent_conversions(&self) -> usize {
        self.max_concurrent_conversions
    }

    fn scratch_dir(&self) -> Option<&str> {
        self.scratch_dir.as_deref()
    }
}
