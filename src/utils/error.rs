use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Telegram API error {code}: {description}")]
    TelegramApiError {
        code: i64,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Template error: {message}")]
    TemplateError { message: String },

    #[error("Document conversion failed: {message}")]
    ConversionError { message: String },

    #[error("Converter program '{program}' not found")]
    ConverterNotFound { program: String },

    #[error("Document conversion timed out after {timeout_ms} ms")]
    ConversionTimeout { timeout_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Document,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BotError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::ApiError(_) | BotError::TelegramApiError { .. } => ErrorCategory::Network,
            BotError::ConfigError { .. }
            | BotError::ConfigValidationError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::MissingConfigError { .. } => ErrorCategory::Configuration,
            BotError::ZipError(_)
            | BotError::TemplateError { .. }
            | BotError::ConversionError { .. }
            | BotError::ConversionTimeout { .. } => ErrorCategory::Document,
            BotError::IoError(_)
            | BotError::SerializationError(_)
            | BotError::ConverterNotFound { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BotError::TelegramApiError { code: 429, .. } => ErrorSeverity::Low,
            BotError::ApiError(_)
            | BotError::TelegramApiError { .. }
            | BotError::ConversionTimeout { .. } => ErrorSeverity::Medium,
            BotError::ZipError(_)
            | BotError::TemplateError { .. }
            | BotError::ConversionError { .. }
            | BotError::SerializationError(_)
            | BotError::IoError(_) => ErrorSeverity::High,
            BotError::ConfigError { .. }
            | BotError::ConfigValidationError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::MissingConfigError { .. }
            | BotError::ConverterNotFound { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether polling should back off and try again rather than give up.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::System
        ) && !matches!(
            self,
            BotError::TelegramApiError { code: 401, .. } | BotError::TelegramApiError { code: 404, .. }
        )
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            BotError::TelegramApiError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BotError::TelegramApiError { code: 401, .. } => {
                "Check that BOT_TOKEN is the token issued by @BotFather"
            }
            BotError::TelegramApiError { code: 409, .. } => {
                "Another instance is polling with the same token; stop it or remove the webhook"
            }
            BotError::ApiError(_) | BotError::TelegramApiError { .. } => {
                "Check network connectivity to the Telegram Bot API"
            }
            BotError::ConfigError { .. }
            | BotError::ConfigValidationError { .. }
            | BotError::InvalidConfigValueError { .. }
            | BotError::MissingConfigError { .. } => {
                "Review the configuration file and environment variables"
            }
            BotError::ZipError(_) | BotError::TemplateError { .. } => {
                "Make sure the templates directory contains valid MDO.docx and HFO.docx files"
            }
            BotError::ConverterNotFound { .. } => {
                "Install LibreOffice (libreoffice-core, libreoffice-writer) or set --converter-program"
            }
            BotError::ConversionError { .. } | BotError::ConversionTimeout { .. } => {
                "Inspect the LibreOffice output in the logs and consider raising the conversion timeout"
            }
            BotError::IoError(_) | BotError::SerializationError(_) => {
                "Check file permissions and available disk space"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach Telegram: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Document => format!("Report generation failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

impl From<toml::de::Error> for BotError {
    fn from(err: toml::de::Error) -> Self {
        BotError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
