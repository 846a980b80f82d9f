use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynesthesiaError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{service} API error (status {status}): {body}")]
    RemoteStatusError {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unexpected payload: {message}")]
    RemotePayloadError { service: String, message: String },

    #[error("{service} request failed: {source}")]
    TransportError {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid image: {message}")]
    InputError { message: String },

    #[error("Failed to write output file {path}: {source}")]
    OutputError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// 對外可區分的錯誤類別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    RemoteService,
    Input,
    /// 只有 CLI 寫檔會產生
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl SynesthesiaError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }

    pub fn output(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::OutputError {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorKind::Configuration,
            Self::RemoteStatusError { .. }
            | Self::RemotePayloadError { .. }
            | Self::TransportError { .. } => ErrorKind::RemoteService,
            Self::InputError { .. } | Self::IoError(_) => ErrorKind::Input,
            Self::OutputError { .. } => ErrorKind::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TransportError { .. } => ErrorSeverity::Medium,
            Self::RemoteStatusError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            Self::RemoteStatusError { .. } | Self::RemotePayloadError { .. } => ErrorSeverity::High,
            Self::InputError { .. } | Self::IoError(_) | Self::OutputError { .. } => {
                ErrorSeverity::High
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::Critical,
        }
    }

    /// 是否值得以相同請求重試 (連線失敗、429、5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportError { .. } => true,
            Self::RemoteStatusError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.kind() {
            ErrorKind::Configuration => format!("The app is not configured correctly. {}", self),
            ErrorKind::RemoteService => format!("An error occurred during generation: {}", self),
            ErrorKind::Input => format!("An error occurred while handling the image file: {}", self),
            ErrorKind::Output => format!("Could not save the generated music: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { .. } => {
                "Set GOOGLE_API_KEY and STABILITY_API_KEY in the environment or in a .env file"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the configuration file and command-line options"
            }
            Self::RemoteStatusError { status: 401 | 403, .. } => {
                "Check that the API key is valid and has access to this endpoint"
            }
            Self::RemoteStatusError { status: 429, .. } => {
                "The service is rate limiting requests; wait a moment and try again"
            }
            Self::RemoteStatusError { .. } | Self::RemotePayloadError { .. } => {
                "Try again with a different image"
            }
            Self::TransportError { .. } => "Check the network connection and try again",
            Self::InputError { .. } | Self::IoError(_) => "Upload a valid PNG or JPEG image",
            Self::OutputError { .. } => "Check that the output directory exists and is writable",
        }
    }
}

pub type Result<T> = std::result::Result<T, SynesthesiaError>;
