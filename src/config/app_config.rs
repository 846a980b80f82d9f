use crate::utils::error::{Result, SynesthesiaError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const STABILITY_API_KEY_VAR: &str = "STABILITY_API_KEY";

/// 從環境或設定檔取得的 API 金鑰，Debug 輸出時遮蔽
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// 未替換的 `${VAR}` 或空字串視為未設定
    pub(crate) fn is_unset(&self) -> bool {
        let key = self.0.trim();
        key.is_empty() || (key.starts_with("${") && key.ends_with('}'))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub captioner: CaptionerConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionerConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<ApiKey>,
}

impl Default for CaptionerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_key: None,
        }
    }
}

/// Payload format of the text-to-audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComposerApi {
    /// multipart, `duration` field, `Accept: audio/*`
    #[default]
    #[serde(rename = "stable-audio-2")]
    StableAudio2,
    /// urlencoded, `seconds` field, `Accept: audio/mpeg`
    #[serde(rename = "stable-audio-v1")]
    StableAudioV1,
}

impl ComposerApi {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::StableAudio2 => "https://api.stability.ai/v2beta/audio/stable-audio-2/text-to-audio",
            Self::StableAudioV1 => "https://api.stability.ai/v1/generation/stable-audio/generate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub api: ComposerApi,
    pub endpoint: Option<String>,
    pub max_prompt_chars: usize,
    pub api_key: Option<ApiKey>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            api: ComposerApi::default(),
            endpoint: None,
            max_prompt_chars: 10_000,
            api_key: None,
        }
    }
}

impl ComposerConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.api.default_endpoint())
    }
}

/// 兩個遠端呼叫共用的逾時與重試設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            retry_attempts: 0,
            retry_delay_ms: 1_000,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            max_upload_mb: 20,
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| SynesthesiaError::ConfigError {
            message: format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SynesthesiaError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 程序入口使用：可選的設定檔 + `.env` + 環境變數中的金鑰
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(env_file) => tracing::debug!("Loaded environment from {}", env_file.display()),
            Err(e) if e.not_found() => tracing::debug!("No .env file found"),
            Err(e) => {
                return Err(SynesthesiaError::config(format!(
                    "failed to load .env file: {}",
                    e
                )))
            }
        }

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        Ok(config.with_credentials(
            std::env::var(GOOGLE_API_KEY_VAR).ok(),
            std::env::var(STABILITY_API_KEY_VAR).ok(),
        ))
    }

    /// 補上未設定的金鑰；設定檔中已明確給定的值優先
    pub fn with_credentials(mut self, google: Option<String>, stability: Option<String>) -> Self {
        fn merge(slot: &mut Option<ApiKey>, value: Option<String>) {
            if slot.as_ref().map(ApiKey::is_unset).unwrap_or(true) {
                *slot = value.map(ApiKey::new).filter(|key| !key.is_unset());
            }
        }

        merge(&mut self.captioner.api_key, google);
        merge(&mut self.composer.api_key, stability);
        self
    }

    /// 替換環境變數 (例如 ${GOOGLE_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SynesthesiaError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("captioner.base_url", &self.captioner.base_url)?;
        validate_non_empty_string("captioner.model", &self.captioner.model)?;
        validate_url("composer.endpoint", self.composer.endpoint())?;
        validate_positive_number("composer.max_prompt_chars", self.composer.max_prompt_chars, 1)?;
        validate_range("http.retry_attempts", self.http.retry_attempts, 0, 10)?;
        if let Some(timeout) = self.http.timeout_seconds {
            validate_range("http.timeout_seconds", timeout, 1, 3_600)?;
        }
        validate_range("server.max_upload_mb", self.server.max_upload_mb, 1, 1_024)?;

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(SynesthesiaError::InvalidConfigValueError {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: "Expected a socket address such as 127.0.0.1:8501".to_string(),
            });
        }

        Ok(())
    }
}
