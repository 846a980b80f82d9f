use crate::config::app_config::{ApiKey, ComposerApi, ComposerConfig, STABILITY_API_KEY_VAR};
use crate::core::http::HttpPolicy;
use crate::domain::model::{AudioClip, MusicPrompt};
use crate::domain::ports::Composer;
use crate::utils::error::{Result, SynesthesiaError};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder};

const SERVICE: &str = "Stability AI";

/// 生成長度固定為 29 秒
pub const CLIP_DURATION_SECONDS: u32 = 29;

pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// Composer backed by the Stability AI text-to-audio endpoints.
pub struct StableAudioComposer {
    client: Client,
    policy: HttpPolicy,
    api: ComposerApi,
    endpoint: String,
    api_key: Option<ApiKey>,
}

impl StableAudioComposer {
    pub fn new(config: &ComposerConfig, policy: HttpPolicy) -> Result<Self> {
        Ok(Self {
            client: policy.build_client()?,
            api: config.api,
            endpoint: config.endpoint().to_string(),
            api_key: config.api_key.clone(),
            policy,
        })
    }

    pub fn api(&self) -> ComposerApi {
        self.api
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, api_key: &ApiKey, prompt: &MusicPrompt) -> RequestBuilder {
        let duration = CLIP_DURATION_SECONDS.to_string();
        let request = self.client.post(&self.endpoint).bearer_auth(api_key.expose());

        match self.api {
            ComposerApi::StableAudio2 => {
                let form = Form::new()
                    .text("prompt", prompt.as_str().to_string())
                    .text("duration", duration)
                    .text("output_format", "mp3");
                request.header(ACCEPT, "audio/*").multipart(form)
            }
            ComposerApi::StableAudioV1 => request
                .header(ACCEPT, AUDIO_MIME_TYPE)
                .form(&[("prompt", prompt.as_str()), ("seconds", duration.as_str())]),
        }
    }
}

#[async_trait]
impl Composer for StableAudioComposer {
    async fn compose(&self, prompt: &MusicPrompt) -> Result<AudioClip> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.is_unset())
            .ok_or_else(|| SynesthesiaError::MissingConfigError {
                field: STABILITY_API_KEY_VAR.to_string(),
            })?;

        tracing::info!(
            "🎼 Composing {}s clip via {:?} ({} prompt characters)",
            CLIP_DURATION_SECONDS,
            self.api,
            prompt.char_count()
        );

        let response = self
            .policy
            .execute(SERVICE, || self.build_request(api_key, prompt))
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| SynesthesiaError::TransportError {
                service: SERVICE.to_string(),
                source,
            })?;

        tracing::debug!("Received {} audio bytes", bytes.len());
        Ok(AudioClip::new(bytes.to_vec(), AUDIO_MIME_TYPE))
    }
}
