use crate::config::app_config::{ApiKey, CaptionerConfig, GOOGLE_API_KEY_VAR};
use crate::core::http::HttpPolicy;
use crate::domain::model::{Image, MusicPrompt};
use crate::domain::ports::Captioner;
use crate::utils::error::{Result, SynesthesiaError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "Gemini";

/// 送給視覺模型的固定指令
pub const MUSIC_PROMPT_INSTRUCTION: &str = "\
Look at this image and turn it into a detailed prompt for a music generation model.
Cover these points:
- Mood and emotion (for example melancholic, joyful, epic, serene).
- Setting and visible elements (for example a neon city at night, a quiet forest, abstract shapes).
- Colours and textures expressed as timbre (for example \"warm orange tones\" becoming \"warm analog synth pads\").
- Tempo and energy (for example a busy, fast scene becoming \"high energy, 140 BPM\").

Answer with one concise paragraph of comma-separated keywords and phrases that a text-to-music model can use directly.
Example: \"rain-soaked city at night, neon reflections, pulsing electronic beat, 120 BPM, synthwave, cinematic, restless\".";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// 串接第一個候選的所有文字片段
    fn into_text(self) -> Result<String> {
        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            let feedback = self
                .prompt_feedback
                .map(|f| f.to_string())
                .unwrap_or_else(|| "none".to_string());
            SynesthesiaError::RemotePayloadError {
                service: SERVICE.to_string(),
                message: format!("response has no candidates (prompt feedback: {})", feedback),
            }
        })?;

        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if texts.is_empty() {
            return Err(SynesthesiaError::RemotePayloadError {
                service: SERVICE.to_string(),
                message: format!(
                    "candidate has no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            });
        }

        Ok(texts.concat())
    }
}

/// Captioner backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiCaptioner {
    client: Client,
    policy: HttpPolicy,
    endpoint: String,
    api_key: Option<ApiKey>,
}

impl GeminiCaptioner {
    pub fn new(config: &CaptionerConfig, policy: HttpPolicy) -> Result<Self> {
        Ok(Self {
            client: policy.build_client()?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
            policy,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Captioner for GeminiCaptioner {
    async fn caption(&self, image: &Image) -> Result<MusicPrompt> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|key| !key.is_unset())
            .ok_or_else(|| SynesthesiaError::MissingConfigError {
                field: GOOGLE_API_KEY_VAR.to_string(),
            })?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: MUSIC_PROMPT_INSTRUCTION,
                    },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: image.mime_type(),
                            data: BASE64.encode(image.encoded()),
                        },
                    },
                ],
            }],
        };

        tracing::info!(
            "🖼️ Captioning {}x{} {} image via {}",
            image.width(),
            image.height(),
            image.mime_type(),
            self.endpoint
        );

        let response = self
            .policy
            .execute(SERVICE, || {
                self.client
                    .post(&self.endpoint)
                    .header("x-goog-api-key", api_key.expose())
                    .json(&request)
            })
            .await?;

        let body = response
            .bytes()
            .await
            .map_err(|source| SynesthesiaError::TransportError {
                service: SERVICE.to_string(),
                source,
            })?;

        let parsed: GenerateContentResponse =
            serde_json::from_slice(&body).map_err(|e| SynesthesiaError::RemotePayloadError {
                service: SERVICE.to_string(),
                message: format!("invalid JSON: {}", e),
            })?;

        let text = parsed.into_text()?;
        tracing::debug!("Caption returned {} characters", text.chars().count());

        Ok(MusicPrompt::new(text))
    }
}
