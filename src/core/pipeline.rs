use crate::config::app_config::AppConfig;
use crate::core::captioner::GeminiCaptioner;
use crate::core::composer::StableAudioComposer;
use crate::core::http::HttpPolicy;
use crate::domain::model::{Composition, Image, MusicPrompt};
use crate::domain::ports::{Captioner, Composer};
use crate::utils::error::{Result, SynesthesiaError};
use std::time::Instant;

/// 圖片 → 提示 → 音訊，兩個階段依序執行
pub struct MusicPipeline<C: Captioner, M: Composer> {
    captioner: C,
    composer: M,
    max_prompt_chars: usize,
}

impl MusicPipeline<GeminiCaptioner, StableAudioComposer> {
    /// 以程序入口建立的配置組裝預設的遠端實作
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let policy = HttpPolicy::from_config(&config.http);
        let captioner = GeminiCaptioner::new(&config.captioner, policy.clone())?;
        let composer = StableAudioComposer::new(&config.composer, policy)?;

        Ok(Self::new(captioner, composer, config.composer.max_prompt_chars))
    }
}

impl<C: Captioner, M: Composer> MusicPipeline<C, M> {
    pub fn new(captioner: C, composer: M, max_prompt_chars: usize) -> Self {
        Self {
            captioner,
            composer,
            max_prompt_chars,
        }
    }

    pub async fn run(&self, image: &Image) -> Result<Composition> {
        let started = Instant::now();
        tracing::info!("🚀 Starting image-to-music pipeline");

        let prompt = self.captioner.caption(image).await?;
        tracing::info!("📝 Music prompt ready after {:?}", started.elapsed());
        tracing::debug!("Music prompt: {}", prompt);

        self.check_prompt(&prompt)?;

        let audio = self.composer.compose(&prompt).await?;
        tracing::info!(
            "✅ Pipeline finished in {:?} ({} audio bytes)",
            started.elapsed(),
            audio.len()
        );

        Ok(Composition { audio, prompt })
    }

    /// 空白或過長的提示不送往作曲服務
    fn check_prompt(&self, prompt: &MusicPrompt) -> Result<()> {
        if prompt.is_blank() {
            return Err(SynesthesiaError::RemotePayloadError {
                service: "Captioner".to_string(),
                message: "music prompt is empty".to_string(),
            });
        }

        let length = prompt.char_count();
        if length > self.max_prompt_chars {
            return Err(SynesthesiaError::RemotePayloadError {
                service: "Captioner".to_string(),
                message: format!(
                    "music prompt is {} characters, the composer accepts at most {}",
                    length, self.max_prompt_chars
                ),
            });
        }

        Ok(())
    }
}
