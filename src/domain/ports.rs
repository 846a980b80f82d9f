use crate::domain::model::{AudioClip, Image, MusicPrompt};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 將圖片轉換為音樂生成提示
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &Image) -> Result<MusicPrompt>;
}

/// 將提示轉換為音訊
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, prompt: &MusicPrompt) -> Result<AudioClip>;
}
