use crate::utils::error::{Result, SynesthesiaError};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::fmt;
use std::io::Cursor;

/// 使用者上傳並成功解碼的圖片
///
/// 同時保留原始編碼位元組，送往視覺模型時直接轉送，不重新編碼。
#[derive(Debug, Clone)]
pub struct Image {
    pixels: DynamicImage,
    encoded: Vec<u8>,
    format: ImageFormat,
}

impl Image {
    /// 解碼上傳內容，只接受 PNG / JPEG
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(SynesthesiaError::input("uploaded file is empty"));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| SynesthesiaError::input(format!("unrecognized image format: {}", e)))?;

        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(SynesthesiaError::input(format!(
                "unsupported image format {:?}; only PNG and JPEG are accepted",
                format
            )));
        }

        let pixels = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| SynesthesiaError::input(format!("failed to decode image: {}", e)))?;

        Ok(Self {
            pixels,
            encoded: bytes.to_vec(),
            format,
        })
    }

    /// 在 blocking 執行緒上解碼，避免大型上傳佔住 async worker
    pub async fn decode_blocking(bytes: Vec<u8>) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::decode(&bytes))
            .await
            .map_err(|e| SynesthesiaError::input(format!("image decoding task failed: {}", e)))?
    }

    /// 由已存在的點陣圖建立，編碼為 PNG
    pub fn from_pixels(pixels: DynamicImage) -> Result<Self> {
        let mut encoded = Cursor::new(Vec::new());
        pixels
            .write_to(&mut encoded, ImageFormat::Png)
            .map_err(|e| SynesthesiaError::input(format!("failed to encode image: {}", e)))?;

        Ok(Self {
            pixels,
            encoded: encoded.into_inner(),
            format: ImageFormat::Png,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.pixels.dimensions().1
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Free-form text produced by the captioner and consumed by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicPrompt(String);

impl MusicPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for MusicPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MusicPrompt {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// 編碼後的音訊，內容不做任何驗證
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Vec<u8>,
    mime_type: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct Composition {
    pub audio: AudioClip,
    pub prompt: MusicPrompt,
}
