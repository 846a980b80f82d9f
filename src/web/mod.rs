//! Web shell: upload an image, run the pipeline, play the result.

pub mod page;

use crate::core::pipeline::MusicPipeline;
use crate::domain::model::Image;
use crate::domain::ports::{Captioner, Composer};
use crate::utils::error::{ErrorKind, Result, SynesthesiaError};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use page::PageView;
use std::sync::Arc;

/// Shared state for web handlers
pub struct WebState<C: Captioner, M: Composer> {
    pub pipeline: Arc<MusicPipeline<C, M>>,
}

impl<C: Captioner, M: Composer> Clone for WebState<C, M> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

pub fn router<C, M>(pipeline: MusicPipeline<C, M>, max_upload_bytes: usize) -> Router
where
    C: Captioner + 'static,
    M: Composer + 'static,
{
    let state = WebState {
        pipeline: Arc::new(pipeline),
    };

    Router::new()
        .route("/", get(serve_index))
        .route("/compose", post(compose::<C, M>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn serve_index() -> Html<String> {
    Html(page::render(&PageView::Upload))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn compose<C: Captioner, M: Composer>(
    State(state): State<WebState<C, M>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let upload = match read_upload(multipart).await {
        Ok(bytes) => Image::decode_blocking(bytes).await,
        Err(error) => Err(error),
    };

    let image = match upload {
        Ok(image) => image,
        Err(error) => {
            tracing::warn!("❌ Rejected upload: {}", error);
            return failure(None, &error);
        }
    };

    tracing::info!(
        "📥 Received {}x{} {} upload",
        image.width(),
        image.height(),
        image.mime_type()
    );

    match state.pipeline.run(&image).await {
        Ok(composition) => (
            StatusCode::OK,
            Html(page::render(&PageView::Composed {
                image: &image,
                composition: &composition,
            })),
        ),
        Err(error) => {
            tracing::error!(
                "❌ Generation failed: {} (Severity: {:?})",
                error,
                error.severity()
            );
            failure(Some(&image), &error)
        }
    }
}

fn failure(image: Option<&Image>, error: &SynesthesiaError) -> (StatusCode, Html<String>) {
    let status = match error.kind() {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Configuration | ErrorKind::Output => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::RemoteService => StatusCode::BAD_GATEWAY,
    };

    (status, Html(page::render(&PageView::Failed { image, error })))
}

/// 取出 `image` 欄位的內容
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SynesthesiaError::input(format!("invalid upload: {}", e)))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| SynesthesiaError::input(format!("failed to read upload: {}", e)))?;
            return Ok(bytes.to_vec());
        }
    }

    Err(SynesthesiaError::input("no image was uploaded"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AudioClip, MusicPrompt};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct FixedCaptioner;

    #[async_trait]
    impl Captioner for FixedCaptioner {
        async fn caption(&self, _image: &Image) -> Result<MusicPrompt> {
            Ok(MusicPrompt::new("bright & airy, 90 BPM"))
        }
    }

    struct FixedComposer;

    #[async_trait]
    impl Composer for FixedComposer {
        async fn compose(&self, _prompt: &MusicPrompt) -> Result<AudioClip> {
            Ok(AudioClip::new(b"ID3".to_vec(), "audio/mpeg"))
        }
    }

    /// 記錄被呼叫次數
    #[derive(Clone, Default)]
    struct CallCounter(Arc<AtomicUsize>);

    impl CallCounter {
        fn calls(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Captioner for CallCounter {
        async fn caption(&self, _image: &Image) -> Result<MusicPrompt> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(MusicPrompt::new("unused"))
        }
    }

    #[async_trait]
    impl Composer for CallCounter {
        async fn compose(&self, _prompt: &MusicPrompt) -> Result<AudioClip> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(AudioClip::new(b"unused".to_vec(), "audio/mpeg"))
        }
    }

    struct FailingComposer;

    #[async_trait]
    impl Composer for FailingComposer {
        async fn compose(&self, _prompt: &MusicPrompt) -> Result<AudioClip> {
            Err(SynesthesiaError::RemoteStatusError {
                service: "Stability AI".to_string(),
                status: 400,
                body: "bad prompt".to_string(),
            })
        }
    }

    const BOUNDARY: &str = "synesthesia-test-boundary";

    fn png_bytes() -> Vec<u8> {
        Image::from_pixels(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            16,
            16,
            Rgb([200, 40, 40]),
        )))
        .unwrap()
        .encoded()
        .to_vec()
    }

    fn upload_request(field: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/compose")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_serves_upload_form() {
        let app = router(MusicPipeline::new(FixedCaptioner, FixedComposer, 100), 1024 * 1024);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Create Music from Image"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(MusicPipeline::new(FixedCaptioner, FixedComposer, 100), 1024 * 1024);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_compose_renders_prompt_and_audio() {
        let app = router(MusicPipeline::new(FixedCaptioner, FixedComposer, 100), 1024 * 1024);

        let response = app
            .oneshot(upload_request("image", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("bright &amp; airy, 90 BPM"));
        assert!(html.contains("data:audio/mpeg;base64,SUQz"));
        assert!(html.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_compose_rejects_non_image_upload() {
        let captioner = CallCounter::default();
        let composer = CallCounter::default();
        let app = router(
            MusicPipeline::new(captioner.clone(), composer.clone(), 100),
            1024 * 1024,
        );

        let response = app
            .oneshot(upload_request("image", b"this is not a picture"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("An error occurred while handling the image file"));
        assert!(!html.contains("<audio"));

        assert_eq!(captioner.calls(), 0);
        assert_eq!(composer.calls(), 0);
    }

    #[tokio::test]
    async fn test_compose_rejects_truncated_png_without_running_pipeline() {
        let captioner = CallCounter::default();
        let composer = CallCounter::default();
        let app = router(
            MusicPipeline::new(captioner.clone(), composer.clone(), 100),
            1024 * 1024,
        );

        let png = png_bytes();
        let response = app
            .oneshot(upload_request("image", &png[..png.len() / 2]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(captioner.calls(), 0);
        assert_eq!(composer.calls(), 0);
    }

    #[tokio::test]
    async fn test_compose_requires_image_field() {
        let app = router(MusicPipeline::new(FixedCaptioner, FixedComposer, 100), 1024 * 1024);

        let response = app
            .oneshot(upload_request("document", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("no image was uploaded"));
    }

    #[tokio::test]
    async fn test_compose_surfaces_remote_errors() {
        let app = router(MusicPipeline::new(FixedCaptioner, FailingComposer, 100), 1024 * 1024);

        let response = app
            .oneshot(upload_request("image", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("An error occurred during generation"));
        assert!(html.contains("400"));
        assert!(html.contains("bad prompt"));
        // 失敗時仍顯示上傳的圖片，頁面可再次提交
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains(r#"action="/compose""#));
    }
}
