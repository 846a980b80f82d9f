//! HTML rendering for the single-page shell.

use crate::domain::model::{Composition, Image};
use crate::utils::error::{ErrorKind, SynesthesiaError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// 頁面要呈現的狀態
pub enum PageView<'a> {
    Upload,
    Composed {
        image: &'a Image,
        composition: &'a Composition,
    },
    Failed {
        image: Option<&'a Image>,
        error: &'a SynesthesiaError,
    },
}

pub fn render(view: &PageView<'_>) -> String {
    let body = match view {
        PageView::Upload => String::new(),
        PageView::Composed { image, composition } => {
            format!(
                "{}\n{}",
                uploaded_image(image),
                composition_section(composition)
            )
        }
        PageView::Failed { image, error } => {
            let image = image.map(uploaded_image).unwrap_or_default();
            format!("{}\n{}", image, error_section(error))
        }
    };

    format!("{}{}{}{}", PAGE_HEAD, UPLOAD_FORM, body, PAGE_TAIL)
}

fn uploaded_image(image: &Image) -> String {
    format!(
        r#"<section>
  <h2>Your image</h2>
  <img class="upload" alt="Your uploaded image ({w}x{h})" src="{src}">
</section>"#,
        w = image.width(),
        h = image.height(),
        src = data_url(image.mime_type(), image.encoded()),
    )
}

fn composition_section(composition: &Composition) -> String {
    format!(
        r#"<section class="success">
  <p class="notice">Music generated successfully!</p>
  <h2>Generated music prompt</h2>
  <p class="prompt">{prompt}</p>
  <h2>Listen to your music</h2>
  <audio controls src="{src}"></audio>
</section>"#,
        prompt = escape_html(composition.prompt.as_str()),
        src = data_url(composition.audio.mime_type(), composition.audio.bytes()),
    )
}

fn error_section(error: &SynesthesiaError) -> String {
    let title = match error.kind() {
        ErrorKind::Configuration => "The app is not configured",
        ErrorKind::RemoteService => "An error occurred during generation",
        ErrorKind::Input => "An error occurred while handling the image file",
        ErrorKind::Output => "Could not save the result",
    };

    format!(
        r#"<section class="error">
  <h2>{title}</h2>
  <p>{message}</p>
  <p class="hint">{hint}</p>
</section>"#,
        title = title,
        message = escape_html(&error.to_string()),
        hint = escape_html(error.recovery_suggestion()),
    )
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AI Music Synesthesia</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
  img.upload, #preview { max-width: 100%; border-radius: 6px; }
  #preview[hidden], #busy[hidden] { display: none; }
  #busy { margin-top: 1rem; color: #555; }
  .prompt { background: #eef4fb; padding: 1rem; border-radius: 6px; }
  .notice { color: #1b7a3a; font-weight: 600; }
  .error { background: #fdecea; padding: 1rem; border-radius: 6px; }
  .hint { color: #555; }
  audio { width: 100%; }
</style>
</head>
<body>
<h1>AI Music Synesthesia</h1>
<p>Turn your images into original music.</p>
"#;

const UPLOAD_FORM: &str = r#"<section>
  <h2>1. Upload an image</h2>
  <form id="compose" method="post" action="/compose" enctype="multipart/form-data">
    <input id="image" type="file" name="image" accept="image/png,image/jpeg" required>
    <img id="preview" alt="Preview" hidden>
    <h2>2. Generate music</h2>
    <button id="submit" type="submit">Create Music from Image</button>
    <p id="busy" hidden>AI is analyzing your image and composing music... This may take a minute.</p>
  </form>
</section>
<script>
  const input = document.getElementById("image");
  const preview = document.getElementById("preview");
  input.addEventListener("change", () => {
    const file = input.files[0];
    if (!file) { preview.hidden = true; return; }
    preview.src = URL.createObjectURL(file);
    preview.hidden = false;
  });
  document.getElementById("compose").addEventListener("submit", () => {
    document.getElementById("submit").disabled = true;
    document.getElementById("busy").hidden = false;
  });
</script>
"#;

const PAGE_TAIL: &str = "\n</body>\n</html>\n";
