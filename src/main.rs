use anyhow::Context;
use clap::Parser;
use synesthesia::utils::logger;
use synesthesia::utils::validation::{validate_output_path, Validate};
use synesthesia::{AppConfig, Cli, Command, ErrorKind, MusicPipeline, SynesthesiaError};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::info!("🎵 Starting synesthesia");

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    cli.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    match &cli.command {
        Command::Serve { .. } => serve(config).await,
        Command::Render { image, out } => {
            if let Err(e) = render(&config, image, out).await {
                fail(&e);
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let pipeline = MusicPipeline::from_config(&config)?;
    let app = synesthesia::web::router(pipeline, config.server.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    tracing::info!("🌐 Listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn render(config: &AppConfig, image_path: &Path, out: &Path) -> synesthesia::Result<()> {
    validate_output_path("out", out)?;

    let bytes = tokio::fs::read(image_path).await?;
    let image = synesthesia::Image::decode_blocking(bytes).await?;
    tracing::info!("📁 Loaded {}", image_path.display());

    let pipeline = MusicPipeline::from_config(config)?;
    let composition = pipeline.run(&image).await?;

    tokio::fs::write(out, composition.audio.bytes())
        .await
        .map_err(|e| SynesthesiaError::output(out, e))?;

    println!("✅ Music generated successfully!");
    println!("📝 Prompt: {}", composition.prompt);
    println!("📁 Audio saved to: {}", out.display());
    Ok(())
}

/// 輸出錯誤並依類別決定退出碼
fn fail(e: &SynesthesiaError) -> ! {
    tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.kind() {
        ErrorKind::Configuration => 1,
        ErrorKind::RemoteService => 2,
        ErrorKind::Input => 3,
        ErrorKind::Output => 4,
    };
    std::process::exit(exit_code);
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
