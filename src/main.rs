use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "voxterm", about = "Voice-controlled terminal command pipeline")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = voxterm_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("voxterm starting");

    // Microphone capture
    let device_manager = voxterm_audio::DeviceManager::new();
    let device = device_manager
        .get_input_device(&config.audio.device_name)
        .with_context(|| format!("failed to get input device: {}", config.audio.device_name))?;

    let (chunk_tx, chunk_rx) = tokio::sync::mpsc::unbounded_channel();
    let (capture, capture_handle) = voxterm_audio::CaptureNode::new(
        &device,
        chunk_tx,
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.chunk_samples,
    )
    .context("failed to open capture device")?;

    tracing::info!(
        "capturing '{}' at {} Hz, {} ch, {} samples/chunk",
        config.audio.device_name,
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.chunk_samples,
    );

    // STT pipeline
    let stt_config = voxterm_stt::SttConfig::from_section(
        &config.stt,
        config.audio.sample_rate,
        config.audio.channels,
    );
    let detector = voxterm_detect::StopPhraseDetector::new(&config.detector.stop_phrase);
    let mut pipeline =
        voxterm_pipeline::CommandPipeline::new(&config.stt.url, stt_config, detector, chunk_rx);
    let command_rx = pipeline
        .take_command_receiver()
        .expect("fresh pipeline always has a command receiver");

    // Downstream collaborators: correction + terminal
    let terminal: Box<dyn voxterm_dispatch::Terminal> = match config.terminal {
        Some(ref t) => Box::new(voxterm_dispatch::KittyTerminal::new(&t.socket_path)),
        None => Box::new(
            voxterm_dispatch::KittyTerminal::from_env()
                .context("no [terminal] section and KITTY_LISTEN_ON not set")?,
        ),
    };
    let corrector: Box<dyn voxterm_dispatch::Corrector> = match config.correction {
        Some(ref c) if c.enabled => Box::new(voxterm_dispatch::GrokCorrector::new(c)),
        _ => Box::new(voxterm_dispatch::NoopCorrector),
    };

    let mut dispatch = voxterm_dispatch::DispatchHost::new(command_rx, corrector, terminal);
    dispatch.start();

    tracing::info!(
        "listening: finish a spoken command with '{}'",
        config.detector.stop_phrase,
    );

    tokio::select! {
        result = pipeline.run() => {
            result.context("pipeline failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received");
        }
    }

    tracing::info!("shutting down");
    capture_handle.set_enabled(false);
    drop(capture);
    dispatch.shutdown().await;

    Ok(())
}
