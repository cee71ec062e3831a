//! VisionCare: vision-risk screening terminal application.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use visioncare::adapters::sanitize::SanitizingMakeWriter;
use visioncare::config::AppConfig;
use visioncare::tui::App;

fn main() -> Result<()> {
    let config = AppConfig::from_env();

    // Logging to the terminal would corrupt the TUI's alternate screen, so an
    // interactive session logs to a file unless told otherwise.
    let use_file = config.log_mode.use_file(std::io::stdout().is_terminal());

    let (writer, _guard) = if use_file {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer().with_writer(
                SanitizingMakeWriter::new(writer).with_max_bytes(config.sanitize_max_bytes),
            ),
        )
        .init();

    tracing::info!("Starting VisionCare...");

    let mut app = App::new(&config)?;
    app.run()?;

    tracing::info!("VisionCare shutdown complete.");
    Ok(())
}
