use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use weft_bridge::BridgeServer;
use weft_common::config::ConfigLoader;
use weft_engine::{EventCapture, LogSink, RecorderHandle};
use weft_gen::{ExportSink, ScriptGenerator};

mod console;

#[derive(Parser, Debug)]
#[command(
    name = "weft",
    version,
    about = "Records browser interactions and turns them into Selenium scripts"
)]
struct Args {
    /// WebSocket port for the browser extension
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (default: ./weft.yaml, then ~/.weft/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for generated scripts and exported logs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Export the raw log on stop instead of calling the generator
    #[arg(long)]
    no_generate: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Log to stderr so stdout stays clean for the console
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConfigLoader::load_default()
            .await
            .context("loading default config")?,
    };
    if let Some(port) = args.port {
        config.bridge.port = port;
    }
    if let Some(dir) = args.output_dir {
        config.generator.output_dir = dir;
    }

    let sink: Arc<dyn LogSink> = if args.no_generate {
        Arc::new(ExportSink::new(config.generator.output_dir.clone()))
    } else {
        Arc::new(ScriptGenerator::new(config.generator.clone()))
    };
    let handle = RecorderHandle::new(&config.recorder, Some(sink));

    let (events_tx, events_rx) = mpsc::channel(64);
    let capture = EventCapture::new(handle.clone(), config.recorder.debounce_ms);
    tokio::spawn(capture.run(events_rx));

    let bridge = BridgeServer::new(config.bridge.port, events_tx, handle.context_watch());
    let addr = bridge
        .start()
        .await
        .context("starting the extension bridge")?;

    println!("Listening for the browser extension on ws://{addr}");
    println!("Type 'help' for commands, 'exit' to quit.");

    console::run(handle.clone()).await?;

    // finalize a recording left running before the runtime goes away
    if handle.is_recording() {
        handle.stop().await;
    }
    handle.drain().await;
    Ok(())
}
