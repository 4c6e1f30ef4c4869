//! Chatsync terminal client entry point.

use std::{fs::File, sync::Mutex};

use chatsync_core::env::SystemEnv;
use chatsync_tui::{Args, Runtime, TerminalDriver};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.session_config()?;
    let history = args.load_history()?;
    info!(room = %config.room, user = %config.user_id, url = %args.url, "starting session");

    let driver = TerminalDriver::new(args.url.as_str())?;
    let mut runtime = Runtime::new(driver, SystemEnv::new(), config);
    if !history.is_empty() {
        runtime.seed_history(history);
    }

    Ok(runtime.run().await?)
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(&args.log_file)?;
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
