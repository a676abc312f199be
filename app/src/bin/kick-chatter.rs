//! Terminal chat viewer for one or more Kick channels.
//!
//! Usage: `kick-chatter [slug,slug...]`. Channels may also be set with
//! `KICK_CHANNELS` or joined interactively.

use kick_chatter_lib::config::{self, AppConfig};
use kick_chatter_lib::runtime::Core;
use kick_chatter_lib::ui;

fn main() -> anyhow::Result<()> {
    // Step 1: .env before anything reads the environment
    let dotenv = config::load_dotenv();

    // Step 2: Settings, with channels from the command line taking precedence
    let mut config = AppConfig::load()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        config.channels = config::app_config::parse_slug_list(&args.join(","));
    }

    // Step 3: Tracing at the validated level, then report what loading found
    kick_chatter_lib::init_tracing(&config.log_level);
    match dotenv {
        Some(path) => tracing::info!(path, "Loaded .env"),
        None => tracing::debug!("No .env file found"),
    }
    config.report_rejected();
    tracing::info!("Starting Kick Chatter");

    // Step 4: Scheduler thread
    let (core, events) = Core::start(&config)?;

    // Step 5: UI loop on this thread until quit
    ui::run(core, events, &config)?;
    tracing::info!("Kick Chatter stopped");
    Ok(())
}
