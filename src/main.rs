// Prevents console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use memfloat::{config, logging, platform};

fn main() {
    let cfg = config::load_config();
    logging::init(cfg.debug_logging);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "memfloat starting");

    // First run: write the defaults out so they can be edited.
    if !config::config_path().exists() {
        config::save_config(&cfg);
    }

    #[cfg(windows)]
    {
        if let Err(e) = platform::windows::run(&cfg) {
            tracing::error!(error = %e, "overlay host failed");
            std::process::exit(1);
        }
    }

    #[cfg(not(windows))]
    {
        platform::headless::run(&cfg);
    }
}
