//! slate: composites a web-style 2D panel into an OpenXR scene.

mod config;
mod testcard;

#[cfg(target_os = "linux")]
mod app;
#[cfg(target_os = "linux")]
mod glx;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::error;

#[cfg(target_os = "linux")]
use crate::config::ShellConfig;

#[derive(Parser)]
#[command(name = "slate", about = "OpenXR HMD panel shell")]
struct Args {
    /// Path to a JSON config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[cfg(target_os = "linux")]
fn main() {
    slate_core::init_tracing();

    let args = Args::parse();
    let config = match ShellConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let mut app = match app::App::init(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("failed to initialize: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = app.run() {
        error!("frame loop aborted: {e}");
    }
    app.shutdown();
}

#[cfg(not(target_os = "linux"))]
fn main() {
    slate_core::init_tracing();
    let _ = Args::parse();
    error!("slate currently supports Linux X11 runtimes only");
    process::exit(1);
}
