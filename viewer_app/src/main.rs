//! Free-fly OBJ viewer
//!
//! Loads the model named in `viewer.toml` (or `viewer.ron`) from the working
//! directory and flies a camera around it. Without a config file the
//! defaults apply.

mod app;

use viewer_engine::config::ViewerConfig;
use viewer_engine::foundation::logging;

use crate::app::ViewerApp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("info");

    log::info!("Starting OBJ viewer");
    if let Ok(cwd) = std::env::current_dir() {
        log::debug!("Current working directory: {}", cwd.display());
    }

    let config = match ViewerConfig::discover(&std::env::current_dir()?)? {
        Some((path, config)) => {
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        None => {
            log::info!("No viewer.toml or viewer.ron found, using defaults");
            ViewerConfig::default()
        }
    };

    let mut app = ViewerApp::new(&config).map_err(|e| {
        log::error!("Startup failed: {e}");
        e
    })?;
    app.run()?;

    log::info!("Viewer finished");
    Ok(())
}
