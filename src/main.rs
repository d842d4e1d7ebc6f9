//! tissue-view: GPU viewer for spatial transcriptomics

use anyhow::Result;
use std::path::{Path, PathBuf};
use tissue_view::{launch_viewer, ViewerConfig, VERSION};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("tissue-view v{}", VERSION);

    // Parse command line arguments
    let arg = std::env::args().nth(1).map(PathBuf::from);
    let config = resolve_config(arg.as_deref())?;

    launch_viewer(config)
}

/// A JSON file is a config, a directory is a dataset.
/// Without an argument, use the user config if present.
fn resolve_config(arg: Option<&Path>) -> Result<ViewerConfig> {
    match arg {
        Some(path) if path.is_dir() => Ok(ViewerConfig::for_dataset_dir(path)),
        Some(path) => ViewerConfig::load(path),
        None => {
            let user_config = dirs::config_dir().map(|d| d.join("tissue-view").join("config.json"));
            match user_config {
                Some(path) if path.is_file() => ViewerConfig::load(path),
                _ => {
                    tracing::info!("No config given, looking for a dataset in the current directory");
                    Ok(ViewerConfig::for_dataset_dir("."))
                }
            }
        }
    }
}
