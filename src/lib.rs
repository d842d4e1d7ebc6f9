//! tissue-view: GPU viewer for spatial transcriptomics
//!
//! Draws a tissue background image with gene-expression spots and cell
//! region polygons on top, filtered and colored from a small control panel.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tissue_view::{ViewerConfig, launch_viewer};
//!
//! // Dataset directory with background.png, spots.json and regions.json
//! launch_viewer(ViewerConfig::for_dataset_dir("data/mouse_brain")).unwrap();
//!
//! // Launch with custom parameters
//! launch_viewer(ViewerConfig {
//!     title: "Hippocampus".to_string(),
//!     marker_style: tissue_view::MarkerStyle::Circles,
//!     ..ViewerConfig::for_dataset_dir("data/hippocampus")
//! }).unwrap();
//! ```

pub mod app;
pub mod camera;
pub mod dataset;
pub mod renderer;
pub mod scene;
pub mod ui;

use anyhow::{Context, Result};
use std::path::Path;
use winit::event_loop::{ControlFlow, EventLoop};

// Re-export key types
pub use app::{App, ViewerConfig};
pub use camera::{CameraConfig, CameraController};
pub use dataset::{Dataset, DatasetError, DatasetPaths};
pub use scene::{LayerVisibility, MarkerStyle, SceneState};

/// Load the dataset, then open the viewer window
///
/// Loading failures are fatal. This function blocks until the window is closed.
pub fn launch_viewer(config: ViewerConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start loader runtime")?;
    let dataset = runtime
        .block_on(Dataset::load(&config.dataset))
        .context("Failed to load dataset")?;
    drop(runtime);

    // Create event loop
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, dataset);

    // Run event loop (winit 0.29 style)
    event_loop.run(move |event, target| {
        app.handle_event(event, target);
    })?;

    Ok(())
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Convenience constructors for ViewerConfig
impl ViewerConfig {
    /// View the conventional asset files inside `dir`
    pub fn for_dataset_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self {
            title: format!("tissue-view - {}", name),
            dataset: DatasetPaths::in_dir(dir),
            ..Default::default()
        }
    }
}
