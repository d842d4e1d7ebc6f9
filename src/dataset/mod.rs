//! Dataset loading (Async)
//!
//! - The background image and both feature files load concurrently
//! - spawn_blocking for image decode and JSON parsing
//! - Arc<Vec<u8>> for the decoded pixels, uploaded once to the GPU

mod regions;
mod spots;

pub use regions::*;
pub use spots::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

/// Dataset loading failures. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("background image {} has zero size", path.display())]
    EmptyImage { path: PathBuf },
    #[error("loader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Locations of the three dataset assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub background: PathBuf,
    pub spots: PathBuf,
    pub regions: PathBuf,
}

impl DatasetPaths {
    /// Conventional file names inside a dataset directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            background: dir.join("background.png"),
            spots: dir.join("spots.json"),
            regions: dir.join("regions.json"),
        }
    }
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

/// Decoded background raster (RGBA8)
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl BackgroundImage {
    /// height / width, used to keep the scene undistorted
    pub fn scale(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

/// Everything the viewer needs, fully loaded
#[derive(Debug, Clone)]
pub struct Dataset {
    pub background: BackgroundImage,
    pub spots: Vec<RawSpot>,
    pub regions: Vec<RawRegion>,
}

impl Dataset {
    /// Load all three assets concurrently. Any failure aborts the whole load.
    pub async fn load(paths: &DatasetPaths) -> Result<Self, DatasetError> {
        let (background, spots, regions) = tokio::try_join!(
            load_background(paths.background.clone()),
            load_spots(paths.spots.clone()),
            load_regions(paths.regions.clone()),
        )?;

        tracing::info!(
            "Dataset loaded: {}x{} background, {} spots, {} regions",
            background.width,
            background.height,
            spots.len(),
            regions.len()
        );

        Ok(Self {
            background,
            spots,
            regions,
        })
    }
}

async fn read_text(path: &Path) -> Result<String, DatasetError> {
    fs::read_to_string(path).await.map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn load_spots(path: PathBuf) -> Result<Vec<RawSpot>, DatasetError> {
    tracing::info!("Loading spots: {:?}", path);
    let text = read_text(&path).await?;
    tokio::task::spawn_blocking(move || {
        parse_spots(&text).map_err(|source| DatasetError::Json { path, source })
    })
    .await?
}

async fn load_regions(path: PathBuf) -> Result<Vec<RawRegion>, DatasetError> {
    tracing::info!("Loading regions: {:?}", path);
    let text = read_text(&path).await?;
    tokio::task::spawn_blocking(move || {
        parse_regions(&text).map_err(|source| DatasetError::Json { path, source })
    })
    .await?
}

async fn load_background(path: PathBuf) -> Result<BackgroundImage, DatasetError> {
    tracing::info!("Loading background: {:?}", path);
    let bytes = fs::read(&path).await.map_err(|source| DatasetError::Io {
        path: path.clone(),
        source,
    })?;

    // Offload heavy image decoding to blocking thread pool
    tokio::task::spawn_blocking(move || decode_background(&path, &bytes)).await?
}

fn decode_background(path: &Path, bytes: &[u8]) -> Result<BackgroundImage, DatasetError> {
    let img = image::load_from_memory(bytes).map_err(|source| DatasetError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(DatasetError::EmptyImage {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!("Background decoded: {}x{}", width, height);
    Ok(BackgroundImage {
        width,
        height,
        rgba: Arc::new(rgba.into_raw()),
    })
}

/// Feature container: bare array or GeoJSON-style collection
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureFile<T> {
    List(Vec<T>),
    Collection { features: Vec<T> },
}

impl<T> FeatureFile<T> {
    fn into_features(self) -> Vec<T> {
        match self {
            FeatureFile::List(features) | FeatureFile::Collection { features } => features,
        }
    }
}
