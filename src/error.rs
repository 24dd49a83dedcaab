use std::path::PathBuf;

use thiserror::Error;

/// Fatal job configuration errors, reported before any drawing begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("page box must have positive size, got {width} x {height}")]
    DegeneratePage { width: f64, height: f64 },
    #[error("layer range is inverted: min {min} > max {max}")]
    InvertedLayers { min: i32, max: i32 },
    #[error("latitude {0} is outside the projectable range (-90, 90)")]
    InvalidLatitude(f64),
    #[error("bounding box has no geographic extent (dlon {dlon}, dlatp {dlatp})")]
    ZeroExtent { dlon: f64, dlatp: f64 },
    #[error("scale {scale} is outside the range [{min}, {max}]")]
    InvalidScale { scale: f64, min: f64, max: f64 },
    #[error("failed to read job file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse job file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Spatial index failures. Collision handling recovers from these locally.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SpatialError {
    #[error("point ({x}, {y}) lies outside the index region")]
    OutOfBounds { x: f64, y: f64 },
    #[error("point has a non-finite coordinate")]
    NonFinite,
}
