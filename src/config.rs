use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::geo::{lat2latp, GeoBounds};

/// Named page sizes in points
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A3,
    A4,
    Custom { width: f64, height: f64 },
}

impl PageSize {
    /// Portrait (width, height) in points
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PageSize::A3 => (842.0, 1190.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Drawable page region in output units (y-up)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PageSetup {
    pub size: PageSize,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub orientation: Orientation,
}

impl PageSetup {
    /// Page box after orientation and margins are applied
    pub fn page_box(&self) -> PageBox {
        let (mut width, mut height) = self.size.dimensions();
        if self.orientation == Orientation::Landscape {
            std::mem::swap(&mut width, &mut height);
        }
        PageBox {
            origin_x: self.margin,
            origin_y: self.margin,
            width: width - self.margin * 2.0,
            height: height - self.margin * 2.0,
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: 0.0,
            orientation: Orientation::Portrait,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
    pub current: f64,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            min: 12.0,
            max: 20.0,
            current: 14.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LayerRange {
    pub min: i32,
    pub max: i32,
}

impl LayerRange {
    #[inline]
    pub fn clamp(&self, layer: i32) -> i32 {
        layer.max(self.min).min(self.max)
    }

    /// Number of layers in the range
    #[inline]
    pub fn count(&self) -> usize {
        (self.max - self.min + 1).max(0) as usize
    }
}

impl Default for LayerRange {
    fn default() -> Self {
        Self { min: -5, max: 5 }
    }
}

/// Everything needed to set up one page render
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JobConfig {
    pub bounds: GeoBounds,
    #[serde(default)]
    pub scale: ScaleRange,
    #[serde(default)]
    pub layers: LayerRange,
    #[serde(default)]
    pub page: PageSetup,
}

impl JobConfig {
    pub fn new(bounds: GeoBounds, page: PageSetup) -> Self {
        Self {
            bounds,
            scale: ScaleRange::default(),
            layers: LayerRange::default(),
            page,
        }
    }

    /// Load a job description from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject jobs that cannot be rendered
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page = self.page.page_box();
        if !(page.width > 0.0 && page.height > 0.0) {
            return Err(ConfigError::DegeneratePage {
                width: page.width,
                height: page.height,
            });
        }
        if self.layers.min > self.layers.max {
            return Err(ConfigError::InvertedLayers {
                min: self.layers.min,
                max: self.layers.max,
            });
        }
        for lat in [self.bounds.min_lat, self.bounds.max_lat] {
            if !(lat > -90.0 && lat < 90.0) {
                return Err(ConfigError::InvalidLatitude(lat));
            }
        }
        let dlon = self.bounds.max_lon - self.bounds.min_lon;
        let dlatp = lat2latp(self.bounds.max_lat) - lat2latp(self.bounds.min_lat);
        if !(dlon > 0.0 && dlatp > 0.0) {
            return Err(ConfigError::ZeroExtent { dlon, dlatp });
        }
        let scale = self.scale;
        if scale.min > scale.max || scale.current < scale.min || scale.current > scale.max {
            return Err(ConfigError::InvalidScale {
                scale: scale.current,
                min: scale.min,
                max: scale.max,
            });
        }
        Ok(())
    }
}
