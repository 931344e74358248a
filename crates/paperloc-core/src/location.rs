use serde::{Deserialize, Serialize};

/// Where a colorized entity was found rendered in the compiled PDF.
///
/// Coordinates are page-relative fractions; `page` is 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HueLocation {
    pub entity_id: String,
    #[serde(alias = "tex_path")]
    pub source_path: String,
    /// Colorization iteration that produced this location.
    #[serde(default)]
    pub iteration: String,
    #[serde(default)]
    pub hue: f64,
    pub page: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// PDF the location was found in, relative to the compilation directory.
    #[serde(default)]
    pub relative_file_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub page: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

impl HueLocation {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            page: self.page,
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
        }
    }
}
