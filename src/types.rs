use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Real-valued backscatter raster (rows x columns)
pub type SarRealImage = Array2<f32>;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl FromStr for Polarization {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            other => Err(SarError::InvalidFormat(format!(
                "Invalid polarization: {}",
                other
            ))),
        }
    }
}

/// Comma-joined polarization list as the engine expects it, e.g. `VV,VH`
pub fn join_polarizations(pols: &[Polarization]) -> String {
    pols.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Sentinel-1 acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionMode {
    IW, // Interferometric Wide swath
    EW, // Extra Wide swath
    SM, // StripMap
    WV, // Wave
}

impl AcquisitionMode {
    /// TOPS modes are acquired in bursts and need debursting
    pub fn is_tops(&self) -> bool {
        matches!(self, AcquisitionMode::IW | AcquisitionMode::EW)
    }
}

impl FromStr for AcquisitionMode {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IW" => Ok(AcquisitionMode::IW),
            "EW" => Ok(AcquisitionMode::EW),
            "WV" => Ok(AcquisitionMode::WV),
            // Stripmap products carry the beam id (S1..S6) in the mode field
            s if s.len() == 2 && s.starts_with('S') => Ok(AcquisitionMode::SM),
            other => Err(SarError::InvalidFormat(format!(
                "Unknown acquisition mode: {}",
                other
            ))),
        }
    }
}

/// Sentinel-1 product type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    /// Single Look Complex
    Slc,
    /// Ground Range Detected
    Grd,
    /// Ocean
    Ocn,
    /// Level-0 raw
    Raw,
}

impl FromStr for ProductType {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SLC" => Ok(ProductType::Slc),
            "GRD" => Ok(ProductType::Grd),
            "OCN" => Ok(ProductType::Ocn),
            "RAW" => Ok(ProductType::Raw),
            other => Err(SarError::InvalidFormat(format!(
                "Unknown product type: {}",
                other
            ))),
        }
    }
}

/// Identification parsed from a Sentinel-1 product name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub mission: String,
    pub acquisition_mode: AcquisitionMode,
    pub product_type: ProductType,
    /// Resolution class: F, H, M or `_` when not applicable
    pub resolution: Option<char>,
    pub processing_level: u8,
    pub polarizations: Vec<Polarization>,
    pub start_time: DateTime<Utc>,
    pub stop_time: DateTime<Utc>,
    pub absolute_orbit: u32,
    pub datatake_id: String,
    pub unique_id: String,
}

/// Geospatial bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl From<[f64; 6]> for GeoTransform {
    fn from(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }
}

/// Error types for SAR processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("XML error: {0}")]
    XmlParsing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Area of interest error: {0}")]
    Aoi(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
