//! radar-cs: Sentinel-1 preprocessing pipeline
//!
//! Drives an external SAR engine through a fixed operator chain (orbit file,
//! thermal noise removal, calibration, deburst, speckle filter, terrain
//! correction, AOI subset), then reprojects the result with GDAL and renders
//! percentile-stretched quick-looks.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    SarRealImage, SarError, SarResult, Polarization, AcquisitionMode, ProductType, ProductInfo,
    BoundingBox, GeoTransform,
};

pub use config::PipelineConfig;
pub use io::{SlcReader, Aoi};
pub use crate::core::{
    preprocess_slc, run_pipeline, reproject_geotiff, view_geotiff, ProcessingEngine, GptEngine,
    DryRunEngine, ProcessingGraph,
};
