//! Pipeline configuration
//!
//! Every field has a default matching the standard processing chain, so a
//! JSON file only needs the values it changes:
//!
//! ```json
//! { "targetCrs": "EPSG:32610", "speckleFilter": { "filter": "Lee Sigma" } }
//! ```

use crate::core::engine::EngineConfig;
use crate::core::graph::OutputFormat;
use crate::core::operators::{
    ApplyOrbitParams, CalibrationParams, SpeckleFilterParams, TerrainCorrectionParams,
    ThermalNoiseParams,
};
use crate::core::stretch::StretchParams;
use crate::types::{Polarization, SarError, SarResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Polarisations to calibrate and terrain-correct
    pub polarizations: Vec<Polarization>,
    pub apply_orbit: ApplyOrbitParams,
    pub thermal_noise: ThermalNoiseParams,
    pub calibration: CalibrationParams,
    pub speckle_filter: SpeckleFilterParams,
    pub terrain_correction: TerrainCorrectionParams,
    pub output_formats: Vec<OutputFormat>,
    /// CRS the GeoTIFF is warped to after processing
    pub target_crs: String,
    /// GDAL resampling used by the warp
    pub resampling: String,
    pub stretch: StretchParams,
    pub engine: EngineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            polarizations: vec![Polarization::VV, Polarization::VH],
            apply_orbit: ApplyOrbitParams::default(),
            thermal_noise: ThermalNoiseParams::default(),
            calibration: CalibrationParams::default(),
            speckle_filter: SpeckleFilterParams::default(),
            terrain_correction: TerrainCorrectionParams::default(),
            output_formats: vec![OutputFormat::BeamDimap, OutputFormat::GeoTiff],
            target_crs: "EPSG:3857".to_string(),
            resampling: "near".to_string(),
            stretch: StretchParams::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON configuration file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SarError::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| SarError::Config(format!("Invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        log::debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> SarResult<()> {
        if self.polarizations.is_empty() {
            return Err(SarError::Config("No polarizations selected".to_string()));
        }
        if self.output_formats.is_empty() {
            return Err(SarError::Config("No output formats selected".to_string()));
        }
        if self.target_crs.trim().is_empty() {
            return Err(SarError::Config("Target CRS is empty".to_string()));
        }
        let spacing = self.terrain_correction.pixel_spacing_in_meter;
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(SarError::Config(format!(
                "Pixel spacing must be positive, got {}",
                spacing
            )));
        }
        if self.speckle_filter.filter_size_x == 0 || self.speckle_filter.filter_size_y == 0 {
            return Err(SarError::Config("Speckle filter size must be non-zero".to_string()));
        }
        if self.engine.threads == Some(0) {
            return Err(SarError::Config("Engine thread count must be non-zero".to_string()));
        }
        self.stretch.validate()
    }
}
