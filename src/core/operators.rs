use crate::types::{join_polarizations, Polarization};
use serde::{Deserialize, Serialize};

/// A single operator parameter value as the engine receives it
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

/// One named engine operator with its flat parameter set, in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorStep {
    pub operator: String,
    pub parameters: Vec<(String, ParamValue)>,
}

impl OperatorStep {
    pub fn new(operator: &str) -> Self {
        Self {
            operator: operator.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter, replacing an earlier value with the same key
    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.parameters.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Apply-Orbit-File parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplyOrbitParams {
    pub orbit_type: String,
    pub poly_degree: u32,
    pub continue_on_fail: bool,
}

impl Default for ApplyOrbitParams {
    fn default() -> Self {
        Self {
            orbit_type: "Sentinel Precise (Auto Download)".to_string(),
            poly_degree: 3,
            continue_on_fail: false,
        }
    }
}

impl ApplyOrbitParams {
    pub fn to_step(&self) -> OperatorStep {
        OperatorStep::new("Apply-Orbit-File")
            .param("orbitType", self.orbit_type.as_str())
            .param("polyDegree", self.poly_degree.to_string())
            .param("continueOnFail", self.continue_on_fail)
    }
}

/// ThermalNoiseRemoval parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThermalNoiseParams {
    pub remove_thermal_noise: bool,
    pub output_noise: bool,
    pub reintroduce_thermal_noise: bool,
}

impl Default for ThermalNoiseParams {
    fn default() -> Self {
        Self {
            remove_thermal_noise: true,
            output_noise: false,
            reintroduce_thermal_noise: false,
        }
    }
}

impl ThermalNoiseParams {
    pub fn to_step(&self) -> OperatorStep {
        OperatorStep::new("ThermalNoiseRemoval")
            .param("removeThermalNoise", self.remove_thermal_noise)
            .param("outputNoise", self.output_noise)
            .param("reintroduceThermalNoise", self.reintroduce_thermal_noise)
    }
}

/// Radiometric calibration parameters; only sigma0 in linear scale by default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalibrationParams {
    pub output_sigma_band: bool,
    pub output_image_scale_in_db: bool,
    pub output_image_in_complex: bool,
    pub create_gamma_band: bool,
    pub create_beta_band: bool,
    pub output_beta_band: bool,
    pub output_gamma_band: bool,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            output_sigma_band: true,
            output_image_scale_in_db: false,
            output_image_in_complex: false,
            create_gamma_band: false,
            create_beta_band: false,
            output_beta_band: false,
            output_gamma_band: false,
        }
    }
}

impl CalibrationParams {
    pub fn to_step(&self, polarizations: &[Polarization], source_bands: &[String]) -> OperatorStep {
        OperatorStep::new("Calibration")
            .param("outputSigmaBand", self.output_sigma_band)
            .param("selectedPolarisations", join_polarizations(polarizations))
            .param("sourceBands", source_bands.join(","))
            .param("outputImageScaleInDb", self.output_image_scale_in_db)
            .param("outputImageInComplex", self.output_image_in_complex)
            .param("createGammaBand", self.create_gamma_band)
            .param("createBetaBand", self.create_beta_band)
            .param("outputBetaBand", self.output_beta_band)
            .param("outputGammaBand", self.output_gamma_band)
    }
}

/// TOPSAR-Deburst takes no parameters
pub fn deburst_step() -> OperatorStep {
    OperatorStep::new("TOPSAR-Deburst")
}

/// Speckle-Filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeckleFilterParams {
    /// Filter name as the engine knows it, e.g. `Refined Lee`, `Lee Sigma`
    pub filter: String,
    pub filter_size_x: u32,
    pub filter_size_y: u32,
    pub damping_factor: u32,
    pub estimate_enl: bool,
    pub enl: f64,
    pub num_looks: u32,
    pub target_window_size: String,
    pub sigma: f64,
    pub an_size: u32,
}

impl Default for SpeckleFilterParams {
    fn default() -> Self {
        Self {
            filter: "Refined Lee".to_string(),
            filter_size_x: 3,
            filter_size_y: 3,
            damping_factor: 2,
            estimate_enl: true,
            enl: 1.0,
            num_looks: 1,
            target_window_size: "3x3".to_string(),
            sigma: 0.9,
            an_size: 50,
        }
    }
}

impl SpeckleFilterParams {
    pub fn to_step(&self) -> OperatorStep {
        OperatorStep::new("Speckle-Filter")
            .param("filter", self.filter.as_str())
            .param("filterSizeX", self.filter_size_x.to_string())
            .param("filterSizeY", self.filter_size_y.to_string())
            .param("dampingFactor", self.damping_factor.to_string())
            .param("estimateENL", self.estimate_enl)
            .param("enl", format_decimal(self.enl))
            .param("numLooksStr", self.num_looks.to_string())
            .param("targetWindowSizeStr", self.target_window_size.as_str())
            .param("sigmaStr", format_decimal(self.sigma))
            .param("anSize", self.an_size.to_string())
    }
}

/// Range-Doppler terrain correction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerrainCorrectionParams {
    pub dem_name: String,
    pub img_resampling_method: String,
    pub pixel_spacing_in_meter: f64,
    /// `AUTO:42001` selects the UTM zone of the scene centre
    pub map_projection: String,
    pub nodata_value_at_sea: bool,
    pub save_selected_source_band: bool,
}

impl Default for TerrainCorrectionParams {
    fn default() -> Self {
        Self {
            dem_name: "Copernicus 30m Global DEM".to_string(),
            img_resampling_method: "BILINEAR_INTERPOLATION".to_string(),
            pixel_spacing_in_meter: 10.0,
            map_projection: "AUTO:42001".to_string(),
            nodata_value_at_sea: false,
            save_selected_source_band: true,
        }
    }
}

impl TerrainCorrectionParams {
    pub fn to_step(&self, polarizations: &[Polarization]) -> OperatorStep {
        OperatorStep::new("Terrain-Correction")
            .param("demName", self.dem_name.as_str())
            .param("imgResamplingMethod", self.img_resampling_method.as_str())
            .param("pixelSpacingInMeter", format_decimal(self.pixel_spacing_in_meter))
            .param("mapProjection", self.map_projection.as_str())
            .param("nodataValueAtSea", self.nodata_value_at_sea)
            .param("saveSelectedSourceBand", self.save_selected_source_band)
            .param("selectedPolarisations", join_polarizations(polarizations))
    }
}

/// Geographic subset to the AOI polygon
pub fn subset_step(geo_region_wkt: &str) -> OperatorStep {
    OperatorStep::new("Subset").param("geoRegion", geo_region_wkt)
}

/// Decimal with at least one fractional digit, e.g. `10.0`, `0.9`
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_speckle_step() {
        let step = SpeckleFilterParams::default().to_step();
        assert_eq!(step.operator, "Speckle-Filter");
        assert_eq!(step.parameters.len(), 10);
        assert_eq!(step.get("filter"), Some(&ParamValue::from("Refined Lee")));
        assert_eq!(step.get("enl").map(|v| v.to_string()), Some("1.0".to_string()));
        assert_eq!(step.get("sigmaStr").map(|v| v.to_string()), Some("0.9".to_string()));
        assert_eq!(step.get("estimateENL"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_param_replaces_existing_key() {
        let step = OperatorStep::new("Subset")
            .param("geoRegion", "a")
            .param("geoRegion", "b");
        assert_eq!(step.parameters.len(), 1);
        assert_eq!(step.get("geoRegion"), Some(&ParamValue::from("b")));
    }

    #[test]
    fn test_calibration_step_joins_lists() {
        let bands = vec!["Intensity_IW1_VV".to_string(), "Intensity_IW2_VV".to_string()];
        let step = CalibrationParams::default().to_step(&[Polarization::VV, Polarization::VH], &bands);
        assert_eq!(
            step.get("selectedPolarisations").map(|v| v.to_string()),
            Some("VV,VH".to_string())
        );
        assert_eq!(
            step.get("sourceBands").map(|v| v.to_string()),
            Some("Intensity_IW1_VV,Intensity_IW2_VV".to_string())
        );
    }

    #[test]
    fn test_terrain_correction_spacing_format() {
        let step = TerrainCorrectionParams::default().to_step(&[Polarization::VV]);
        assert_eq!(
            step.get("pixelSpacingInMeter").map(|v| v.to_string()),
            Some("10.0".to_string())
        );
        assert_eq!(
            step.get("mapProjection").map(|v| v.to_string()),
            Some("AUTO:42001".to_string())
        );
    }
}
