use crate::types::{SarError, SarRealImage, SarResult};
use ndarray::{Array2, Array3, Zip};
use serde::{Deserialize, Serialize};

/// Percentile contrast stretch parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StretchParams {
    /// Lower percentile mapped to 0
    pub low_percentile: f64,
    /// Upper percentile mapped to 1
    pub high_percentile: f64,
    /// Added to the denominator of the VV/VH ratio
    pub ratio_epsilon: f32,
}

impl Default for StretchParams {
    fn default() -> Self {
        Self {
            low_percentile: 2.0,
            high_percentile: 92.0,
            ratio_epsilon: 1e-10,
        }
    }
}

impl StretchParams {
    pub fn validate(&self) -> SarResult<()> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.low_percentile) || !in_range(self.high_percentile) {
            return Err(SarError::Config(format!(
                "Percentiles must lie in [0, 100], got {} and {}",
                self.low_percentile, self.high_percentile
            )));
        }
        if self.low_percentile >= self.high_percentile {
            return Err(SarError::Config(format!(
                "Low percentile {} must be below high percentile {}",
                self.low_percentile, self.high_percentile
            )));
        }
        Ok(())
    }
}

/// Lower/upper values a band was stretched between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchBounds {
    pub low: f32,
    pub high: f32,
}

/// Percentile of the finite values, interpolating linearly between closest ranks
///
/// Returns `None` when there are no finite values.
pub fn percentile(values: &[f32], p: f64) -> Option<f32> {
    let mut finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    sort_values(&mut finite);
    Some(percentile_of_sorted(&finite, p))
}

/// Several percentiles with a single sort
pub fn percentiles(values: &[f32], ps: &[f64]) -> Option<Vec<f32>> {
    let mut finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    sort_values(&mut finite);
    Some(ps.iter().map(|&p| percentile_of_sorted(&finite, p)).collect())
}

#[cfg(feature = "parallel")]
fn sort_values(values: &mut [f32]) {
    use rayon::slice::ParallelSliceMut;
    values.par_sort_unstable_by(|a, b| a.total_cmp(b));
}

#[cfg(not(feature = "parallel"))]
fn sort_values(values: &mut [f32]) {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
}

fn percentile_of_sorted(sorted: &[f32], p: f64) -> f32 {
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    let a = sorted[lower] as f64;
    let b = sorted[upper] as f64;
    (a + (b - a) * weight) as f32
}

/// Rescale a band to [0, 1] between two percentiles
///
/// Non-finite pixels become 0. When the percentile range is empty every pixel is 0.
pub fn stretch_percentile(
    image: &SarRealImage,
    low: f64,
    high: f64,
) -> (SarRealImage, Option<StretchBounds>) {
    let values: Vec<f32> = image.iter().copied().collect();
    let bounds = match percentiles(&values, &[low, high]) {
        Some(p) => StretchBounds {
            low: p[0],
            high: p[1],
        },
        None => {
            log::warn!("Band has no finite values; stretch yields a black image");
            return (Array2::zeros(image.dim()), None);
        }
    };

    (apply_stretch(image, bounds), Some(bounds))
}

/// Rescale between fixed bounds, clipping to [0, 1]
pub fn apply_stretch(image: &SarRealImage, bounds: StretchBounds) -> SarRealImage {
    let range = bounds.high - bounds.low;
    if !(range > 0.0) {
        log::warn!(
            "Degenerate stretch range [{}, {}]; band rendered black",
            bounds.low,
            bounds.high
        );
        return Array2::zeros(image.dim());
    }

    image.mapv(|v| {
        if v.is_finite() {
            ((v - bounds.low) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    })
}

/// Co-pol over cross-pol ratio `vv / (vh + epsilon)`
pub fn band_ratio(vv: &SarRealImage, vh: &SarRealImage, epsilon: f32) -> SarResult<SarRealImage> {
    check_same_shape(vv, vh)?;
    let mut ratio = Array2::zeros(vv.dim());
    Zip::from(&mut ratio)
        .and(vv)
        .and(vh)
        .for_each(|r, &co, &cross| *r = co / (cross + epsilon));
    Ok(ratio)
}

/// Stretched VV, VH and VV/VH ratio bands
#[derive(Debug, Clone)]
pub struct Composite {
    pub vv: SarRealImage,
    pub vh: SarRealImage,
    pub ratio: SarRealImage,
    pub vv_bounds: Option<StretchBounds>,
    pub vh_bounds: Option<StretchBounds>,
    pub ratio_bounds: Option<StretchBounds>,
}

impl Composite {
    /// Stack as (rows, cols, 3) with R = VV, G = VH, B = VV/VH
    pub fn to_rgb(&self) -> Array3<f32> {
        let (rows, cols) = self.vv.dim();
        let mut rgb = Array3::zeros((rows, cols, 3));
        for (channel, band) in [&self.vv, &self.vh, &self.ratio].into_iter().enumerate() {
            rgb.index_axis_mut(ndarray::Axis(2), channel).assign(band);
        }
        rgb
    }
}

/// Build the false-colour composite from calibrated VV and VH bands
pub fn rgb_composite(
    vv: &SarRealImage,
    vh: &SarRealImage,
    params: &StretchParams,
) -> SarResult<Composite> {
    params.validate()?;
    check_same_shape(vv, vh)?;

    let ratio = band_ratio(vv, vh, params.ratio_epsilon)?;
    let (low, high) = (params.low_percentile, params.high_percentile);

    let bands = [vv, vh, &ratio];
    let stretched = stretch_bands(&bands, low, high);
    let mut stretched = stretched.into_iter();
    let mut next = || {
        stretched
            .next()
            .ok_or_else(|| SarError::Processing("Missing stretched band".to_string()))
    };
    let (vv_s, vv_bounds) = next()?;
    let (vh_s, vh_bounds) = next()?;
    let (ratio_s, ratio_bounds) = next()?;

    Ok(Composite {
        vv: vv_s,
        vh: vh_s,
        ratio: ratio_s,
        vv_bounds,
        vh_bounds,
        ratio_bounds,
    })
}

#[cfg(feature = "parallel")]
fn stretch_bands(
    bands: &[&SarRealImage],
    low: f64,
    high: f64,
) -> Vec<(SarRealImage, Option<StretchBounds>)> {
    use rayon::prelude::*;
    bands
        .par_iter()
        .map(|band| stretch_percentile(band, low, high))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn stretch_bands(
    bands: &[&SarRealImage],
    low: f64,
    high: f64,
) -> Vec<(SarRealImage, Option<StretchBounds>)> {
    bands
        .iter()
        .map(|band| stretch_percentile(band, low, high))
        .collect()
}

/// Quantise a [0, 1] band to 8 bits
pub fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn check_same_shape(a: &SarRealImage, b: &SarRealImage) -> SarResult<()> {
    if a.dim() != b.dim() {
        return Err(SarError::Processing(format!(
            "Band shapes differ: {:?} vs {:?}",
            a.dim(),
            b.dim()
        )));
    }
    Ok(())
}
