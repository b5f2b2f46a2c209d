use crate::core::stretch::{rgb_composite, to_u8, StretchParams};
use crate::types::{Polarization, SarError, SarRealImage, SarResult};
use gdal::{Dataset, Metadata};
use image::{GrayImage, RgbImage};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Quick-look images written by [`view_geotiff`]
#[derive(Debug, Clone, PartialEq)]
pub struct QuickLooks {
    pub vh: PathBuf,
    pub vv: PathBuf,
    pub rgb: PathBuf,
}

/// Render grayscale VH/VV and an RGB composite of a two-band sigma0 GeoTIFF
pub fn view_geotiff<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    params: &StretchParams,
) -> SarResult<QuickLooks> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();
    params.validate()?;

    log::info!("Rendering quick-looks for {}", input.display());
    let (vh, vv) = read_dual_pol(input)?;

    std::fs::create_dir_all(output_dir)?;
    let stem = output_stem(input);
    let outputs = QuickLooks {
        vh: output_dir.join(format!("{}_plot_vh.png", stem)),
        vv: output_dir.join(format!("{}_plot_vv.png", stem)),
        rgb: output_dir.join(format!("{}_plot_rgb.png", stem)),
    };

    // One pass stretches VV, VH and the ratio; the gray quick-looks reuse its bands
    let composite = rgb_composite(&vv, &vh, params)?;
    log::info!(
        "Stretch bounds: VV {:?}, VH {:?} (percentiles {}-{})",
        composite.vv_bounds,
        composite.vh_bounds,
        params.low_percentile,
        params.high_percentile
    );
    log::debug!("VV/VH ratio stretch bounds: {:?}", composite.ratio_bounds);

    gray_image(&composite.vh)?.save(&outputs.vh)?;
    gray_image(&composite.vv)?.save(&outputs.vv)?;
    rgb_image(&composite.to_rgb())?.save(&outputs.rgb)?;

    log::info!(
        "Wrote {}, {}, {}",
        outputs.vh.display(),
        outputs.vv.display(),
        outputs.rgb.display()
    );
    Ok(outputs)
}

/// File name up to the first `.`, e.g. `preprocessed_slc_EPSG:3857.tif` -> `preprocessed_slc_EPSG:3857`
pub fn output_stem(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .unwrap_or_else(|| "output".to_string())
}

/// Read (VH, VV) from a GeoTIFF
///
/// Band descriptions naming the polarisation win; otherwise band 1 is VH and band 2 is VV,
/// the alphabetical order the engine writes sigma0 bands in. See [`band_order`].
pub fn read_dual_pol(path: &Path) -> SarResult<(SarRealImage, SarRealImage)> {
    let dataset = Dataset::open(path)?;
    let count = dataset.raster_count();
    if count < 2 {
        return Err(SarError::InvalidFormat(format!(
            "{} has {} band(s); VV and VH are required",
            path.display(),
            count
        )));
    }

    let mut named = Vec::with_capacity(count as usize);
    for index in 1..=count {
        let description = dataset.rasterband(index)?.description().unwrap_or_default();
        named.push(polarization_in_name(&description));
    }
    let (vh_index, vv_index) = band_order(&named);
    log::debug!("Using band {} as VH and band {} as VV", vh_index, vv_index);

    Ok((read_band(&dataset, vh_index)?, read_band(&dataset, vv_index)?))
}

/// 1-based (VH, VV) band indices from per-band polarisation names
///
/// A single named band claims its polarisation and the first other band gets the
/// remaining one.
pub fn band_order(named: &[Option<Polarization>]) -> (isize, isize) {
    let find = |pol: Polarization| {
        named
            .iter()
            .position(|p| *p == Some(pol))
            .map(|i| i as isize + 1)
    };
    let other = |index: isize| if index == 1 { 2 } else { 1 };

    match (find(Polarization::VH), find(Polarization::VV)) {
        (Some(vh), Some(vv)) => (vh, vv),
        (Some(vh), None) => (vh, other(vh)),
        (None, Some(vv)) => (other(vv), vv),
        (None, None) => (1, 2),
    }
}

fn polarization_in_name(name: &str) -> Option<Polarization> {
    let upper = name.to_uppercase();
    if upper.ends_with("_VH") || upper == "VH" {
        Some(Polarization::VH)
    } else if upper.ends_with("_VV") || upper == "VV" {
        Some(Polarization::VV)
    } else {
        None
    }
}

/// Read one band as f32, turning the no-data value into NaN
fn read_band(dataset: &Dataset, index: isize) -> SarResult<SarRealImage> {
    let band = dataset.rasterband(index)?;
    let (width, height) = dataset.raster_size();
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let mut data = Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| SarError::Processing(format!("Band {} has unexpected size: {}", index, e)))?;

    if let Some(nodata) = band.no_data_value() {
        let nodata = nodata as f32;
        data.mapv_inplace(|v| if v == nodata { f32::NAN } else { v });
    }
    Ok(data)
}

fn gray_image(band: &SarRealImage) -> SarResult<GrayImage> {
    let (rows, cols) = band.dim();
    let pixels: Vec<u8> = band.iter().map(|&v| to_u8(v)).collect();
    GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| SarError::Processing("Grayscale buffer size mismatch".to_string()))
}

fn rgb_image(rgb: &ndarray::Array3<f32>) -> SarResult<RgbImage> {
    let (rows, cols, _) = rgb.dim();
    let pixels: Vec<u8> = rgb.iter().map(|&v| to_u8(v)).collect();
    RgbImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| SarError::Processing("RGB buffer size mismatch".to_string()))
}
