use crate::types::{GeoTransform, SarError, SarResult};
use gdal::spatial_ref::SpatialRef;
use gdal::Dataset;
use std::ffi::{c_char, c_int, CString};
use std::path::{Path, PathBuf};

/// Output of a GDAL warp
#[derive(Debug, Clone)]
pub struct ReprojectedRaster {
    pub path: PathBuf,
    pub size: (usize, usize),
    pub band_count: isize,
    pub geo_transform: GeoTransform,
}

/// `<base>_<crs>.tif`, e.g. `outputs/preprocessed_slc_EPSG:3857.tif`
pub fn reprojected_path<P: AsRef<Path>>(base: P, target_crs: &str) -> PathBuf {
    let mut path = base.as_ref().as_os_str().to_owned();
    path.push(format!("_{}.tif", target_crs));
    PathBuf::from(path)
}

/// Warp a raster to `target_crs` (anything GDAL's `-t_srs` accepts)
///
/// `resampling` is a GDAL resampling name such as `near` or `bilinear`.
pub fn reproject_geotiff<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    target_crs: &str,
    resampling: &str,
) -> SarResult<ReprojectedRaster> {
    let input = input.as_ref();
    let output = output.as_ref();

    // Fail early with a readable message instead of a warp usage error
    SpatialRef::from_definition(target_crs).map_err(|e| {
        SarError::Processing(format!("Invalid target CRS '{}': {}", target_crs, e))
    })?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    log::info!(
        "Reprojecting {} to {} ({} resampling)",
        input.display(),
        target_crs,
        resampling
    );
    let source = Dataset::open(input)?;

    let args = [
        "-t_srs",
        target_crs,
        "-r",
        resampling,
        "-of",
        "GTiff",
        "-overwrite",
    ];
    warp(&source, output, &args)?;

    let result = Dataset::open(output)?;
    let reprojected = ReprojectedRaster {
        path: output.to_path_buf(),
        size: result.raster_size(),
        band_count: result.raster_count(),
        geo_transform: GeoTransform::from(result.geo_transform()?),
    };
    log::info!(
        "Reprojected raster {}: {}x{} pixels, {} band(s)",
        reprojected.path.display(),
        reprojected.size.0,
        reprojected.size.1,
        reprojected.band_count
    );
    Ok(reprojected)
}

/// Thin wrapper over the GDALWarp utility
fn warp(source: &Dataset, output: &Path, args: &[&str]) -> SarResult<()> {
    let c_output = path_to_cstring(output)?;
    let c_args = args
        .iter()
        .map(|a| CString::new(*a))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SarError::Processing(format!("Invalid warp argument: {}", e)))?;
    let mut argv: Vec<*mut c_char> = c_args.iter().map(|a| a.as_ptr() as *mut c_char).collect();
    argv.push(std::ptr::null_mut());

    unsafe {
        let options = gdal_sys::GDALWarpAppOptionsNew(argv.as_mut_ptr(), std::ptr::null_mut());
        if options.is_null() {
            return Err(SarError::Processing(format!(
                "GDAL rejected warp options {:?}",
                args
            )));
        }

        let mut sources = [source.c_dataset()];
        let mut usage_error: c_int = 0;
        let result = gdal_sys::GDALWarp(
            c_output.as_ptr(),
            std::ptr::null_mut(),
            1,
            sources.as_mut_ptr(),
            options,
            &mut usage_error,
        );
        gdal_sys::GDALWarpAppOptionsFree(options);

        if result.is_null() || usage_error != 0 {
            return Err(SarError::Processing(format!(
                "GDAL warp to {} failed",
                output.display()
            )));
        }
        gdal_sys::GDALClose(result);
    }
    Ok(())
}

fn path_to_cstring(path: &Path) -> SarResult<CString> {
    CString::new(path.to_string_lossy().as_bytes())
        .map_err(|e| SarError::Processing(format!("Invalid path {}: {}", path.display(), e)))
}
