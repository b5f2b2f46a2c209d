//! Python bindings

use crate::config::PipelineConfig;
use crate::core::engine::GptEngine;
use crate::io::Aoi;
use crate::types::SarError;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(e: SarError) -> PyErr {
    match e {
        SarError::Config(_) | SarError::Aoi(_) | SarError::InvalidFormat(_) => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn load_config(config_path: Option<&str>) -> PyResult<PipelineConfig> {
    match config_path {
        Some(path) => PipelineConfig::load(path).map_err(to_py_err),
        None => Ok(PipelineConfig::default()),
    }
}

/// Run the preprocessing graph; returns (dimap_path, geotiff_path)
#[pyfunction]
#[pyo3(signature = (file_path, output_file = "outputs/preprocessed_slc", aoi_file = "AOI_Rubicon_sent1.geojson", config_path = None))]
fn preprocess_slc(
    file_path: &str,
    output_file: &str,
    aoi_file: &str,
    config_path: Option<&str>,
) -> PyResult<(Option<String>, Option<String>)> {
    let config = load_config(config_path)?;
    let engine = GptEngine::new(config.engine.clone()).map_err(to_py_err)?;
    let outputs = crate::core::preprocess::preprocess_slc(file_path, output_file, aoi_file, &config, &engine)
        .map_err(to_py_err)?;
    Ok((
        outputs.dimap.map(|p| p.to_string_lossy().into_owned()),
        outputs.geotiff.map(|p| p.to_string_lossy().into_owned()),
    ))
}

#[pyfunction]
#[pyo3(signature = (input_file, output_file, target_crs, resampling = "near"))]
fn reproject_geotiff(input_file: &str, output_file: &str, target_crs: &str, resampling: &str) -> PyResult<()> {
    crate::core::reproject::reproject_geotiff(input_file, output_file, target_crs, resampling)
        .map(|_| ())
        .map_err(to_py_err)
}

/// Render quick-looks; returns the (vh, vv, rgb) PNG paths
#[pyfunction]
#[pyo3(signature = (input_file, output_dir = "outputs/", low_percentile = 2.0, high_percentile = 92.0))]
fn view_geotiff(
    input_file: &str,
    output_dir: &str,
    low_percentile: f64,
    high_percentile: f64,
) -> PyResult<(String, String, String)> {
    let params = crate::core::stretch::StretchParams {
        low_percentile,
        high_percentile,
        ..Default::default()
    };
    let looks = crate::core::visualize::view_geotiff(input_file, output_dir, &params).map_err(to_py_err)?;
    Ok((
        looks.vh.to_string_lossy().into_owned(),
        looks.vv.to_string_lossy().into_owned(),
        looks.rgb.to_string_lossy().into_owned(),
    ))
}

#[pyfunction]
fn aoi_to_wkt(geojson_file: &str) -> PyResult<String> {
    Aoi::from_geojson_file(geojson_file)
        .map(|aoi| aoi.to_wkt())
        .map_err(to_py_err)
}

#[pyfunction]
#[pyo3(signature = (image, low_percentile = 2.0, high_percentile = 92.0))]
fn stretch_percentile<'py>(
    py: Python<'py>,
    image: PyReadonlyArray2<'py, f32>,
    low_percentile: f64,
    high_percentile: f64,
) -> &'py PyArray2<f32> {
    let image = image.as_array().to_owned();
    let (stretched, _) = crate::core::stretch::stretch_percentile(&image, low_percentile, high_percentile);
    stretched.into_pyarray(py)
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(preprocess_slc, m)?)?;
    m.add_function(wrap_pyfunction!(reproject_geotiff, m)?)?;
    m.add_function(wrap_pyfunction!(view_geotiff, m)?)?;
    m.add_function(wrap_pyfunction!(aoi_to_wkt, m)?)?;
    m.add_function(wrap_pyfunction!(stretch_percentile, m)?)?;
    Ok(())
}
