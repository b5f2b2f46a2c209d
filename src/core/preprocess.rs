use crate::config::PipelineConfig;
use crate::core::engine::ProcessingEngine;
use crate::core::graph::{OutputFormat, ProcessingGraph};
use crate::core::operators::{deburst_step, subset_step, OperatorStep};
use crate::core::reproject::{reproject_geotiff, reprojected_path};
use crate::core::visualize::{view_geotiff, QuickLooks};
use crate::io::slc_reader::select_source_bands;
use crate::io::{Aoi, SlcReader};
use crate::types::{ProductInfo, ProductType, SarError, SarResult};
use std::path::{Path, PathBuf};

/// Files the preprocessing graph produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessOutputs {
    pub dimap: Option<PathBuf>,
    pub geotiff: Option<PathBuf>,
}

/// Operator chain in its fixed order:
/// Apply-Orbit-File, ThermalNoiseRemoval, Calibration, TOPSAR-Deburst,
/// Speckle-Filter, Terrain-Correction, Subset.
///
/// Deburst only applies to TOPS SLC products; GRD products are delivered debursted.
pub fn build_chain(
    config: &PipelineConfig,
    product: &ProductInfo,
    source_bands: &[String],
    aoi_wkt: &str,
) -> Vec<OperatorStep> {
    let mut steps = vec![
        config.apply_orbit.to_step(),
        config.thermal_noise.to_step(),
        config.calibration.to_step(&config.polarizations, source_bands),
    ];

    if product.product_type == ProductType::Slc && product.acquisition_mode.is_tops() {
        steps.push(deburst_step());
    } else {
        log::info!(
            "Skipping TOPSAR-Deburst for {:?} {:?} product",
            product.acquisition_mode,
            product.product_type
        );
    }

    steps.push(config.speckle_filter.to_step());
    steps.push(config.terrain_correction.to_step(&config.polarizations));
    steps.push(subset_step(aoi_wkt));
    steps
}

/// Build the full graph for an input archive without running it
pub fn build_graph<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    input: P,
    output_base: Q,
    aoi_path: R,
    config: &PipelineConfig,
) -> SarResult<ProcessingGraph> {
    let input = input.as_ref();
    let output_base = output_base.as_ref();
    config.validate()?;

    let mut reader = SlcReader::new(input)?;
    let product = reader.product_info()?;
    log::info!(
        "Product {} ({:?} {:?}, {} to {})",
        product.product_id,
        product.acquisition_mode,
        product.product_type,
        product.start_time,
        product.stop_time
    );

    let missing: Vec<_> = config
        .polarizations
        .iter()
        .filter(|p| !product.polarizations.contains(p))
        .collect();
    if !missing.is_empty() {
        return Err(SarError::Metadata(format!(
            "Product {} does not carry polarization(s) {:?}",
            product.product_id, missing
        )));
    }

    let bands = reader.band_names()?;
    let source_bands = select_source_bands(&bands, &config.polarizations);
    if source_bands.is_empty() {
        return Err(SarError::Metadata(format!(
            "No bands for {:?} in {}",
            config.polarizations,
            input.display()
        )));
    }
    log::debug!("Calibration source bands: {}", source_bands.join(","));

    let aoi = Aoi::from_geojson_file(aoi_path)?;
    let wkt = aoi.to_wkt();
    log::info!("Subset region: {}", wkt);

    let graph = build_chain(config, &product, &source_bands, &wkt)
        .into_iter()
        .fold(ProcessingGraph::new(input), ProcessingGraph::then);
    let graph = config
        .output_formats
        .iter()
        .fold(graph, |graph, format| graph.write(*format, output_base));
    Ok(graph)
}

/// Run the preprocessing chain on a zipped Sentinel-1 product
///
/// Writes `<output_base>.dim` and/or `<output_base>.tif` depending on the
/// configured output formats.
pub fn preprocess_slc<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    input: P,
    output_base: Q,
    aoi_path: R,
    config: &PipelineConfig,
    engine: &dyn ProcessingEngine,
) -> SarResult<PreprocessOutputs> {
    let output_base = output_base.as_ref();
    let graph = build_graph(input, output_base, aoi_path, config)?;

    if let Some(parent) = output_base.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    log::info!("Executing preprocessing graph with the {} engine", engine.name());
    engine.execute(&graph)?;

    let mut outputs = PreprocessOutputs::default();
    for target in graph.writes() {
        match target.format {
            OutputFormat::BeamDimap => outputs.dimap = Some(target.path.clone()),
            OutputFormat::GeoTiff => outputs.geotiff = Some(target.path.clone()),
        }
    }
    Ok(outputs)
}

/// Everything a full pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub preprocessed: PreprocessOutputs,
    pub reprojected: PathBuf,
    pub quick_looks: QuickLooks,
}

/// Preprocess, reproject the GeoTIFF to the configured CRS and render quick-looks
pub fn run_pipeline<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>, S: AsRef<Path>>(
    input: P,
    output_base: Q,
    aoi_path: R,
    plot_dir: S,
    config: &PipelineConfig,
    engine: &dyn ProcessingEngine,
) -> SarResult<PipelineOutputs> {
    let output_base = output_base.as_ref();
    let preprocessed = preprocess_slc(input, output_base, aoi_path, config, engine)?;

    let geotiff = preprocessed.geotiff.clone().ok_or_else(|| {
        SarError::Config("Reprojection needs GeoTIFF among the output formats".to_string())
    })?;

    let reprojected = reprojected_path(output_base, &config.target_crs);
    reproject_geotiff(&geotiff, &reprojected, &config.target_crs, &config.resampling)?;

    let quick_looks = view_geotiff(&reprojected, plot_dir, &config.stretch)?;

    Ok(PipelineOutputs {
        preprocessed,
        reprojected,
        quick_looks,
    })
}
