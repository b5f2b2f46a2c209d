#![cfg(unix)]

mod common;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use ndarray::s;
use radar_cs::core::visualize::read_dual_pol;
use radar_cs::core::{run_pipeline, stretch_percentile, EngineConfig, GptEngine};
use radar_cs::PipelineConfig;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const WIDTH: usize = 64;
const HEIGHT: usize = 48;
const BORDER: usize = 4;
const NODATA: f64 = -9999.0;

fn sigma0(band: &str, row: usize, col: usize) -> f32 {
    let scale = if band == "VV" { 0.1 } else { 0.01 };
    col as f32 * scale + row as f32 * 0.001
}

/// Terrain-corrected output as the engine writes it: VV first, VH second,
/// both described, with a no-data border around the scene
fn write_terrain_corrected(path: &Path) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, WIDTH as isize, HEIGHT as isize, 2)
        .unwrap();
    dataset
        .set_geo_transform(&[-120.5, 0.005, 0.0, 39.0, 0.0, -0.005])
        .unwrap();
    dataset
        .set_spatial_ref(&SpatialRef::from_epsg(4326).unwrap())
        .unwrap();

    for (index, pol) in [(1, "VV"), (2, "VH")] {
        let data: Vec<f32> = (0..WIDTH * HEIGHT)
            .map(|i| {
                let (row, col) = (i / WIDTH, i % WIDTH);
                let inside = (BORDER..HEIGHT - BORDER).contains(&row)
                    && (BORDER..WIDTH - BORDER).contains(&col);
                if inside {
                    sigma0(pol, row, col)
                } else {
                    NODATA as f32
                }
            })
            .collect();
        let mut band = dataset.rasterband(index).unwrap();
        band.set_description(&format!("Sigma0_{}", pol)).unwrap();
        band.set_no_data_value(Some(NODATA)).unwrap();
        band.write((0, 0), (WIDTH, HEIGHT), &Buffer::new((WIDTH, HEIGHT), data))
            .unwrap();
    }
}

/// A gpt stand-in: copies the prepared GeoTIFF to every `.tif` target and
/// touches the other outputs
fn fake_gpt(dir: &Path, geotiff: &Path) -> PathBuf {
    let path = dir.join("gpt");
    let script = format!(
        r#"#!/bin/sh
sed -n 's:.*<file>\(.*\)</file>.*:\1:p' "$1" | tail -n +2 | while read -r f; do
  case "$f" in
    *.tif) cp "{}" "$f" ;;
    *) : > "$f" ;;
  esac
done
"#,
        geotiff.display()
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_described_bands_and_nodata_border() {
    let dir = tempfile::tempdir().unwrap();
    let tif = dir.path().join("terrain_corrected.tif");
    write_terrain_corrected(&tif);

    let (vh, vv) = read_dual_pol(&tif).unwrap();

    // Descriptions win over the default band 1 = VH order
    assert_eq!(vh[[10, 10]], sigma0("VH", 10, 10));
    assert_eq!(vv[[10, 10]], sigma0("VV", 10, 10));

    assert!(vh[[0, 0]].is_nan());
    assert!(vv[[HEIGHT - 1, WIDTH - 1]].is_nan());

    // The border does not pull the stretch bounds towards the no-data value
    let interior = vh
        .slice(s![BORDER..HEIGHT - BORDER, BORDER..WIDTH - BORDER])
        .to_owned();
    let (_, full_bounds) = stretch_percentile(&vh, 2.0, 92.0);
    let (_, interior_bounds) = stretch_percentile(&interior, 2.0, 92.0);
    let full_bounds = full_bounds.unwrap();
    assert_eq!(Some(full_bounds), interior_bounds);
    assert!(full_bounds.low > 0.0);
}

#[test]
fn test_run_pipeline_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempfile::tempdir().unwrap();
    let archive = common::write_fake_safe(
        dir.path(),
        &format!("{}.SAFE.zip", common::SLC_PRODUCT),
        common::SLC_PRODUCT,
        &["iw1"],
        &["vv", "vh"],
    );
    let aoi = common::write_aoi(dir.path());
    let template = dir.path().join("terrain_corrected.tif");
    write_terrain_corrected(&template);

    let engine = GptEngine::new(EngineConfig {
        gpt_path: Some(fake_gpt(dir.path(), &template)),
        threads: None,
        cache_size: None,
        save_graph: None,
    })
    .unwrap();

    let plots = dir.path().join("plots");
    let outputs = run_pipeline(
        &archive,
        dir.path().join("outputs/scene"),
        &aoi,
        &plots,
        &PipelineConfig::default(),
        &engine,
    )
    .expect("pipeline with fake engine should succeed");

    assert!(outputs.preprocessed.dimap.unwrap().exists());
    assert!(outputs.preprocessed.geotiff.unwrap().ends_with("scene.tif"));
    assert!(outputs.reprojected.ends_with("scene_EPSG:3857.tif"));
    assert!(outputs.reprojected.exists());

    assert!(outputs.quick_looks.vh.ends_with("scene_EPSG:3857_plot_vh.png"));
    assert!(outputs.quick_looks.vv.ends_with("scene_EPSG:3857_plot_vv.png"));
    assert!(outputs.quick_looks.rgb.ends_with("scene_EPSG:3857_plot_rgb.png"));

    let (width, height) = Dataset::open(&outputs.reprojected).unwrap().raster_size();
    let rgb = image::open(&outputs.quick_looks.rgb).unwrap().to_rgb8();
    assert_eq!(rgb.dimensions(), (width as u32, height as u32));

    // No-data corner renders black
    let vv = image::open(&outputs.quick_looks.vv).unwrap().to_luma8();
    assert_eq!(vv.get_pixel(0, 0).0, [0]);
}
