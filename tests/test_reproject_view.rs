use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use radar_cs::core::{reproject_geotiff, reprojected_path, view_geotiff, StretchParams};
use std::path::Path;

const WIDTH: usize = 64;
const HEIGHT: usize = 48;

/// Two-band float GeoTIFF in EPSG:4326: band 1 = VH ramp, band 2 = VV ramp
fn write_sigma0_geotiff(path: &Path) {
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

    for band_index in 1..=2 {
        let scale = if band_index == 1 { 0.01 } else { 0.1 };
        let data: Vec<f32> = (0..WIDTH * HEIGHT)
            .map(|i| (i % WIDTH) as f32 * scale + (i / WIDTH) as f32 * 0.001)
            .collect();
        let mut band = dataset.rasterband(band_index).unwrap();
        band.write((0, 0), (WIDTH, HEIGHT), &Buffer::new((WIDTH, HEIGHT), data))
            .unwrap();
    }
}

#[test]
fn test_view_geotiff_writes_three_pngs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("preprocessed_slc_EPSG:3857.tif");
    write_sigma0_geotiff(&input);

    let plots = dir.path().join("plots");
    let looks = view_geotiff(&input, &plots, &StretchParams::default()).unwrap();

    assert!(looks.vh.ends_with("preprocessed_slc_EPSG:3857_plot_vh.png"));
    assert!(looks.vv.ends_with("preprocessed_slc_EPSG:3857_plot_vv.png"));
    assert!(looks.rgb.ends_with("preprocessed_slc_EPSG:3857_plot_rgb.png"));

    let vv = image::open(&looks.vv).unwrap().to_luma8();
    assert_eq!(vv.dimensions(), (WIDTH as u32, HEIGHT as u32));
    // Ramp increases left to right: left edge black, right edge saturated
    assert_eq!(vv.get_pixel(0, 0).0, [0]);
    assert_eq!(vv.get_pixel(WIDTH as u32 - 1, HEIGHT as u32 - 1).0, [255]);

    let rgb = image::open(&looks.rgb).unwrap().to_rgb8();
    assert_eq!(rgb.dimensions(), (WIDTH as u32, HEIGHT as u32));

    // Gray quick-looks are the composite's R (VV) and G (VH) channels
    let vh = image::open(&looks.vh).unwrap().to_luma8();
    for (x, y, pixel) in rgb.enumerate_pixels() {
        assert_eq!(vv.get_pixel(x, y).0[0], pixel.0[0]);
        assert_eq!(vh.get_pixel(x, y).0[0], pixel.0[1]);
    }
}

#[test]
fn test_view_rejects_single_band() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("single.tif");
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    driver
        .create_with_band_type::<f32, _>(&input, 8, 8, 1)
        .unwrap();

    assert!(view_geotiff(&input, dir.path(), &StretchParams::default()).is_err());
}

#[test]
fn test_reproject_to_web_mercator() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("preprocessed_slc.tif");
    write_sigma0_geotiff(&input);

    let output = reprojected_path(dir.path().join("out/preprocessed_slc"), "EPSG:3857");
    let raster = reproject_geotiff(&input, &output, "EPSG:3857", "near").unwrap();

    assert!(output.exists());
    assert_eq!(raster.band_count, 2);
    // Web Mercator eastings around -120.5 degrees are roughly -13.4e6 m
    assert!(raster.geo_transform.top_left_x < -13.0e6);
    assert!(raster.geo_transform.pixel_width > 100.0);
}
