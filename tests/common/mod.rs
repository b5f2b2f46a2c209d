#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SLC_PRODUCT: &str =
    "S1A_IW_SLC__1SDV_20250503T173148_20250503T173215_059033_07527A_2B0C";

pub const AOI_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "properties": {"name": "Rubicon"},
      "geometry": {
        "type": "Polygon",
        "coordinates": [[
          [-120.5, 38.75], [-120.125, 38.75], [-120.125, 39.0], [-120.5, 39.0], [-120.5, 38.75]
        ]]
      }
    }
  ]
}"#;

/// Write a SAFE-shaped zip with empty members for the given swaths and polarizations
pub fn write_fake_safe(dir: &Path, archive_name: &str, product: &str, swaths: &[&str], pols: &[&str]) -> PathBuf {
    let path = dir.join(archive_name);
    let file = File::create(&path).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    let safe = format!("{}.SAFE", product);
    let kind = if product.contains("_SLC_") { "slc" } else { "grd" };

    zip.start_file(format!("{}/manifest.safe", safe), options).unwrap();
    zip.write_all(b"<xfdu/>").unwrap();

    for swath in swaths {
        for pol in pols {
            let stem = format!(
                "s1a-{}-{}-{}-20250503t173150-20250503t173215-059033-07527a-001",
                swath, kind, pol
            );
            zip.start_file(format!("{}/measurement/{}.tiff", safe, stem), options).unwrap();
            zip.write_all(b"II*\0").unwrap();
            zip.start_file(format!("{}/annotation/{}.xml", safe, stem), options).unwrap();
            zip.write_all(b"<product/>").unwrap();
            zip.start_file(
                format!("{}/annotation/calibration/calibration-{}.xml", safe, stem),
                options,
            )
            .unwrap();
            zip.write_all(b"<calibration/>").unwrap();
        }
    }

    zip.finish().unwrap();
    path
}

pub fn write_aoi(dir: &Path) -> PathBuf {
    let path = dir.join("aoi.geojson");
    std::fs::write(&path, AOI_GEOJSON).unwrap();
    path
}
