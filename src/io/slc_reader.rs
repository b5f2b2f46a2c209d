use crate::types::{
    AcquisitionMode, Polarization, ProductInfo, ProductType, SarError, SarResult,
};
use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use zip::ZipArchive;

fn product_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(S1[A-D])_([A-Z0-9]{2})_([A-Z]{3})([FHM_])_(\d)([SA])([SDHV]{2})_(\d{8}T\d{6})_(\d{8}T\d{6})_(\d{6})_([0-9A-F]{6})_([0-9A-F]{4})",
        )
        .expect("product name pattern is valid")
    })
}

fn measurement_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"measurement/s1[a-d]-([a-z]{2}\d?|s[1-6])-(slc|grd)-(hh|hv|vh|vv)-[^/]*\.tiff?$")
            .expect("measurement pattern is valid")
    })
}

/// A measurement raster inside a SAFE archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementFile {
    /// Path of the file inside the archive
    pub path: String,
    /// Swath id in upper case, e.g. `IW1` for SLC, `IW` for GRD or `S3` for stripmap
    pub swath: String,
    pub polarization: Polarization,
}

/// Sentinel-1 SAFE archive reader
///
/// Only looks at the archive table of contents and product name; the pixel
/// data is consumed by the external processing engine.
pub struct SlcReader {
    zip_path: PathBuf,
    archive: Option<ZipArchive<File>>,
}

impl SlcReader {
    /// Create a new reader for a zipped Sentinel-1 product
    pub fn new<P: AsRef<Path>>(zip_path: P) -> SarResult<Self> {
        let zip_path = zip_path.as_ref().to_path_buf();

        if !zip_path.exists() {
            return Err(SarError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", zip_path.display()),
            )));
        }

        Ok(Self {
            zip_path,
            archive: None,
        })
    }

    /// Path of the underlying archive
    pub fn path(&self) -> &Path {
        &self.zip_path
    }

    /// Open the ZIP archive
    fn open_archive(&mut self) -> SarResult<&mut ZipArchive<File>> {
        let archive = match self.archive.take() {
            Some(archive) => archive,
            None => {
                let file = File::open(&self.zip_path)?;
                ZipArchive::new(file)
                    .map_err(|e| SarError::InvalidFormat(format!("Failed to open ZIP: {}", e)))?
            }
        };
        Ok(self.archive.insert(archive))
    }

    /// List all files in the archive
    pub fn list_files(&mut self) -> SarResult<Vec<String>> {
        let archive = self.open_archive()?;
        Ok(archive.file_names().map(str::to_string).collect())
    }

    /// Identification of the product, from the archive name or its SAFE directory
    pub fn product_info(&mut self) -> SarResult<ProductInfo> {
        let file_name = self
            .zip_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Ok(info) = parse_product_name(&file_name) {
            return Ok(info);
        }

        log::debug!(
            "Archive name '{}' is not a product name, looking for the SAFE directory",
            file_name
        );
        let files = self.list_files()?;
        files
            .iter()
            .filter_map(|f| f.split('/').next())
            .find(|top| top.ends_with(".SAFE"))
            .ok_or_else(|| {
                SarError::Metadata(format!(
                    "No SAFE directory found in {}",
                    self.zip_path.display()
                ))
            })
            .and_then(parse_product_name)
    }

    /// Find annotation files for each polarization (one per swath for SLC)
    pub fn find_annotation_files(&mut self) -> SarResult<HashMap<Polarization, Vec<String>>> {
        let files = self.list_files()?;
        let mut annotations: HashMap<Polarization, Vec<String>> = HashMap::new();

        for file in files {
            // calibration/ and rfi/ hold auxiliary XML with the same naming
            if !file.contains("/annotation/s1") || !file.ends_with(".xml") {
                continue;
            }
            if let Some(pol) = polarization_from_file_name(&file) {
                annotations.entry(pol).or_default().push(file);
            }
        }

        if annotations.is_empty() {
            return Err(SarError::InvalidFormat(
                "No annotation files found".to_string(),
            ));
        }

        for list in annotations.values_mut() {
            list.sort();
        }
        Ok(annotations)
    }

    /// Find measurement rasters, sorted by swath then polarization
    pub fn find_measurement_files(&mut self) -> SarResult<Vec<MeasurementFile>> {
        let files = self.list_files()?;
        let mut measurements: Vec<MeasurementFile> = files
            .iter()
            .filter_map(|f| parse_measurement_path(f))
            .collect();

        if measurements.is_empty() {
            return Err(SarError::InvalidFormat(format!(
                "No measurement files found in {}",
                self.zip_path.display()
            )));
        }

        measurements.sort_by(|a, b| {
            (a.swath.as_str(), a.polarization.to_string())
                .cmp(&(b.swath.as_str(), b.polarization.to_string()))
        });
        Ok(measurements)
    }

    /// Band names the engine exposes for this product after thermal noise removal
    pub fn band_names(&mut self) -> SarResult<Vec<String>> {
        let info = self.product_info()?;
        let measurements = self.find_measurement_files()?;
        let bands = engine_band_names(&info, &measurements);
        log::debug!("Product {} exposes bands {:?}", info.product_id, bands);
        Ok(bands)
    }
}

/// Parse a Sentinel-1 product name such as
/// `S1A_IW_SLC__1SDV_20250503T173148_20250503T173215_059033_07527A_2B0C.SAFE.zip`
pub fn parse_product_name(name: &str) -> SarResult<ProductInfo> {
    let caps = product_name_regex().captures(name).ok_or_else(|| {
        SarError::Metadata(format!("Not a Sentinel-1 product name: {}", name))
    })?;

    let acquisition_mode: AcquisitionMode = caps[2].parse()?;
    let product_type: ProductType = caps[3].parse()?;
    let resolution = caps[4].chars().next().filter(|c| *c != '_');
    let processing_level = caps[5]
        .parse::<u8>()
        .map_err(|e| SarError::Metadata(format!("Invalid processing level: {}", e)))?;
    let polarizations = polarizations_from_code(&caps[7])?;
    let start_time = parse_compact_time(&caps[8])?;
    let stop_time = parse_compact_time(&caps[9])?;
    let absolute_orbit = caps[10]
        .parse::<u32>()
        .map_err(|e| SarError::Metadata(format!("Invalid absolute orbit: {}", e)))?;

    Ok(ProductInfo {
        product_id: caps[0].to_string(),
        mission: caps[1].to_string(),
        acquisition_mode,
        product_type,
        resolution,
        processing_level,
        polarizations,
        start_time,
        stop_time,
        absolute_orbit,
        datatake_id: caps[11].to_string(),
        unique_id: caps[12].to_string(),
    })
}

fn polarizations_from_code(code: &str) -> SarResult<Vec<Polarization>> {
    let pols = match code {
        "SH" => vec![Polarization::HH],
        "SV" => vec![Polarization::VV],
        "DH" => vec![Polarization::HH, Polarization::HV],
        "DV" => vec![Polarization::VV, Polarization::VH],
        "HH" => vec![Polarization::HH],
        "HV" => vec![Polarization::HV],
        "VV" => vec![Polarization::VV],
        "VH" => vec![Polarization::VH],
        other => {
            return Err(SarError::Metadata(format!(
                "Unknown polarization code: {}",
                other
            )))
        }
    };
    Ok(pols)
}

fn parse_compact_time(s: &str) -> SarResult<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
        .map_err(|e| SarError::Metadata(format!("Invalid time '{}': {}", s, e)))?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn polarization_from_file_name(path: &str) -> Option<Polarization> {
    let name = path.rsplit('/').next()?;
    if name.contains("-vv-") {
        Some(Polarization::VV)
    } else if name.contains("-vh-") {
        Some(Polarization::VH)
    } else if name.contains("-hv-") {
        Some(Polarization::HV)
    } else if name.contains("-hh-") {
        Some(Polarization::HH)
    } else {
        None
    }
}

/// Recognise a measurement raster path inside a SAFE archive
pub fn parse_measurement_path(path: &str) -> Option<MeasurementFile> {
    let caps = measurement_regex().captures(path)?;
    let polarization = caps[3].parse().ok()?;
    Some(MeasurementFile {
        path: path.to_string(),
        swath: caps[1].to_uppercase(),
        polarization,
    })
}

/// Band naming the engine uses once thermal noise removal has run
///
/// Noise removal turns the complex `i_`/`q_` pairs and GRD amplitudes into
/// intensities, so only `Intensity_*` bands reach Calibration.
/// TOPS SLC bands carry the swath (`Intensity_IW1_VV`); stripmap SLC and GRD
/// bands do not (`Intensity_VV`).
pub fn engine_band_names(product: &ProductInfo, measurements: &[MeasurementFile]) -> Vec<String> {
    let per_swath =
        product.product_type == ProductType::Slc && product.acquisition_mode.is_tops();
    let mut bands: Vec<String> = Vec::with_capacity(measurements.len());
    for m in measurements {
        let band = if per_swath {
            format!("Intensity_{}_{}", m.swath, m.polarization)
        } else {
            format!("Intensity_{}", m.polarization)
        };
        if !bands.contains(&band) {
            bands.push(band);
        }
    }
    bands
}

/// Bands ending with one of the selected polarizations
pub fn select_source_bands(bands: &[String], pols: &[Polarization]) -> Vec<String> {
    bands
        .iter()
        .filter(|b| pols.iter().any(|p| b.ends_with(&p.to_string())))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const SLC_NAME: &str =
        "S1A_IW_SLC__1SDV_20250503T173148_20250503T173215_059033_07527A_2B0C.SAFE.zip";

    #[test]
    fn test_parse_slc_product_name() {
        let info = parse_product_name(SLC_NAME).unwrap();
        assert_eq!(info.mission, "S1A");
        assert_eq!(info.acquisition_mode, AcquisitionMode::IW);
        assert_eq!(info.product_type, ProductType::Slc);
        assert_eq!(info.resolution, None);
        assert_eq!(info.processing_level, 1);
        assert_eq!(info.polarizations, vec![Polarization::VV, Polarization::VH]);
        assert_eq!(info.start_time.year(), 2025);
        assert_eq!(info.start_time.hour(), 17);
        assert_eq!(info.stop_time.second(), 15);
        assert_eq!(info.absolute_orbit, 59033);
        assert_eq!(info.datatake_id, "07527A");
        assert_eq!(info.unique_id, "2B0C");
        assert!(info.product_id.starts_with("S1A_IW_SLC__1SDV"));
        assert!(!info.product_id.ends_with(".zip"));
    }

    #[test]
    fn test_parse_grd_product_name() {
        let info = parse_product_name(
            "S1B_EW_GRDM_1SDH_20200103T170815_20200103T170842_019639_0382D5_DADE",
        )
        .unwrap();
        assert_eq!(info.acquisition_mode, AcquisitionMode::EW);
        assert_eq!(info.product_type, ProductType::Grd);
        assert_eq!(info.resolution, Some('M'));
        assert_eq!(info.polarizations, vec![Polarization::HH, Polarization::HV]);
    }

    #[test]
    fn test_rejects_non_product_name() {
        assert!(parse_product_name("scene.zip").is_err());
    }

    #[test]
    fn test_measurement_path_parsing() {
        let m = parse_measurement_path(
            "S1A.SAFE/measurement/s1a-iw2-slc-vh-20250503t173150-20250503t173215-059033-07527a-005.tiff",
        )
        .unwrap();
        assert_eq!(m.swath, "IW2");
        assert_eq!(m.polarization, Polarization::VH);
        assert!(parse_measurement_path("S1A.SAFE/annotation/s1a-iw2-slc-vh-x.xml").is_none());
    }

    #[test]
    fn test_stripmap_measurement_path() {
        let m = parse_measurement_path(
            "S1A.SAFE/measurement/s1a-s3-slc-vv-20250503t173150-20250503t173215-059033-07527a-001.tiff",
        )
        .unwrap();
        assert_eq!(m.swath, "S3");
        assert_eq!(m.polarization, Polarization::VV);
        assert!(parse_measurement_path("S1A.SAFE/measurement/s1a-s7-slc-vv-x.tiff").is_none());
    }

    fn measurement(swath: &str, polarization: Polarization) -> MeasurementFile {
        MeasurementFile {
            path: format!("{}-{}", swath, polarization),
            swath: swath.to_string(),
            polarization,
        }
    }

    #[test]
    fn test_band_names_and_selection() {
        let slc = parse_product_name(SLC_NAME).unwrap();
        let measurements = vec![
            measurement("IW1", Polarization::VH),
            measurement("IW1", Polarization::VV),
            measurement("IW2", Polarization::VH),
        ];
        let bands = engine_band_names(&slc, &measurements);
        assert_eq!(bands, vec!["Intensity_IW1_VH", "Intensity_IW1_VV", "Intensity_IW2_VH"]);
        assert!(bands.iter().all(|b| !b.starts_with("i_") && !b.starts_with("q_")));

        let selected = select_source_bands(&bands, &[Polarization::VV]);
        assert_eq!(selected, vec!["Intensity_IW1_VV"]);
    }

    #[test]
    fn test_band_names_without_swath() {
        let grd = parse_product_name(
            "S1A_IW_GRDH_1SDV_20250503T173148_20250503T173215_059033_07527A_1A2B",
        )
        .unwrap();
        let measurements = vec![
            measurement("IW", Polarization::VH),
            measurement("IW", Polarization::VV),
        ];
        assert_eq!(
            engine_band_names(&grd, &measurements),
            vec!["Intensity_VH", "Intensity_VV"]
        );

        let stripmap = parse_product_name(
            "S1A_S3_SLC__1SDV_20250503T173148_20250503T173215_059033_07527A_3C4D",
        )
        .unwrap();
        assert_eq!(stripmap.acquisition_mode, AcquisitionMode::SM);
        let measurements = vec![
            measurement("S3", Polarization::VH),
            measurement("S3", Polarization::VV),
        ];
        assert_eq!(
            engine_band_names(&stripmap, &measurements),
            vec!["Intensity_VH", "Intensity_VV"]
        );
    }
}
