//! Area-of-interest loading from GeoJSON

use crate::types::{BoundingBox, SarError, SarResult};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

/// Area of interest polygon (exterior ring, lon/lat order)
#[derive(Debug, Clone, PartialEq)]
pub struct Aoi {
    ring: Vec<(f64, f64)>,
}

impl Aoi {
    /// Build from an exterior ring of (x, y) positions
    pub fn from_ring(ring: Vec<(f64, f64)>) -> SarResult<Self> {
        if ring.len() < 4 {
            return Err(SarError::Aoi(format!(
                "Polygon ring needs at least 4 positions, got {}",
                ring.len()
            )));
        }
        if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(SarError::Aoi("Polygon has non-finite coordinates".to_string()));
        }
        if ring.first() != ring.last() {
            log::warn!("AOI ring is not closed; passing it through unchanged");
        }
        Ok(Self { ring })
    }

    /// Load the first feature's polygon from a GeoJSON file
    pub fn from_geojson_file<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        let path = path.as_ref();
        log::info!("Loading area of interest from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            SarError::Aoi(format!("Cannot read AOI file {}: {}", path.display(), e))
        })?;
        Self::from_geojson_str(&text)
    }

    /// Parse a FeatureCollection, Feature or bare geometry
    pub fn from_geojson_str(text: &str) -> SarResult<Self> {
        let doc: Value = serde_json::from_str(text)?;
        let geometry = first_geometry(&doc)?;
        let ring = exterior_ring(geometry)?;
        Self::from_ring(ring)
    }

    /// Exterior ring positions
    pub fn ring(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// Well-known text, e.g. `POLYGON((-120.5 39.1, -120.2 39.1, ...))`
    pub fn to_wkt(&self) -> String {
        let mut wkt = String::from("POLYGON((");
        for (i, (x, y)) in self.ring.iter().enumerate() {
            if i > 0 {
                wkt.push_str(", ");
            }
            let _ = write!(wkt, "{} {}", x, y);
        }
        wkt.push_str("))");
        wkt
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for &(x, y) in &self.ring {
            bbox.min_lon = bbox.min_lon.min(x);
            bbox.max_lon = bbox.max_lon.max(x);
            bbox.min_lat = bbox.min_lat.min(y);
            bbox.max_lat = bbox.max_lat.max(y);
        }
        bbox
    }
}

fn first_geometry(doc: &Value) -> SarResult<&Value> {
    match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let feature = doc
                .get("features")
                .and_then(Value::as_array)
                .and_then(|features| features.first())
                .ok_or_else(|| SarError::Aoi("FeatureCollection has no features".to_string()))?;
            first_geometry(feature)
        }
        Some("Feature") => doc
            .get("geometry")
            .filter(|g| !g.is_null())
            .ok_or_else(|| SarError::Aoi("Feature has no geometry".to_string())),
        Some(_) => Ok(doc),
        None => Err(SarError::Aoi("GeoJSON object has no type".to_string())),
    }
}

fn exterior_ring(geometry: &Value) -> SarResult<Vec<(f64, f64)>> {
    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| SarError::Aoi("Geometry has no coordinates".to_string()))?;

    let ring = match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => coordinates.get(0),
        Some("MultiPolygon") => {
            log::warn!("AOI is a MultiPolygon; using its first polygon");
            coordinates.get(0).and_then(|polygon| polygon.get(0))
        }
        Some(other) => {
            return Err(SarError::Aoi(format!(
                "Expected a Polygon geometry, found {}",
                other
            )))
        }
        None => return Err(SarError::Aoi("Geometry has no type".to_string())),
    }
    .and_then(Value::as_array)
    .ok_or_else(|| SarError::Aoi("Polygon has no exterior ring".to_string()))?;

    ring.iter()
        .map(|position| {
            let x = position.get(0).and_then(Value::as_f64);
            let y = position.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err(SarError::Aoi(format!("Invalid position: {}", position))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wkt_from_feature_collection() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-120.5, 39.0], [-120.25, 39.0], [-120.25, 39.125], [-120.5, 39.0]]]
                }
            }]
        }"#;
        let aoi = Aoi::from_geojson_str(doc).unwrap();
        assert_eq!(
            aoi.to_wkt(),
            "POLYGON((-120.5 39, -120.25 39, -120.25 39.125, -120.5 39))"
        );
        let bbox = aoi.bounding_box();
        assert_eq!(bbox.min_lon, -120.5);
        assert_eq!(bbox.max_lat, 39.125);
    }

    #[test]
    fn test_rejects_point_geometry() {
        let doc = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        assert!(matches!(Aoi::from_geojson_str(doc), Err(SarError::Aoi(_))));
    }

    #[test]
    fn test_rejects_empty_collection() {
        let doc = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(Aoi::from_geojson_str(doc).is_err());
    }

    #[test]
    fn test_rejects_short_ring() {
        assert!(Aoi::from_ring(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]).is_err());
    }
}
