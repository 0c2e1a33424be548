//! Auxiliary vector datasets layered on the map.

use geo::Point;
use geojson::{FeatureCollection, GeoJson, Geometry, Position};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::crs::{Crs, WGS84_EPSG};
use crate::error::{Error, Result};
use crate::map::style::StyleKind;

/// One overlay layer, in WGS84.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub name: String,
    pub popup_field: Option<String>,
    pub style: Option<Map<String, Value>>,
    pub data: FeatureCollection,
}

/// Builds overlays from positional lists, one per dataset.
///
/// Shorter option lists leave the remaining datasets with defaults: the name
/// falls back to the file stem, and there is no popup or style.
pub fn resolve_extras_inputs(
    datasets: &[PathBuf],
    names: &[String],
    popup_fields: &[String],
    style_kinds: &[StyleKind],
    colors: &[String],
) -> Result<Vec<Overlay>> {
    let longest = [names.len(), popup_fields.len(), style_kinds.len(), colors.len()]
        .into_iter()
        .max()
        .unwrap_or_default();
    if longest > datasets.len() {
        warn!(
            datasets = datasets.len(),
            options = longest,
            "More overlay options than datasets, extra options ignored"
        );
    }

    datasets
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            let name = names.get(idx).cloned().unwrap_or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let popup_field = popup_fields.get(idx).filter(|field| !field.is_empty()).cloned();
            let color = colors.get(idx).map(String::as_str);
            let style = style_kinds.get(idx).map(|kind| kind.style(color));

            let overlay = Overlay {
                name,
                popup_field,
                style,
                data: read_overlay_data(path)?,
            };
            info!(
                name = %overlay.name,
                features = overlay.data.features.len(),
                "Resolved overlay dataset {:?}",
                path
            );
            Ok(overlay)
        })
        .collect()
}

/// Reads a GeoJSON file as a feature collection in WGS84.
pub fn read_overlay_data(path: &Path) -> Result<FeatureCollection> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut collection = match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(feature) => FeatureCollection::from_iter([feature]),
        GeoJson::Geometry(geometry) => FeatureCollection::from_iter([geojson::Feature::from(geometry)]),
    };

    let epsg = collection
        .foreign_members
        .as_mut()
        .and_then(|members| members.remove("crs"))
        .and_then(|crs| legacy_crs_epsg(&crs));
    if let Some(epsg) = epsg.filter(|epsg| *epsg != WGS84_EPSG) {
        let crs = Crs::from_epsg(epsg)?;
        for geometry in collection
            .features
            .iter_mut()
            .filter_map(|feature| feature.geometry.as_mut())
        {
            unproject_geometry(geometry, &crs);
        }
        info!(epsg, "Reprojected overlay {:?} to WGS84", path);
    }
    Ok(collection)
}

/// EPSG code of a legacy `crs` member such as `urn:ogc:def:crs:EPSG::3067`.
pub fn legacy_crs_epsg(crs: &Value) -> Option<u32> {
    let name = crs.pointer("/properties/name")?.as_str()?;
    if name.ends_with("CRS84") {
        return Some(WGS84_EPSG);
    }
    name.rsplit(':').next()?.parse().ok()
}

/// Legacy `crs` member naming `epsg`.
pub fn legacy_crs_member(epsg: u32) -> Value {
    serde_json::json!({
        "type": "name",
        "properties": {"name": format!("urn:ogc:def:crs:EPSG::{epsg}")}
    })
}

fn unproject_position(position: &mut Position, crs: &Crs) {
    if position.len() < 2 {
        return;
    }
    let point = crs.unproject(Point::new(position[0], position[1]));
    position[0] = point.x();
    position[1] = point.y();
}

fn unproject_geometry(geometry: &mut Geometry, crs: &Crs) {
    use geojson::Value as G;

    let positions = |positions: &mut Vec<Position>| {
        positions
            .iter_mut()
            .for_each(|position| unproject_position(position, crs))
    };
    match &mut geometry.value {
        G::Point(position) => unproject_position(position, crs),
        G::MultiPoint(points) | G::LineString(points) => positions(points),
        G::MultiLineString(lines) | G::Polygon(lines) => lines.iter_mut().for_each(positions),
        G::MultiPolygon(polygons) => polygons
            .iter_mut()
            .flat_map(|rings| rings.iter_mut())
            .for_each(positions),
        G::GeometryCollection(geometries) => geometries
            .iter_mut()
            .for_each(|geometry| unproject_geometry(geometry, crs)),
    }
    geometry.bbox = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECTED: &str = r#"{
  "type": "FeatureCollection",
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3067"}},
  "features": [
    {"type": "Feature", "properties": {"unit": "granite"},
     "geometry": {"type": "LineString", "coordinates": [[500000.0, 6650000.0], [385700.42, 6672126.74]]}}
  ]
}"#;

    #[test]
    fn test_read_overlay_reprojects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lineaments.geojson");
        fs::write(&path, PROJECTED).unwrap();

        let collection = read_overlay_data(&path).unwrap();
        let Some(Geometry {
            value: geojson::Value::LineString(line),
            ..
        }) = &collection.features[0].geometry
        else {
            panic!("expected a line string");
        };
        assert!((line[0][0] - 27.0).abs() < 1e-8);
        assert!((line[1][0] - 24.94).abs() < 1e-6);
        assert!((line[1][1] - 60.17).abs() < 1e-6);
        assert!(collection
            .foreign_members
            .as_ref()
            .map_or(true, |members| !members.contains_key("crs")));
    }

    #[test]
    fn test_resolve_extras_inputs_zip_longest() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("bedrock.geojson");
        let second = dir.path().join("lineaments.geojson");
        fs::write(&first, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        fs::write(&second, PROJECTED).unwrap();

        let overlays = resolve_extras_inputs(
            &[first, second],
            &["Bedrock".to_string()],
            &[String::new(), "unit".to_string()],
            &[StyleKind::Bedrock],
            &["green".to_string()],
        )
        .unwrap();

        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].name, "Bedrock");
        assert_eq!(overlays[0].popup_field, None);
        assert_eq!(
            overlays[0].style.as_ref().unwrap()["strokeColor"],
            "green"
        );
        assert_eq!(overlays[1].name, "lineaments");
        assert_eq!(overlays[1].popup_field.as_deref(), Some("unit"));
        assert_eq!(overlays[1].style, None);
    }

    #[test]
    fn test_legacy_crs_epsg() {
        assert_eq!(legacy_crs_epsg(&legacy_crs_member(3067)), Some(3067));
        let crs84 = serde_json::json!({"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}});
        assert_eq!(legacy_crs_epsg(&crs84), Some(WGS84_EPSG));
        assert_eq!(legacy_crs_epsg(&serde_json::json!({})), None);
    }
}
