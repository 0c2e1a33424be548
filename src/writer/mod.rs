mod gpkg;

pub use gpkg::GpkgWriter;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};
use crate::export::GeoTable;
use crate::map::extras::legacy_crs_member;

/// Flat table with the geometry dropped; `x`, `y` and `z` stay as columns.
#[derive(Default)]
pub struct CsvWriter {}

impl CsvWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, geo_table: &GeoTable, output_path: &Path) -> Result<()> {
        let file = File::create(output_path).map_err(|e| Error::io(output_path, e))?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));

        writer.write_record(geo_table.table.columns())?;
        for row in geo_table.table.rows() {
            writer.write_record(row.iter().map(|value| value.to_string()))?;
        }
        writer.flush().map_err(|e| Error::io(output_path, e))?;

        tracing::info!(
            "Written {} rows of {} to {:?}",
            geo_table.len(),
            geo_table.sub_type,
            output_path
        );
        Ok(())
    }
}

/// Point features with every column as a property.
///
/// Coordinates stay in the table's projected system, named by a legacy
/// `crs` member.
#[derive(Default)]
pub struct GeoJsonWriter {}

impl GeoJsonWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn to_feature_collection(&self, geo_table: &GeoTable) -> Result<FeatureCollection> {
        let points = geo_table.points()?;
        let features = geo_table
            .table
            .rows()
            .iter()
            .zip(points)
            .map(|(row, point)| {
                let properties: JsonObject = geo_table
                    .table
                    .columns()
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), value.to_json()))
                    .collect();
                Feature {
                    bbox: None,
                    geometry: point.map(|position| Geometry::new(geojson::Value::Point(position))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let mut foreign_members = JsonObject::new();
        foreign_members.insert("name".to_string(), geo_table.sub_type.as_str().into());
        foreign_members.insert("crs".to_string(), legacy_crs_member(geo_table.epsg));
        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    pub fn write(&self, geo_table: &GeoTable, output_path: &Path) -> Result<()> {
        let collection = self.to_feature_collection(geo_table)?;
        fs::write(output_path, collection.to_string()).map_err(|e| Error::io(output_path, e))?;

        tracing::info!(
            "Written {} features of {} to {:?}",
            collection.features.len(),
            geo_table.sub_type,
            output_path
        );
        Ok(())
    }
}
