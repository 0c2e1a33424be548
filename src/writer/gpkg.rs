use gdal::spatial_ref::SpatialRef;
use gdal::vector::{FieldValue, Geometry, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType};
use gdal::DriverManager;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::export::GeoTable;
use crate::model::Value;

/// GeoPackage point layer written through GDAL/OGR.
#[derive(Default)]
pub struct GpkgWriter {}

impl GpkgWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, geo_table: &GeoTable, output_path: &Path) -> Result<()> {
        if output_path.exists() {
            fs::remove_file(output_path).map_err(|e| Error::io(output_path, e))?;
        }

        let driver = DriverManager::get_driver_by_name("GPKG")?;
        let mut dataset = driver.create_vector_only(output_path)?;
        let srs = SpatialRef::from_epsg(geo_table.epsg)?;
        let geometry_type = if geo_table.has_z() {
            OGRwkbGeometryType::wkbPoint25D
        } else {
            OGRwkbGeometryType::wkbPoint
        };
        let mut layer = dataset.create_layer(LayerOptions {
            name: geo_table.sub_type.as_str(),
            srs: Some(&srs),
            ty: geometry_type,
            options: None,
        })?;

        let table = &geo_table.table;
        let field_types: Vec<OGRFieldType::Type> = (0..table.columns().len())
            .map(|idx| field_type(table.rows().iter().map(|row| &row[idx])))
            .collect();
        let field_defs: Vec<(&str, OGRFieldType::Type)> = table
            .columns()
            .iter()
            .map(String::as_str)
            .zip(field_types.iter().copied())
            .collect();
        layer.create_defn_fields(&field_defs)?;

        for (row, point) in table.rows().iter().zip(geo_table.points()?) {
            let wkt = match point.as_deref() {
                Some([x, y, z]) => format!("POINT Z ({x} {y} {z})"),
                Some([x, y]) => format!("POINT ({x} {y})"),
                _ => "POINT EMPTY".to_string(),
            };
            let mut names = Vec::with_capacity(row.len());
            let mut values = Vec::with_capacity(row.len());
            for ((name, field_type), value) in field_defs.iter().zip(row) {
                if let Some(value) = field_value(value, *field_type) {
                    names.push(*name);
                    values.push(value);
                }
            }
            layer.create_feature_fields(Geometry::from_wkt(&wkt)?, &names, &values)?;
        }

        tracing::info!(
            "Written {} features of {} to {:?}",
            geo_table.len(),
            geo_table.sub_type,
            output_path
        );
        Ok(())
    }
}

/// Narrowest OGR field type holding every value of a column.
fn field_type<'a>(values: impl Iterator<Item = &'a Value>) -> OGRFieldType::Type {
    let mut field_type = OGRFieldType::OFTInteger64;
    for value in values {
        match value {
            Value::Null | Value::Integer(_) => {}
            Value::Real(_) => field_type = OGRFieldType::OFTReal,
            Value::Text(_) => return OGRFieldType::OFTString,
        }
    }
    field_type
}

fn field_value(value: &Value, field_type: OGRFieldType::Type) -> Option<FieldValue> {
    match (value, field_type) {
        (Value::Null, _) => None,
        (Value::Integer(v), OGRFieldType::OFTInteger64) => Some(FieldValue::Integer64Value(*v)),
        (Value::Integer(_) | Value::Real(_), OGRFieldType::OFTReal) => {
            value.as_f64().map(FieldValue::RealValue)
        }
        _ => Some(FieldValue::StringValue(value.to_string())),
    }
}
