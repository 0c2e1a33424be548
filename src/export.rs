//! Flattens observations into one point table per sub-type and writes them.

use geo::Point;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::filter::{apply_declination_to_table, export_rules, filter_invalid_rows};
use crate::model::{Observation, Table, Value};
use crate::schema::{columns, SubType};
use crate::writer::{CsvWriter, GeoJsonWriter};

/// Point table of one sub-type in a projected reference system.
///
/// The geometry is carried by the `x` and `y` columns (and `z` if present).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTable {
    pub sub_type: SubType,
    pub epsg: u32,
    pub table: Table,
}

impl GeoTable {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn has_z(&self) -> bool {
        self.table.has_column(columns::Z)
    }

    /// Point coordinates of each row, `None` where they are not finite.
    pub fn points(&self) -> Result<Vec<Option<Vec<f64>>>> {
        let x_idx = self.table.require_column(columns::X)?;
        let y_idx = self.table.require_column(columns::Y)?;
        let z_idx = self.table.column_index(columns::Z);
        Ok(self
            .table
            .rows()
            .iter()
            .map(|row| {
                let mut position = vec![row[x_idx].as_f64()?, row[y_idx].as_f64()?];
                if let Some(z_idx) = z_idx {
                    position.push(row[z_idx].as_f64()?);
                }
                position.iter().all(|c| c.is_finite()).then_some(position)
            })
            .collect())
    }

    /// `<dir>/<sub_type>.<extension>`
    pub fn output_path(&self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(format!("{}.{}", self.sub_type.as_str(), extension))
    }
}

fn stamp_columns(with_z: bool) -> Vec<&'static str> {
    let mut stamped = vec![
        columns::OBS_ID,
        columns::OBSERVATION_REMARKS,
        columns::PROJECT,
        columns::X,
        columns::Y,
    ];
    if with_z {
        stamped.push(columns::Z);
    }
    stamped
}

/// Concatenates the `sub_type` rows of all observations into a point table.
///
/// Every row is stamped with its observation's id, remarks, project and
/// location projected into `epsg`. Azimuth columns take the declination fix.
pub fn compile_type_table(
    observations: &[Observation],
    sub_type: SubType,
    epsg: u32,
    with_z: bool,
    declination: f64,
) -> Result<GeoTable> {
    let crs = Crs::from_epsg(epsg)?;

    let mut compiled = Table::with_columns(sub_type.as_str(), sub_type.columns());
    for column in stamp_columns(with_z) {
        compiled.fill_column(column, Value::Null);
    }

    for observation in observations {
        let sub_table = observation.sub_table(sub_type);
        if sub_table.is_empty() {
            continue;
        }
        let location = crs.project(Point::new(observation.longitude, observation.latitude));

        let mut stamped = sub_table.clone();
        stamped.fill_column(columns::OBS_ID, observation.obs_id.as_str().into());
        stamped.fill_column(
            columns::OBSERVATION_REMARKS,
            observation.remarks.as_str().into(),
        );
        stamped.fill_column(columns::PROJECT, observation.project.as_str().into());
        stamped.fill_column(columns::X, Value::Real(location.x()));
        stamped.fill_column(columns::Y, Value::Real(location.y()));
        if with_z {
            stamped.fill_column(columns::Z, Value::Real(0.0));
        }
        compiled.append(&stamped);
    }

    apply_declination_to_table(&mut compiled, declination);

    info!(
        sub_type = %sub_type,
        rows = compiled.len(),
        epsg,
        "Compiled export table"
    );
    Ok(GeoTable {
        sub_type,
        epsg,
        table: compiled,
    })
}

/// Compiles every sub-type, in [`SubType::ALL`] order.
pub fn compile_type_tables(
    observations: &[Observation],
    epsg: u32,
    with_z: bool,
    declination: f64,
) -> Result<Vec<GeoTable>> {
    SubType::ALL
        .into_iter()
        .map(|sub_type| compile_type_table(observations, sub_type, epsg, with_z, declination))
        .collect()
}

/// Filters and writes each table to `export_dir`, returning the written paths.
///
/// Tables left empty by the validity filters are skipped. Every written
/// file must exist afterwards.
pub fn write_geo_tables(geo_tables: &[GeoTable], export_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(export_dir).map_err(|e| Error::io(export_dir, e))?;

    let csv_writer = CsvWriter::new();
    let geojson_writer = GeoJsonWriter::new();
    let gpkg_writer = crate::writer::GpkgWriter::new();

    let mut written = Vec::new();
    for geo_table in geo_tables {
        let filtered = GeoTable {
            table: filter_invalid_rows(&geo_table.table, export_rules(geo_table.sub_type)),
            ..geo_table.clone()
        };
        if filtered.is_empty() {
            info!(sub_type = %filtered.sub_type, "Nothing to export after filtering, skipping");
            continue;
        }

        let paths = [
            filtered.output_path(export_dir, "csv"),
            filtered.output_path(export_dir, "geojson"),
            filtered.output_path(export_dir, "gpkg"),
        ];
        csv_writer.write(&filtered, &paths[0])?;
        geojson_writer.write(&filtered, &paths[1])?;
        gpkg_writer.write(&filtered, &paths[2])?;

        for path in &paths {
            if !path.exists() {
                error!(path = %path.display(), "Export file missing after writing");
                return Err(Error::ExportMissing(path.clone()));
            }
        }
        written.extend(paths);
    }
    Ok(written)
}
