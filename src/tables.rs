use geo::{coord, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{error, info};

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::model::{Table, Value};
use crate::schema::{columns, TableKind};

/// Bounding box in the reference system given by `epsg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub epsg: u32,
}

impl Bounds {
    fn rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.xmin, y: self.ymin },
            coord! { x: self.xmax, y: self.ymax },
        )
    }
}

/// The eight raw tables of one snapshot.
///
/// Filtering only ever narrows the observation table; child rows are
/// reached through the observation ids at lookup time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSet {
    pub observations: Table,
    pub tectonic_measurements: Table,
    pub planar_structures: Table,
    pub linear_structures: Table,
    pub rock_observation_points: Table,
    pub images: Table,
    pub samples: Table,
    pub textures: Table,
}

impl TableSet {
    pub fn table(&self, kind: TableKind) -> &Table {
        match kind {
            TableKind::Observation => &self.observations,
            TableKind::TectonicMeasurement => &self.tectonic_measurements,
            TableKind::PlanarStructure => &self.planar_structures,
            TableKind::LinearStructure => &self.linear_structures,
            TableKind::RockObservationPoint => &self.rock_observation_points,
            TableKind::Image => &self.images,
            TableKind::Sample => &self.samples,
            TableKind::Texture => &self.textures,
        }
    }

    fn table_mut(&mut self, kind: TableKind) -> &mut Table {
        match kind {
            TableKind::Observation => &mut self.observations,
            TableKind::TectonicMeasurement => &mut self.tectonic_measurements,
            TableKind::PlanarStructure => &mut self.planar_structures,
            TableKind::LinearStructure => &mut self.linear_structures,
            TableKind::RockObservationPoint => &mut self.rock_observation_points,
            TableKind::Image => &mut self.images,
            TableKind::Sample => &mut self.samples,
            TableKind::Texture => &mut self.textures,
        }
    }

    /// Observation ids in row order; null ids are left out.
    pub fn observation_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .observations
            .column_values(columns::OBS_ID)?
            .filter_map(Value::as_key)
            .collect())
    }

    /// Copy whose observation table holds only rows of the given projects.
    pub fn filter_to_projects<S: AsRef<str>>(&self, projects: &[S]) -> Result<TableSet> {
        let project_idx = self.observations.require_column(columns::PROJECT)?;
        let projects: HashSet<&str> = projects.iter().map(AsRef::as_ref).collect();

        let mut filtered = self.clone();
        filtered.observations = self.observations.filter_rows(|row| {
            row[project_idx]
                .as_text()
                .is_some_and(|project| projects.contains(project))
        });

        info!(
            rows_before = self.observations.len(),
            rows_after = filtered.observations.len(),
            "Filtered observations to projects {:?}",
            projects
        );
        Ok(filtered)
    }

    /// Copy whose observation table holds only rows located inside `bounds`.
    pub fn filter_to_bounds(&self, bounds: &Bounds) -> Result<TableSet> {
        let crs = Crs::from_epsg(bounds.epsg)?;
        let lon_idx = self.observations.require_column(columns::LONGITUDE)?;
        let lat_idx = self.observations.require_column(columns::LATITUDE)?;
        let rect = bounds.rect();

        let mut filtered = self.clone();
        filtered.observations = self.observations.filter_rows(|row| {
            let lon = row[lon_idx].as_f64().unwrap_or(f64::NAN);
            let lat = row[lat_idx].as_f64().unwrap_or(f64::NAN);
            let projected = crs.project(Point::new(lon, lat));
            !projected.x().is_nan() && !projected.y().is_nan() && rect.intersects(&projected)
        });

        info!(
            rows_before = self.observations.len(),
            rows_after = filtered.observations.len(),
            epsg = bounds.epsg,
            "Filtered observations to bounds"
        );
        Ok(filtered)
    }

    /// Concatenates every table of `self` and `other`, `self` rows first.
    ///
    /// Fails when an observation id occurs more than once across both sets.
    pub fn merge(&self, other: &TableSet) -> Result<TableSet> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for obs_id in self.observation_ids()?.into_iter().chain(other.observation_ids()?) {
            *counts.entry(obs_id).or_default() += 1;
        }
        let non_unique: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count != 1)
            .map(|(obs_id, _)| obs_id)
            .collect();
        if !non_unique.is_empty() {
            error!(non_unique = ?non_unique, "Cannot merge snapshots with shared observation ids");
            return Err(Error::DuplicateObservationIds(non_unique));
        }

        let mut merged = self.clone();
        for kind in TableKind::ALL {
            merged.table_mut(kind).append(other.table(kind));
        }
        Ok(merged)
    }
}
