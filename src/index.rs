//! Lookup indices from parent ids to child rows.

use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

use crate::error::Result;
use crate::model::{GroupKey, MeasurementId, ObservationId, RockObsId, Table};
use crate::schema::{SubType, TableKind};
use crate::tables::TableSet;

/// Rows of one child table grouped by a typed foreign key.
#[derive(Debug, Clone)]
pub struct Grouped<K> {
    name: String,
    table: Table,
    columns: Vec<usize>,
    groups: HashMap<String, Vec<usize>>,
    key: PhantomData<K>,
}

impl<K: GroupKey> Grouped<K> {
    /// Groups `table` by `kind`'s foreign key, keeping `kind`'s columns.
    ///
    /// Fails when the key column or any kept column is absent.
    pub fn build(table: &Table, kind: TableKind, name: &str) -> Result<Self> {
        let columns = table.require_columns(kind.columns())?;
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        if let Some(group_column) = kind.group_column() {
            let key_idx = table.require_column(group_column)?;
            for (row_idx, row) in table.rows().iter().enumerate() {
                if let Some(key) = row[key_idx].as_key() {
                    groups.entry(key).or_default().push(row_idx);
                }
            }
        }
        debug!(
            table = table.name(),
            rows = table.len(),
            groups = groups.len(),
            "Grouped table"
        );
        Ok(Self {
            name: name.to_string(),
            table: table.clone(),
            columns,
            groups,
            key: PhantomData,
        })
    }

    /// Child rows of `key`; an empty, fully shaped table when there are none.
    pub fn get(&self, key: &K) -> Table {
        let rows = self
            .groups
            .get(key.as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.select(rows)
    }

    /// Empty table with the kept columns.
    pub fn empty(&self) -> Table {
        self.select(&[])
    }

    fn select(&self, rows: &[usize]) -> Table {
        let mut table = self.table.take(rows, &self.columns);
        table.rename(&self.name);
        table
    }

    pub fn contains(&self, key: &K) -> bool {
        self.groups.contains_key(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// The seven grouped child tables of one [`TableSet`]. Read-only once built.
#[derive(Debug, Clone)]
pub struct GroupedIndex {
    pub tectonic: Grouped<ObservationId>,
    pub planars: Grouped<MeasurementId>,
    pub linears: Grouped<MeasurementId>,
    pub images: Grouped<ObservationId>,
    pub rock_observations: Grouped<ObservationId>,
    pub samples: Grouped<ObservationId>,
    pub textures: Grouped<RockObsId>,
}

impl GroupedIndex {
    pub fn build(tables: &TableSet) -> Result<Self> {
        Ok(Self {
            tectonic: Grouped::build(
                &tables.tectonic_measurements,
                TableKind::TectonicMeasurement,
                TableKind::TectonicMeasurement.sql_name(),
            )?,
            planars: Grouped::build(
                &tables.planar_structures,
                TableKind::PlanarStructure,
                SubType::Planar.as_str(),
            )?,
            linears: Grouped::build(
                &tables.linear_structures,
                TableKind::LinearStructure,
                SubType::Linear.as_str(),
            )?,
            images: Grouped::build(&tables.images, TableKind::Image, SubType::Image.as_str())?,
            rock_observations: Grouped::build(
                &tables.rock_observation_points,
                TableKind::RockObservationPoint,
                SubType::RockObservation.as_str(),
            )?,
            samples: Grouped::build(&tables.samples, TableKind::Sample, SubType::Sample.as_str())?,
            textures: Grouped::build(
                &tables.textures,
                TableKind::Texture,
                SubType::Texture.as_str(),
            )?,
        })
    }
}
