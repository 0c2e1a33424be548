//! Builds [`Observation`] entities from the raw snapshot tables.

use tracing::{debug, error, info};

use crate::error::Result;
use crate::index::GroupedIndex;
use crate::model::{IdExceptions, MeasurementId, Observation, ObservationId, RockObsId, Table, Value};
use crate::schema::{columns, SubType};
use crate::tables::TableSet;

/// Assembles one observation per row of the observation table, in row order.
///
/// Input tables are not modified. A missing column in any grouped table is
/// fatal; data anomalies are logged and resolved per observation.
pub fn assemble(tables: &TableSet, exceptions: &IdExceptions) -> Result<Vec<Observation>> {
    let index = GroupedIndex::build(tables)?;
    let observations_table = &tables.observations;
    let id_idx = observations_table.require_column(columns::OBS_ID)?;
    let lat_idx = observations_table.require_column(columns::LATITUDE)?;
    let lon_idx = observations_table.require_column(columns::LONGITUDE)?;
    let remarks_idx = observations_table.require_column(columns::REMARKS)?;
    let project_idx = observations_table.require_column(columns::PROJECT)?;

    let mut observations = Vec::with_capacity(observations_table.len());
    for (row_idx, row) in observations_table.rows().iter().enumerate() {
        let Some(obs_id) = row[id_idx].as_key() else {
            error!(row = row_idx, "Observation row without an id skipped");
            continue;
        };
        let mut observation = Observation::new(
            ObservationId::from(obs_id),
            row[lat_idx].as_f64().unwrap_or(f64::NAN),
            row[lon_idx].as_f64().unwrap_or(f64::NAN),
            row[remarks_idx].as_text().unwrap_or_default(),
            row[project_idx].as_text().unwrap_or_default(),
        );
        resolve_children(&mut observation, &index, exceptions)?;
        observations.push(observation);
    }

    info!(
        observations = observations.len(),
        exceptions = exceptions.len(),
        "Assembled observations"
    );
    Ok(observations)
}

fn resolve_children(
    observation: &mut Observation,
    index: &GroupedIndex,
    exceptions: &IdExceptions,
) -> Result<()> {
    let obs_id = observation.obs_id.clone();

    observation.gdb_id = resolve_measurement_id(index, &obs_id, exceptions)?;
    if let Some(gdb_id) = &observation.gdb_id {
        let key = exceptions.remap(gdb_id);
        observation.planars = index.planars.get(&key);
        observation.linears = index.linears.get(&key);
    }

    observation.images = index.images.get(&obs_id);
    observation.samples = index.samples.get(&exceptions.remap(&obs_id));

    let (rock_observations, textures) = resolve_rock_observations(index, &obs_id, exceptions)?;
    observation.rock_observations = rock_observations;
    observation.textures = textures;

    debug!(
        obs_id = %obs_id,
        gdb_id = observation.gdb_id_str(),
        planars = observation.planars.len(),
        linears = observation.linears.len(),
        images = observation.images.len(),
        rock_observations = observation.rock_observations.len(),
        samples = observation.samples.len(),
        textures = observation.textures.len(),
        "Resolved observation"
    );
    Ok(())
}

/// The measurement id linked to `obs_id`.
///
/// Several distinct ids are a data error; the id of the latest row wins.
fn resolve_measurement_id(
    index: &GroupedIndex,
    obs_id: &ObservationId,
    exceptions: &IdExceptions,
) -> Result<Option<MeasurementId>> {
    let tectonic = index.tectonic.get(&exceptions.remap(obs_id));
    let mut gdb_ids: Vec<String> = Vec::new();
    for gdb_id in tectonic.column_values(columns::GDB_ID)?.filter_map(Value::as_key) {
        gdb_ids.retain(|seen| *seen != gdb_id);
        gdb_ids.push(gdb_id);
    }

    if gdb_ids.len() > 1 {
        error!(
            obs_id = %obs_id,
            gdb_ids = ?gdb_ids,
            "Multiple tectonic measurement ids for observation, using the last one"
        );
    }
    Ok(gdb_ids.pop().map(MeasurementId::from))
}

/// Rock observation rows of `obs_id` with their textures resolved.
///
/// Returns the rock observation table, with its row id replaced by a
/// `TEXTURES` summary, and all matched texture rows concatenated.
fn resolve_rock_observations(
    index: &GroupedIndex,
    obs_id: &ObservationId,
    exceptions: &IdExceptions,
) -> Result<(Table, Table)> {
    let rock_observations = index.rock_observations.get(obs_id);
    let mut textures = index.textures.empty();

    let row_ids: Vec<Value> = rock_observations
        .column_values(columns::GDB_ID)?
        .cloned()
        .collect();
    let mut summaries = Vec::with_capacity(row_ids.len());
    for row_id in row_ids {
        let matched = match row_id.as_key() {
            Some(row_id) => index.textures.get(&exceptions.remap(&RockObsId::from(row_id))),
            None => index.textures.empty(),
        };
        summaries.push(texture_summary(&matched));
        textures.append(&matched);
    }

    let mut rock_observations = rock_observations.without_column(columns::GDB_ID);
    rock_observations.push_column(columns::TEXTURES, summaries);
    rock_observations.rename(SubType::RockObservation.as_str());
    Ok((rock_observations, textures))
}

/// `(ST_2, ST_1)` tuples of the matched rows, or null when none matched.
fn texture_summary(textures: &Table) -> Value {
    if textures.is_empty() {
        return Value::Null;
    }
    textures
        .rows()
        .iter()
        .map(|row| {
            let elements: Vec<String> = row.iter().map(Value::to_tuple_element).collect();
            format!("({})", elements.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
        .into()
}
