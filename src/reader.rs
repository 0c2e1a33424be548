use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::model::{Table, Value};
use crate::schema::TableKind;
use crate::tables::TableSet;

/// Reads every `*.sqlite` snapshot in `dir`, in file name order.
///
/// A missing directory is logged and yields no table sets.
pub fn read_table_sets(dir: &Path) -> Result<Vec<TableSet>> {
    if !dir.is_dir() {
        error!(
            path = %dir.display(),
            path_exists = dir.exists(),
            "Cannot read snapshots as the path is not a directory"
        );
        return Ok(Vec::new());
    }

    let mut snapshot_paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("sqlite"))
        .collect();
    snapshot_paths.sort();

    info!("Found {} snapshot files in {:?}", snapshot_paths.len(), dir);

    snapshot_paths
        .iter()
        .map(|path| read_table_set(path))
        .collect()
}

/// Reads the eight snapshot tables from one SQLite file.
pub fn read_table_set(path: &Path) -> Result<TableSet> {
    let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let read = |kind: TableKind| read_table(&connection, path, kind);
    let table_set = TableSet {
        observations: read(TableKind::Observation)?,
        tectonic_measurements: read(TableKind::TectonicMeasurement)?,
        planar_structures: read(TableKind::PlanarStructure)?,
        linear_structures: read(TableKind::LinearStructure)?,
        rock_observation_points: read(TableKind::RockObservationPoint)?,
        images: read(TableKind::Image)?,
        samples: read(TableKind::Sample)?,
        textures: read(TableKind::Texture)?,
    };

    info!(
        path = %path.display(),
        observations = table_set.observations.len(),
        "Read snapshot"
    );
    Ok(table_set)
}

fn read_table(connection: &Connection, path: &Path, kind: TableKind) -> Result<Table> {
    let name = kind.sql_name();

    let exists = connection
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    if exists.is_none() {
        error!(path = %path.display(), table = name, "Snapshot table missing");
        return Err(Error::MissingTable {
            path: path.to_path_buf(),
            table: name.to_string(),
        });
    }

    let mut statement = connection.prepare(&format!("SELECT * FROM \"{name}\""))?;
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut query = statement.query([])?;
    while let Some(row) = query.next()? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(to_value(row.get_ref(idx)?, name, &columns[idx]));
        }
        rows.push(values);
    }

    debug!("Read {} rows from table {}", rows.len(), name);
    Ok(Table::from_rows(name, columns, rows))
}

fn to_value(value: ValueRef<'_>, table: &str, column: &str) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(_) => {
            debug!(table, column, "Blob value read as null");
            Value::Null
        }
    }
}
