use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Table {table} not found in snapshot {}", path.display())]
    MissingTable { path: PathBuf, table: String },

    #[error("Column {column} not found in table {table}")]
    MissingColumn { table: String, column: String },

    #[error("Expected all unique observation ids. Non-unique: {0:?}")]
    DuplicateObservationIds(Vec<String>),

    #[error("Expected stylesheet {} to exist", .0.display())]
    StylesheetMissing(PathBuf),

    #[error("Expected to find a stylesheet line in the map html")]
    StylesheetAnchorMissing,

    #[error("No valid observation locations to center the map on")]
    NoLocations,

    #[error("No transform available for EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Expected export file {} to exist after writing", .0.display())]
    ExportMissing(PathBuf),

    #[error("Invalid map config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("External command {command} failed: {message}")]
    Command { command: String, message: String },

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
