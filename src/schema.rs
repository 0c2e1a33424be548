//! Table and column names of the Kapalo snapshot database.
//!
//! Every table the pipeline touches is listed in [`TableKind`] together with
//! the foreign key it is grouped by and the columns that must be present.
//! The per-observation sub-tables are described by [`SubType`].

/// Column names in the snapshot tables.
pub mod columns {
    pub const OBS_ID: &str = "OBSID";
    pub const GDB_ID: &str = "GDB_ID";
    pub const TM_GID: &str = "TM_GID";
    pub const ROP_GID: &str = "ROP_GID";
    pub const DIP: &str = "DIP";
    pub const DIP_DIRECTION: &str = "DIRECTION_OF_DIP";
    pub const DIRECTION: &str = "DIRECTION";
    pub const PLUNGE: &str = "PLUNGE";
    pub const PICTURE_ID: &str = "PICTURE_ID";
    pub const PROJECT: &str = "PROJECT";
    pub const LATITUDE: &str = "LAT";
    pub const LONGITUDE: &str = "LON";
    pub const REMARKS: &str = "REMARKS";
    pub const STYPE: &str = "STYPE";
    pub const STYPE_TEXT: &str = "STYPE_TEXT";
    pub const FOL_TYPE_TEXT: &str = "FOL_TYPE_TEXT";
    pub const FIELD_NAME: &str = "FIELD_NAME";
    pub const SAMPLE_ID: &str = "SAMPLEID";
    pub const ROCK_NAME: &str = "ROCK_NAME";
    pub const ST_1: &str = "ST_1";
    pub const ST_2: &str = "ST_2";
    pub const H_SENCE: &str = "H_SENCE";
    pub const H_SENCE_TEXT: &str = "H_SENCE_TEXT";

    // Derived columns, not present in the snapshot schema
    pub const TEXTURES: &str = "TEXTURES";
    pub const OBSERVATION_REMARKS: &str = "OBS_REMARKS";
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const Z: &str = "z";
}

use columns::*;

/// Columns holding magnetic bearings that take the declination fix.
pub const AZIMUTH_COLUMNS: [&str; 2] = [DIP_DIRECTION, DIRECTION];

pub const OBSERVATION_COLUMNS: &[&str] = &[OBS_ID, LATITUDE, LONGITUDE, REMARKS, PROJECT];
pub const TECTONIC_COLUMNS: &[&str] = &[GDB_ID];
pub const PLANAR_COLUMNS: &[&str] = &[
    REMARKS,
    DIP,
    DIP_DIRECTION,
    STYPE_TEXT,
    FOL_TYPE_TEXT,
    STYPE,
    H_SENCE,
    H_SENCE_TEXT,
];
pub const LINEAR_COLUMNS: &[&str] = &[REMARKS, DIRECTION, PLUNGE, STYPE_TEXT, STYPE];
pub const IMAGE_COLUMNS: &[&str] = &[PICTURE_ID, REMARKS];
pub const SAMPLE_COLUMNS: &[&str] = &[SAMPLE_ID, FIELD_NAME];
/// Rock observation columns as read; `GDB_ID` keys the texture lookup.
pub const ROCK_OBSERVATION_COLUMNS: &[&str] = &[REMARKS, FIELD_NAME, ROCK_NAME, GDB_ID];
/// Rock observation columns as stored on an observation.
pub const ROCK_OBSERVATION_COLUMNS_FINAL: &[&str] = &[REMARKS, FIELD_NAME, ROCK_NAME, TEXTURES];
pub const TEXTURE_COLUMNS: &[&str] = &[ST_2, ST_1];

/// The eight tables of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Observation,
    TectonicMeasurement,
    PlanarStructure,
    LinearStructure,
    RockObservationPoint,
    Image,
    Sample,
    Texture,
}

impl TableKind {
    pub const ALL: [TableKind; 8] = [
        TableKind::Observation,
        TableKind::TectonicMeasurement,
        TableKind::PlanarStructure,
        TableKind::LinearStructure,
        TableKind::RockObservationPoint,
        TableKind::Image,
        TableKind::Sample,
        TableKind::Texture,
    ];

    /// Table name in the SQLite snapshot.
    pub fn sql_name(self) -> &'static str {
        match self {
            TableKind::Observation => "Observation",
            TableKind::TectonicMeasurement => "Tectonic_measurement",
            TableKind::PlanarStructure => "BFDS_Planar_structure",
            TableKind::LinearStructure => "BFDS_Linear_structure",
            TableKind::RockObservationPoint => "Rock_observation_point",
            TableKind::Image => "Outcrop_picture",
            TableKind::Sample => "Sample",
            TableKind::Texture => "BFDS_SaT",
        }
    }

    /// Column the table is grouped by, `None` for the observation table itself.
    pub fn group_column(self) -> Option<&'static str> {
        match self {
            TableKind::Observation => None,
            TableKind::TectonicMeasurement
            | TableKind::RockObservationPoint
            | TableKind::Image
            | TableKind::Sample => Some(OBS_ID),
            TableKind::PlanarStructure | TableKind::LinearStructure => Some(TM_GID),
            TableKind::Texture => Some(ROP_GID),
        }
    }

    /// Columns carried over from this table into assembled observations.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            TableKind::Observation => OBSERVATION_COLUMNS,
            TableKind::TectonicMeasurement => TECTONIC_COLUMNS,
            TableKind::PlanarStructure => PLANAR_COLUMNS,
            TableKind::LinearStructure => LINEAR_COLUMNS,
            TableKind::RockObservationPoint => ROCK_OBSERVATION_COLUMNS,
            TableKind::Image => IMAGE_COLUMNS,
            TableKind::Sample => SAMPLE_COLUMNS,
            TableKind::Texture => TEXTURE_COLUMNS,
        }
    }
}

/// Sub-tables owned by an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubType {
    Planar,
    Linear,
    RockObservation,
    Sample,
    Texture,
    Image,
}

impl SubType {
    /// Order used both for popups and for exports.
    pub const ALL: [SubType; 6] = [
        SubType::Planar,
        SubType::Linear,
        SubType::RockObservation,
        SubType::Sample,
        SubType::Texture,
        SubType::Image,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubType::Planar => "planars",
            SubType::Linear => "linears",
            SubType::RockObservation => "rock_observations",
            SubType::Sample => "samples",
            SubType::Texture => "textures",
            SubType::Image => "images",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubType::Planar => "Planar Structures",
            SubType::Linear => "Linear Structures",
            SubType::RockObservation => "Rock Observations",
            SubType::Sample => "Samples",
            SubType::Texture => "Textures",
            SubType::Image => "Images",
        }
    }

    /// Full column schema of the sub-table on an observation.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            SubType::Planar => PLANAR_COLUMNS,
            SubType::Linear => LINEAR_COLUMNS,
            SubType::RockObservation => ROCK_OBSERVATION_COLUMNS_FINAL,
            SubType::Sample => SAMPLE_COLUMNS,
            SubType::Texture => TEXTURE_COLUMNS,
            SubType::Image => IMAGE_COLUMNS,
        }
    }
}

impl std::fmt::Display for SubType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubType::ALL
            .into_iter()
            .find(|sub_type| sub_type.as_str() == s)
            .ok_or_else(|| format!("Unknown observation sub-type: {s}"))
    }
}
