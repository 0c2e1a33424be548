#![allow(dead_code)]

use kapalo_map::schema::TableKind;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a snapshot with all eight tables and runs `inserts` against it.
pub fn create_snapshot(path: &Path, inserts: &[&str]) {
    let connection = Connection::open(path).unwrap();
    for kind in TableKind::ALL {
        let mut columns: Vec<&str> = kind.group_column().into_iter().collect();
        columns.extend(
            kind.columns()
                .iter()
                .filter(|column| Some(**column) != kind.group_column()),
        );
        let sql = format!("CREATE TABLE \"{}\" ({})", kind.sql_name(), columns.join(", "));
        connection.execute(&sql, []).unwrap();
    }
    for insert in inserts {
        connection.execute(insert, []).unwrap();
    }
}

/// OBS-1 carries one row of every sub-type except two planars; OBS-2 is
/// bare; OBS-3 belongs to another project.
pub const FIRST_SNAPSHOT: &[&str] = &[
    "INSERT INTO Observation VALUES ('OBS-1', 60.17, 24.94, 'Outcrop by the road', 'Kurikka GTK')",
    "INSERT INTO Observation VALUES ('OBS-2', 60.2, 24.9, NULL, 'Kurikka GTK')",
    "INSERT INTO Observation VALUES ('OBS-3', 61.0, 25.0, 'Elsewhere', 'Other')",
    "INSERT INTO Tectonic_measurement (OBSID, GDB_ID) VALUES ('OBS-1', 'TM-1')",
    "INSERT INTO Tectonic_measurement (OBSID, GDB_ID) VALUES ('OBS-3', 'TM-3')",
    "INSERT INTO BFDS_Planar_structure (TM_GID, REMARKS, DIP, DIRECTION_OF_DIP, STYPE_TEXT) VALUES ('TM-1', 'foliation', 45.0, 358.0, 'Foliation')",
    "INSERT INTO BFDS_Planar_structure (TM_GID, REMARKS, DIP, DIRECTION_OF_DIP, STYPE_TEXT) VALUES ('TM-1', NULL, 60.0, 200.0, 'Joint')",
    "INSERT INTO BFDS_Planar_structure (TM_GID, REMARKS, DIP, DIRECTION_OF_DIP, STYPE_TEXT) VALUES ('TM-3', NULL, 10.0, 10.0, 'Joint')",
    "INSERT INTO BFDS_Linear_structure (TM_GID, REMARKS, DIRECTION, PLUNGE, STYPE_TEXT) VALUES ('TM-1', NULL, 120.0, 30.0, 'Lineation')",
    "INSERT INTO Outcrop_picture (OBSID, PICTURE_ID, REMARKS) VALUES ('OBS-1', 'IMG-1', 'Outcrop photo')",
    "INSERT INTO Rock_observation_point (OBSID, REMARKS, FIELD_NAME, ROCK_NAME, GDB_ID) VALUES ('OBS-1', NULL, 'granite', 'Granite', 'ROP-1')",
    "INSERT INTO BFDS_SaT (ROP_GID, ST_2, ST_1) VALUES ('ROP-1', 'porphyritic', NULL)",
    "INSERT INTO Sample (OBSID, SAMPLEID, FIELD_NAME) VALUES ('OBS-1', 'S-1', 'granite')",
];

/// Repeats OBS-2 of the first snapshot and adds OBS-4.
pub const SECOND_SNAPSHOT: &[&str] = &[
    "INSERT INTO Observation VALUES ('OBS-2', 60.2, 24.9, NULL, 'Kurikka GTK')",
    "INSERT INTO Observation VALUES ('OBS-4', 60.3, 25.1, 'Boulder', 'Kurikka GTK')",
];

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("kapalo_sql")).unwrap();
        fs::create_dir_all(dir.path().join("kapalo_imgs")).unwrap();
        Self { dir }
    }

    pub fn sqlite_dir(&self) -> PathBuf {
        self.dir.path().join("kapalo_sql")
    }

    pub fn imgs_dir(&self) -> PathBuf {
        self.dir.path().join("kapalo_imgs")
    }

    pub fn add_snapshot(&self, name: &str, inserts: &[&str]) -> PathBuf {
        let path = self.sqlite_dir().join(name);
        create_snapshot(&path, inserts);
        path
    }

    pub fn add_image(&self, name: &str) {
        fs::write(self.imgs_dir().join(name), b"jpg").unwrap();
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}
