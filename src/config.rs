use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::crs::ETRS_TM35FIN_EPSG;
use crate::error::{Error, Result};
use crate::model::IdExceptions;
use crate::tables::Bounds;

/// Run-wide settings, read once and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    /// Project names to include on top of those given on the command line.
    pub projects: Vec<String>,
    /// Observation ids highlighted on the map.
    pub rechecks: BTreeSet<String>,
    pub exceptions: IdExceptions,
    /// Magnetic declination in degrees.
    pub declination_value: f64,
    pub bounds: Option<Bounds>,
    /// Reference system of the exported datasets.
    pub export_epsg: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            rechecks: BTreeSet::new(),
            exceptions: IdExceptions::default(),
            declination_value: 0.0,
            bounds: None,
            export_epsg: ETRS_TM35FIN_EPSG,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    projects: Vec<String>,
    rechecks: Vec<String>,
    exceptions: HashMap<String, String>,
    declination: Option<DeclinationSection>,
    bounds: Option<toml::Value>,
    export_epsg: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DeclinationSection {
    value: f64,
}

impl MapConfig {
    /// Parses a TOML config document. `origin` is only used in errors.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        let bounds = file.bounds.and_then(|section| {
            section
                .try_into::<Bounds>()
                .inspect_err(|e| error!("Failed to parse bounds section, bounds ignored: {}", e))
                .ok()
        });

        Ok(Self {
            // No quotes allowed in project names
            projects: file
                .projects
                .iter()
                .map(|project| project.replace(['"', '\''], ""))
                .collect(),
            rechecks: file.rechecks.into_iter().collect(),
            exceptions: file.exceptions.into_iter().collect(),
            declination_value: file.declination.map_or(0.0, |d| d.value),
            bounds,
            export_epsg: file.export_epsg.unwrap_or(ETRS_TM35FIN_EPSG),
        })
    }
}

/// Reads the config at `config_path`, defaulting when there is none.
pub fn read_config(config_path: Option<&Path>) -> Result<MapConfig> {
    let Some(path) = config_path.filter(|path| path.exists()) else {
        info!(config_path = ?config_path, "No map config found, using defaults");
        return Ok(MapConfig::default());
    };
    info!("Reading map config from {:?}", path);
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    MapConfig::from_toml(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObservationId;
    use tempfile::TempDir;

    const FULL: &str = r#"
projects = ["Kurikka \"GTK\"", "Other"]
rechecks = ["OBS-1", "OBS-2"]
export_epsg = 32635

[exceptions]
"OBS-9" = "OBS-09"

[declination]
value = 8.5

[bounds]
xmin = 300000
ymin = 6600000.0
xmax = 450000.0
ymax = 6750000.0
epsg = 3067
"#;

    #[test]
    fn test_full_config() {
        let config = MapConfig::from_toml(FULL, Path::new("mapconfig.toml")).unwrap();

        assert_eq!(config.projects, vec!["Kurikka GTK", "Other"]);
        assert!(config.rechecks.contains("OBS-2"));
        assert_eq!(
            config.exceptions.remap(&ObservationId::from("OBS-9")),
            ObservationId::from("OBS-09")
        );
        assert_eq!(config.declination_value, 8.5);
        assert_eq!(config.export_epsg, 32635);
        let bounds = config.bounds.unwrap();
        assert_eq!(bounds.xmin, 300_000.0);
        assert_eq!(bounds.epsg, 3067);
    }

    #[test]
    fn test_incomplete_bounds_are_ignored() {
        let content = "[bounds]\nxmin = 1.0\nymin = 2.0\nepsg = 3067\n";
        let config = MapConfig::from_toml(content, Path::new("mapconfig.toml")).unwrap();
        assert_eq!(config.bounds, None);
        assert_eq!(config.declination_value, 0.0);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = MapConfig::from_toml("projects = [", Path::new("bad.toml"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_read_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("mapconfig.toml");

        assert_eq!(read_config(None).unwrap(), MapConfig::default());
        assert_eq!(read_config(Some(&missing)).unwrap(), MapConfig::default());

        fs::write(&missing, "rechecks = [\"A\"]\n").unwrap();
        let config = read_config(Some(&missing)).unwrap();
        assert_eq!(config.rechecks.len(), 1);
        assert_eq!(config.export_epsg, ETRS_TM35FIN_EPSG);
    }
}
