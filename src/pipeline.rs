//! Entry points tying the stages together: read, gather, render or export.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::assemble::assemble;
use crate::config::MapConfig;
use crate::error::{Error, Result};
use crate::export::{compile_type_tables, write_geo_tables, GeoTable};
use crate::map::{
    add_local_stylesheet, add_observations_to_map, location_centroid, resolve_extras_inputs,
    ImageCatalog, StyleKind, WebMap,
};
use crate::model::{IdExceptions, Observation};
use crate::reader::read_table_sets;
use crate::tables::{Bounds, TableSet};

/// File name of the stylesheet copied next to the compiled map.
pub const STYLES_CSS: &str = "styles.css";

/// Narrows one snapshot to `projects` (and `bounds`) and assembles its observations.
///
/// Returns the observations together with the narrowed tables.
pub fn gather_project_observations<S: AsRef<str>>(
    tables: &TableSet,
    projects: &[S],
    exceptions: &IdExceptions,
    bounds: Option<&Bounds>,
) -> Result<(Vec<Observation>, TableSet)> {
    let mut filtered = tables.filter_to_projects(projects)?;
    if let Some(bounds) = bounds {
        info!(?bounds, "Filtering observations to bounds");
        filtered = filtered.filter_to_bounds(bounds)?;
    }
    let observations = assemble(&filtered, exceptions)?;
    Ok((observations, filtered))
}

/// [`gather_project_observations`] over several snapshots, one result per snapshot.
pub fn gather_project_observations_multiple<S: AsRef<str>>(
    all_tables: &[TableSet],
    projects: &[S],
    exceptions: &IdExceptions,
    bounds: Option<&Bounds>,
) -> Result<(Vec<Vec<Observation>>, Vec<TableSet>)> {
    let mut all_observations = Vec::with_capacity(all_tables.len());
    let mut all_project_tables = Vec::with_capacity(all_tables.len());
    for tables in all_tables {
        let (observations, project_tables) =
            gather_project_observations(tables, projects, exceptions, bounds)?;
        all_observations.push(observations);
        all_project_tables.push(project_tables);
    }
    Ok((all_observations, all_project_tables))
}

/// Command line projects followed by config projects, each name once.
pub fn merge_projects(cli_projects: &[String], config_projects: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    cli_projects
        .iter()
        .chain(config_projects)
        .filter(|project| seen.insert(project.as_str()))
        .cloned()
        .collect()
}

/// Inputs of [`compile_webmap`].
#[derive(Debug, Clone, Default)]
pub struct WebmapOptions {
    pub sqlite_dir: PathBuf,
    pub imgs_dir: PathBuf,
    pub map_save_path: PathBuf,
    pub stylesheet: PathBuf,
    pub projects: Vec<String>,
    pub extra_datasets: Vec<PathBuf>,
    pub extra_names: Vec<String>,
    pub extra_popup_fields: Vec<String>,
    pub extra_style_kinds: Vec<StyleKind>,
    pub extra_colors: Vec<String>,
}

/// Compiles the web map of the configured projects and writes it to
/// `options.map_save_path`, with the stylesheet copied alongside.
pub fn compile_webmap(options: &WebmapOptions, config: &MapConfig) -> Result<WebMap> {
    let projects = merge_projects(&options.projects, &config.projects);
    info!(?projects, "Compiling web map");

    let all_tables = read_table_sets(&options.sqlite_dir)?;
    let (all_observations, _) = gather_project_observations_multiple(
        &all_tables,
        &projects,
        &config.exceptions,
        config.bounds.as_ref(),
    )?;
    let observations: Vec<Observation> = all_observations.into_iter().flatten().collect();

    let mut web_map = WebMap::new(location_centroid(&observations)?);
    let catalog = ImageCatalog::new(&options.imgs_dir);
    add_observations_to_map(&observations, &mut web_map, Some(&catalog), &config.rechecks);

    for overlay in resolve_extras_inputs(
        &options.extra_datasets,
        &options.extra_names,
        &options.extra_popup_fields,
        &options.extra_style_kinds,
        &options.extra_colors,
    )? {
        web_map.add_overlay(overlay);
    }
    web_map.add_locate_control();

    write_and_style_html_map(
        &web_map,
        &options.map_save_path,
        &options.imgs_dir,
        &options.stylesheet,
    )?;
    Ok(web_map)
}

/// Writes the map, points image links at the directory next to the map and
/// links the stylesheet, which is copied beside the map as `styles.css`.
pub fn write_and_style_html_map(
    web_map: &WebMap,
    map_save_path: &Path,
    imgs_dir: &Path,
    stylesheet: &Path,
) -> Result<()> {
    let map_dir = map_save_path.parent().unwrap_or(Path::new(""));
    if !map_dir.as_os_str().is_empty() {
        fs::create_dir_all(map_dir).map_err(|e| Error::io(map_dir, e))?;
    }

    let mut html = web_map.render_html()?;
    let imgs_prefix = imgs_dir.display().to_string();
    if let Some(imgs_name) = imgs_dir.file_name().and_then(|name| name.to_str()) {
        if !imgs_prefix.is_empty() && imgs_prefix != imgs_name {
            html = html.replace(&imgs_prefix, imgs_name);
        }
    }
    let styled = add_local_stylesheet(&html, stylesheet, STYLES_CSS)?;
    fs::write(map_save_path, styled).map_err(|e| Error::io(map_save_path, e))?;

    let styles_path = map_dir.join(STYLES_CSS);
    if styles_path != stylesheet {
        fs::copy(stylesheet, &styles_path).map_err(|e| Error::io(&styles_path, e))?;
    }
    info!(
        markers = web_map.markers().len(),
        "Written styled map to {:?}",
        map_save_path
    );
    Ok(())
}

/// Exports the observations of `projects` as one set of files per sub-type.
///
/// Returns the compiled tables; nothing is written when no observations
/// are found.
pub fn export_observations(
    sqlite_dir: &Path,
    export_dir: &Path,
    projects: &[String],
    config: &MapConfig,
    with_z: bool,
) -> Result<Vec<GeoTable>> {
    let projects = merge_projects(projects, &config.projects);
    let all_tables = read_table_sets(sqlite_dir)?;
    let (all_observations, _) = gather_project_observations_multiple(
        &all_tables,
        &projects,
        &config.exceptions,
        config.bounds.as_ref(),
    )?;
    let observations: Vec<Observation> = all_observations.into_iter().flatten().collect();
    if observations.is_empty() {
        info!(?projects, "No observations found, nothing to export");
        return Ok(Vec::new());
    }

    let geo_tables = compile_type_tables(
        &observations,
        config.export_epsg,
        with_z,
        config.declination_value,
    )?;
    let written = write_geo_tables(&geo_tables, export_dir)?;
    info!(
        observations = observations.len(),
        files = written.len(),
        "Exported observations to {:?}",
        export_dir
    );
    Ok(geo_tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::table_set;

    #[test]
    fn test_merge_projects() {
        let merged = merge_projects(
            &["Kurikka GTK".to_string(), "A".to_string()],
            &["A".to_string(), "B".to_string()],
        );
        assert_eq!(merged, vec!["Kurikka GTK", "A", "B"]);
    }

    #[test]
    fn test_gather_project_observations() {
        let tables = table_set(&[
            ("A", 60.17, 24.94, "Kurikka GTK"),
            ("B", 61.0, 25.0, "Kurikka GTK"),
            ("C", 60.17, 24.94, "Other"),
        ]);
        let (observations, filtered) = gather_project_observations(
            &tables,
            &["Kurikka GTK"],
            &IdExceptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(filtered.observations.len(), 2);

        // Only A lies inside the box around Helsinki
        let bounds = Bounds {
            xmin: 380_000.0,
            ymin: 6_660_000.0,
            xmax: 390_000.0,
            ymax: 6_680_000.0,
            epsg: 3067,
        };
        let (observations, _) = gather_project_observations(
            &tables,
            &["Kurikka GTK"],
            &IdExceptions::default(),
            Some(&bounds),
        )
        .unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].obs_id.as_str(), "A");
    }

    #[test]
    fn test_gather_multiple_keeps_snapshots_apart() {
        let first = table_set(&[("A", 61.0, 23.0, "P")]);
        let second = table_set(&[("B", 61.0, 23.0, "P"), ("C", 61.0, 23.0, "P")]);
        let (observations, tables) = gather_project_observations_multiple(
            &[first, second],
            &["P"],
            &IdExceptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(observations.iter().map(Vec::len).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(tables.len(), 2);
    }
}
