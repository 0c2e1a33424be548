mod common;

use common::{Workspace, FIRST_SNAPSHOT, SECOND_SNAPSHOT};
use kapalo_map::map::StyleKind;
use kapalo_map::{compile_webmap, read_config, read_table_sets, Error, WebmapOptions};
use std::fs;

const CONFIG: &str = r#"
projects = ["Extra project"]
rechecks = ["OBS-1"]
"#;

const OVERLAY: &str = r#"{
  "type": "FeatureCollection",
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3067"}},
  "features": [
    {"type": "Feature", "properties": {"unit": "granite"},
     "geometry": {"type": "Point", "coordinates": [385700.42, 6672126.74]}}
  ]
}"#;

fn options(workspace: &Workspace) -> WebmapOptions {
    WebmapOptions {
        sqlite_dir: workspace.sqlite_dir(),
        imgs_dir: workspace.imgs_dir(),
        map_save_path: workspace.dir.path().join("live-mapping").join("index.html"),
        stylesheet: workspace.write("custom.css", "body { margin: 0; }"),
        projects: vec!["Kurikka GTK".to_string()],
        ..WebmapOptions::default()
    }
}

#[test]
fn test_compile_webmap_end_to_end() {
    let workspace = Workspace::new();
    workspace.add_snapshot("a.sqlite", FIRST_SNAPSHOT);
    workspace.add_snapshot("b.sqlite", SECOND_SNAPSHOT);
    workspace.add_image("IMG-1.jpg");
    let config_path = workspace.write("mapconfig.toml", CONFIG);
    let config = read_config(Some(&config_path)).unwrap();

    let mut options = options(&workspace);
    options.extra_datasets = vec![workspace.write("bedrock.geojson", OVERLAY)];
    options.extra_names = vec!["Bedrock".to_string()];
    options.extra_popup_fields = vec!["unit".to_string()];
    options.extra_style_kinds = vec![StyleKind::Bedrock];
    options.extra_colors = vec!["green".to_string()];

    let web_map = compile_webmap(&options, &config).unwrap();

    // OBS-2 is in both snapshots and OBS-3 is in another project
    let tooltips: Vec<&str> = web_map.markers().iter().map(|m| m.tooltip.as_str()).collect();
    assert_eq!(tooltips, vec!["OBS-1", "OBS-2", "OBS-4"]);
    assert_eq!(web_map.markers()[0].icon.name, "arrow-up");
    assert_eq!(web_map.markers()[0].icon.color, "red");
    assert_eq!(web_map.markers()[1].icon.color, "lightgray");
    assert_eq!(web_map.overlays().len(), 1);

    let map_dir = options.map_save_path.parent().unwrap();
    let html = fs::read_to_string(&options.map_save_path).unwrap();
    // The custom stylesheet is served next to the map under a fixed name
    assert!(html.contains("<link rel=\"stylesheet\" href=\"styles.css\"/>"));
    assert!(!html.contains("href=\"custom.css\""));
    assert!(html.contains("kapalo_imgs/IMG-1.jpg"));
    assert!(!html.contains(&workspace.imgs_dir().display().to_string()));
    assert!(html.contains("Outcrop by the road"));
    assert_eq!(
        fs::read_to_string(map_dir.join("styles.css")).unwrap(),
        "body { margin: 0; }"
    );
}

#[test]
fn test_compile_webmap_without_observations() {
    let workspace = Workspace::new();
    workspace.add_snapshot("a.sqlite", FIRST_SNAPSHOT);
    let mut options = options(&workspace);
    options.projects = vec!["Nobody".to_string()];

    let result = compile_webmap(&options, &Default::default());
    assert!(matches!(result, Err(Error::NoLocations)));
    assert!(!options.map_save_path.exists());
}

#[test]
fn test_compile_webmap_missing_stylesheet() {
    let workspace = Workspace::new();
    workspace.add_snapshot("a.sqlite", FIRST_SNAPSHOT);
    let mut options = options(&workspace);
    options.stylesheet = workspace.dir.path().join("missing.css");

    let result = compile_webmap(&options, &Default::default());
    assert!(matches!(result, Err(Error::StylesheetMissing(_))));
}

#[test]
fn test_merge_snapshots() {
    let workspace = Workspace::new();
    workspace.add_snapshot("a.sqlite", FIRST_SNAPSHOT);
    workspace.add_snapshot("b.sqlite", SECOND_SNAPSHOT);
    let table_sets = read_table_sets(&workspace.sqlite_dir()).unwrap();

    match table_sets[0].merge(&table_sets[1]) {
        Err(Error::DuplicateObservationIds(ids)) => assert_eq!(ids, vec!["OBS-2"]),
        other => panic!("expected duplicate ids, got {other:?}"),
    }

    let mut disjoint = table_sets[1].clone();
    disjoint.observations = table_sets[1]
        .observations
        .filter_rows(|row| row[0].to_string() == "OBS-4");
    let merged = table_sets[0].merge(&disjoint).unwrap();
    assert_eq!(
        merged.observations.len(),
        table_sets[0].observations.len() + disjoint.observations.len()
    );
}
