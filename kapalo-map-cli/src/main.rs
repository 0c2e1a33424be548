use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kapalo_map::{
    compile_webmap, export_observations, read_config, remote_update, resize_images, StyleKind,
    WebmapOptions,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the live-mapping web map
    CompileWebmap(CompileWebmapArgs),
    /// Export observations as csv and geojson files per observation type
    ExportObservations(ExportObservationsArgs),
    /// Write resized copies of images
    ResizeImages(ResizeImagesArgs),
    /// Copy snapshots and images from an rclone remote
    RemoteUpdate(RemoteUpdateArgs),
}

#[derive(Args, Debug)]
struct CompileWebmapArgs {
    /// Directory of *.sqlite snapshots
    #[arg(long, default_value = "data/kapalo_sql")]
    kapalo_sqlite_path: PathBuf,

    /// Directory of observation images
    #[arg(long, default_value = "data/kapalo_imgs")]
    kapalo_imgs_path: PathBuf,

    #[arg(long, default_value = "live-mapping/index.html")]
    map_save_path: PathBuf,

    /// Stylesheet linked from the map and copied next to it
    #[arg(long, default_value = "data/styles.css")]
    stylesheet: PathBuf,

    #[arg(long, default_value = "mapconfig.toml")]
    config_path: PathBuf,

    #[arg(long, num_args = 1.., default_values_t = [String::from("Kurikka GTK")])]
    projects: Vec<String>,

    /// GeoJSON datasets layered on the map
    #[arg(long, num_args = 1..)]
    extra_datasets: Vec<PathBuf>,

    #[arg(long, num_args = 1..)]
    extra_names: Vec<String>,

    #[arg(long, num_args = 1..)]
    extra_popup_fields: Vec<String>,

    /// One of: bedrock, lineament
    #[arg(long, num_args = 1..)]
    extra_style_functions: Vec<StyleKind>,

    #[arg(long, num_args = 1..)]
    extra_colors: Vec<String>,
}

#[derive(Args, Debug)]
struct ExportObservationsArgs {
    #[arg(long, default_value = "data/kapalo_sql")]
    kapalo_sqlite_path: PathBuf,

    #[arg(long, default_value = "exports")]
    export_folder: PathBuf,

    #[arg(long, default_value = "mapconfig.toml")]
    config_path: PathBuf,

    #[arg(long, num_args = 1.., default_values_t = [String::from("Kurikka GTK")])]
    projects: Vec<String>,

    /// Add a zero z coordinate to the exported points
    #[arg(long)]
    with_z: bool,
}

#[derive(Args, Debug)]
struct ResizeImagesArgs {
    #[arg(long)]
    origin_dir: PathBuf,

    #[arg(long)]
    destination_dir: PathBuf,

    #[arg(long, default_value = "jpg")]
    extension: String,

    /// Width of the resized images in pixels
    #[arg(long, default_value_t = 1000)]
    fixed_width: u32,

    #[arg(long)]
    overwrite: bool,
}

#[derive(Args, Debug)]
struct RemoteUpdateArgs {
    /// rclone remote name
    #[arg(long)]
    remote: String,

    #[arg(long, default_value = "data/kapalo_sql")]
    kapalo_sqlite_path: PathBuf,

    #[arg(long, default_value = "data/kapalo_imgs")]
    kapalo_imgs_path: PathBuf,
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    tracing::Level::from_str(level)
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", level))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_json)?;

    let start_time = std::time::Instant::now();

    match cli.command {
        Command::CompileWebmap(args) => run_compile_webmap(args)?,
        Command::ExportObservations(args) => run_export_observations(args)?,
        Command::ResizeImages(args) => {
            let written = resize_images(
                &args.origin_dir,
                &args.destination_dir,
                &args.extension,
                args.fixed_width,
                args.overwrite,
            )
            .with_context(|| format!("Failed to resize images in {:?}", args.origin_dir))?;
            info!("Resized {} images", written);
        }
        Command::RemoteUpdate(args) => {
            remote_update(&args.remote, &args.kapalo_sqlite_path, &args.kapalo_imgs_path)
                .with_context(|| format!("Failed to update from remote {}", args.remote))?;
        }
    }

    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn run_compile_webmap(args: CompileWebmapArgs) -> Result<()> {
    if !args.kapalo_sqlite_path.is_dir() {
        anyhow::bail!(
            "Snapshot directory {:?} does not exist",
            args.kapalo_sqlite_path
        );
    }
    let config = read_config(Some(&args.config_path))
        .with_context(|| format!("Failed to read config {:?}", args.config_path))?;

    let options = WebmapOptions {
        sqlite_dir: args.kapalo_sqlite_path,
        imgs_dir: args.kapalo_imgs_path,
        map_save_path: args.map_save_path,
        stylesheet: args.stylesheet,
        projects: args.projects,
        extra_datasets: args.extra_datasets,
        extra_names: args.extra_names,
        extra_popup_fields: args.extra_popup_fields,
        extra_style_kinds: args.extra_style_functions,
        extra_colors: args.extra_colors,
    };
    let web_map = compile_webmap(&options, &config).context("Failed to compile web map")?;
    info!(
        "Compiled map with {} markers to {:?}",
        web_map.markers().len(),
        options.map_save_path
    );
    Ok(())
}

fn run_export_observations(args: ExportObservationsArgs) -> Result<()> {
    if !args.kapalo_sqlite_path.is_dir() {
        anyhow::bail!(
            "Snapshot directory {:?} does not exist",
            args.kapalo_sqlite_path
        );
    }
    let config = read_config(Some(&args.config_path))
        .with_context(|| format!("Failed to read config {:?}", args.config_path))?;

    let geo_tables = export_observations(
        &args.kapalo_sqlite_path,
        &args.export_folder,
        &args.projects,
        &config,
        args.with_z,
    )
    .with_context(|| format!("Failed to export observations to {:?}", args.export_folder))?;
    for geo_table in &geo_tables {
        info!("Compiled {} rows of {}", geo_table.len(), geo_table.sub_type);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compile_webmap() {
        let cli = Cli::try_parse_from([
            "kapalo-map",
            "--log-level",
            "info",
            "compile-webmap",
            "--projects",
            "A",
            "B",
            "--extra-datasets",
            "bedrock.geojson",
            "--extra-style-functions",
            "Bedrock",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "info");
        let Command::CompileWebmap(args) = cli.command else {
            panic!("expected compile-webmap");
        };
        assert_eq!(args.projects, vec!["A", "B"]);
        assert_eq!(args.extra_style_functions, vec![StyleKind::Bedrock]);
        assert_eq!(args.config_path, PathBuf::from("mapconfig.toml"));
    }

    #[test]
    fn test_parse_export_defaults() {
        let cli = Cli::try_parse_from(["kapalo-map", "export-observations", "--with-z"]).unwrap();
        let Command::ExportObservations(args) = cli.command else {
            panic!("expected export-observations");
        };
        assert!(args.with_z);
        assert_eq!(args.projects, vec!["Kurikka GTK"]);
        assert_eq!(args.export_folder, PathBuf::from("exports"));
    }

    #[test]
    fn test_unknown_style_function_is_rejected() {
        let result = Cli::try_parse_from([
            "kapalo-map",
            "compile-webmap",
            "--extra-style-functions",
            "granite",
        ]);
        assert!(result.is_err());
    }
}
