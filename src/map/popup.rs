//! Popup markup of observation markers.

use pulldown_cmark::{html, Options, Parser};
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::model::{Observation, Table, Value};
use crate::schema::{columns, SubType};

/// Images inlined in a popup; the rest are listed as links.
const INLINE_IMAGES: usize = 2;
const IMAGE_HEIGHT: u32 = 150;

/// The `*.jpg` files of one directory, listed on first use and then kept.
#[derive(Debug)]
pub struct ImageCatalog {
    dir: PathBuf,
    paths: OnceCell<Vec<PathBuf>>,
}

impl ImageCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            paths: OnceCell::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn paths(&self) -> &[PathBuf] {
        self.paths.get_or_init(|| list_images(&self.dir))
    }

    /// Images whose file stem contains `image_id`.
    fn matches(&self, image_id: &str) -> Vec<&PathBuf> {
        self.paths()
            .iter()
            .filter(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| stem.contains(image_id))
            })
            .collect()
    }
}

fn list_images(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!(path = %dir.display(), "Cannot list images: {}", err);
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("jpg"))
        .collect();
    paths.sort();
    debug!("Found {} images in {:?}", paths.len(), dir);
    paths
}

fn markdown_cell(value: &Value) -> String {
    value
        .to_string()
        .replace('|', "\\|")
        .replace(['\r', '\n'], " ")
}

/// Pipe table of `table`, or a lone newline when it has no rows.
pub fn table_to_markdown(table: &Table) -> String {
    if table.is_empty() {
        return "\n".to_string();
    }
    let mut markdown = String::new();
    let header: Vec<String> = table
        .columns()
        .iter()
        .map(|column| column.replace('|', "\\|"))
        .collect();
    markdown.push_str(&format!("| {} |\n", header.join(" | ")));
    markdown.push_str(&format!("|{}\n", ":---|".repeat(header.len())));
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(markdown_cell).collect();
        markdown.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    markdown.push_str("\n\n");
    markdown
}

/// Markdown of the observation's images.
///
/// An image id matching anything but exactly one file drops the whole
/// image section, leaving a newline.
pub fn observation_image_markdown(images: &Table, catalog: Option<&ImageCatalog>) -> String {
    let mut markdown = String::from("\n");
    let Some(catalog) = catalog else {
        return markdown;
    };
    let (Some(id_idx), Some(caption_idx)) = (
        images.column_index(columns::PICTURE_ID),
        images.column_index(columns::REMARKS),
    ) else {
        return markdown;
    };

    for (idx, row) in images.rows().iter().enumerate() {
        let image_id = row[id_idx].to_string();
        let caption = row[caption_idx].to_string();
        markdown.push('\n');

        let matches = catalog.matches(&image_id);
        let [path] = matches[..] else {
            error!(
                image_id = %image_id,
                matches = matches.len(),
                "No unique match for image id in {:?}",
                catalog.dir()
            );
            return "\n".to_string();
        };
        let path = path.display();
        if idx < INLINE_IMAGES {
            markdown.push_str(&format!("[![{caption}]({path})]({path})\n"));
        } else {
            markdown.push_str(&format!("\n[{image_id}: {caption}]({path})"));
        }
    }
    markdown
}

/// Popup HTML of one observation. The observation itself is not modified.
pub fn observation_html(observation: &Observation, images: Option<&ImageCatalog>) -> String {
    let mut markdown = format!("### {}\n", observation.obs_id);

    for sub_type in SubType::ALL {
        if sub_type == SubType::Image {
            continue;
        }
        let table = observation.sub_table(sub_type);
        if table.is_empty() {
            continue;
        }
        let table = table.without_column(columns::REMARKS);
        markdown.push_str(&format!("\n#### {}\n\n", sub_type.label()));
        markdown.push_str(&table_to_markdown(&table));
    }

    markdown.push_str("\n#### Observation remarks\n\n");
    markdown.push_str(&observation.remarks);

    markdown.push_str(if observation.images.is_empty() {
        "\n"
    } else {
        "\n#### Images\n\n"
    });
    markdown.push_str(&observation_image_markdown(&observation.images, images));

    let mut html = String::new();
    html::push_html(&mut html, Parser::new_ext(&markdown, Options::ENABLE_TABLES));
    html.replace("<img src=", &format!("<img height={IMAGE_HEIGHT} src="))
}

/// Links `href` right after the last line of `html` mentioning a stylesheet.
///
/// `stylesheet` is the file that will be served under `href`; it must exist.
pub fn add_local_stylesheet(html: &str, stylesheet: &Path, href: &str) -> Result<String> {
    if !stylesheet.exists() {
        error!(path = %stylesheet.display(), "Stylesheet not found");
        return Err(Error::StylesheetMissing(stylesheet.to_path_buf()));
    }
    let mut lines: Vec<&str> = html.split('\n').collect();
    let anchor = lines
        .iter()
        .rposition(|line| line.contains("stylesheet"))
        .ok_or(Error::StylesheetAnchorMissing)?;

    let reference = format!("    <link rel=\"stylesheet\" href=\"{href}\"/>");
    lines.insert(anchor + 1, &reference);
    Ok(lines.join("\n"))
}
