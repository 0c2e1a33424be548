//! Pulls the latest snapshots and photos from cloud storage with `rclone`.

use std::path::Path;
use std::process::Command;
use tracing::{error, info};

use crate::error::{Error, Result};

const RCLONE: &str = "rclone";

/// Subdirectories of the remote holding snapshots and photos.
pub const REMOTE_SQLITE_DIR: &str = "kapalo_sql";
pub const REMOTE_IMGS_DIR: &str = "kapalo_imgs";

/// `rclone copy <remote>:<remote_dir> <local_dir>` as an argument list.
pub fn copy_args(remote: &str, remote_dir: &str, local_dir: &Path) -> Vec<String> {
    vec![
        "copy".to_string(),
        format!("{}:{}", remote.trim_end_matches(':'), remote_dir),
        local_dir.display().to_string(),
    ]
}

fn run(program: &str, args: &[String]) -> Result<()> {
    let command_line = format!("{} {}", program, args.join(" "));
    info!("Running {}", command_line);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::Command {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(status = %output.status, "{} failed: {}", command_line, stderr.trim());
        return Err(Error::Command {
            command: command_line,
            message: format!("{}: {}", output.status, stderr.trim()),
        });
    }
    Ok(())
}

/// Copies the remote snapshot and photo directories into the local ones.
pub fn remote_update(remote: &str, sqlite_dir: &Path, imgs_dir: &Path) -> Result<()> {
    remote_update_with(RCLONE, remote, sqlite_dir, imgs_dir)
}

fn remote_update_with(
    program: &str,
    remote: &str,
    sqlite_dir: &Path,
    imgs_dir: &Path,
) -> Result<()> {
    run(program, &copy_args(remote, REMOTE_SQLITE_DIR, sqlite_dir))?;
    run(program, &copy_args(remote, REMOTE_IMGS_DIR, imgs_dir))?;
    info!(remote, "Updated snapshots and images from remote");
    Ok(())
}
