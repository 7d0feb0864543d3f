//! Persistence of rendered images and the JSON summary.
//!
//! Every image goes to two places under the project root: the asset pipeline
//! directory and the public directory. Both copies are byte-identical.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::OutputError;
use crate::stats::Summary;

pub const ER_DIAGRAM: &str = "er_diagram";
pub const MATCH_RATE_CHART: &str = "match_rate_chart";
pub const MONTHLY_TREND_CHART: &str = "monthly_trend_chart";
pub const SUMMARY_FILE: &str = "match_stats.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTargets {
    assets_dir: PathBuf,
    public_dir: PathBuf,
}

impl OutputTargets {
    /// `<root>/app/assets/images` and `<root>/public`.
    pub fn under_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            assets_dir: root.join("app").join("assets").join("images"),
            public_dir: root.join("public"),
        }
    }

    /// Both destinations of the image `name`, asset copy first.
    pub fn image_paths(&self, name: &str) -> [PathBuf; 2] {
        let file = format!("{name}.png");
        [self.assets_dir.join(&file), self.public_dir.join(&file)]
    }

    pub fn summary_path(&self) -> PathBuf {
        self.public_dir.join(SUMMARY_FILE)
    }

    /// Write `png` to both image destinations, creating directories as needed.
    pub fn write_image(&self, name: &str, png: &[u8]) -> Result<[PathBuf; 2], OutputError> {
        let paths = self.image_paths(name);
        for path in &paths {
            write_file(path, png)?;
        }
        Ok(paths)
    }

    pub fn write_summary(&self, summary: &Summary) -> Result<PathBuf, OutputError> {
        let path = self.summary_path();
        let mut json = summary.to_json_pretty()?;
        json.push('\n');
        write_file(&path, json.as_bytes())?;
        Ok(path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let result = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
    .and_then(|()| fs::write(path, bytes));

    match result {
        Ok(()) => {
            info!(path = %path.display(), bytes = bytes.len(), "wrote file");
            Ok(())
        }
        Err(source) => {
            error!(path = %path.display(), %source, "write failed");
            Err(OutputError::WriteFailure {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
