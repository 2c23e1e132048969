use crate::models::{InputFile, WorkingDirectories};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Lists the files to convert.
#[derive(Debug, Clone)]
pub struct InputScanner {
    extension: String,
}

impl InputScanner {
    /// # Arguments
    /// * `extension` - Input extension with or without the leading dot, matched case-insensitively
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    /// Scan the active input directory, falling back to the secondary location.
    ///
    /// When the active directory has no matching files, was not overridden by
    /// the caller, and the secondary location has some, `dirs.input` is
    /// switched to the secondary location for the rest of the run.
    ///
    /// Zero files in both places is not an error.
    pub fn scan(&self, dirs: &mut WorkingDirectories) -> Result<Vec<InputFile>> {
        let files = self.list(&dirs.input)?;
        if !files.is_empty() || dirs.input_overridden {
            return Ok(files);
        }

        let Some(secondary) = dirs.secondary_input.clone() else {
            return Ok(files);
        };

        if !secondary.is_dir() {
            return Ok(files);
        }

        let secondary_files = self.list(&secondary)?;
        if secondary_files.is_empty() {
            return Ok(files);
        }

        tracing::info!(
            "No .{} files in {}; using {} ({} files)",
            self.extension,
            dirs.input,
            secondary,
            secondary_files.len()
        );
        dirs.secondary_input = Some(std::mem::replace(&mut dirs.input, secondary));
        Ok(secondary_files)
    }

    /// Matching regular files in `dir`, sorted by file name.
    pub fn list(&self, dir: &Utf8Path) -> Result<Vec<InputFile>> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read input directory: {}", dir))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read entry in {}", dir))?;
            let path = match Utf8PathBuf::try_from(entry.path()) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Skipping non UTF-8 path: {}", e);
                    continue;
                }
            };

            if path.is_file() && self.matches(&path) {
                paths.push(path);
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths.into_iter().map(InputFile::new).collect())
    }

    fn matches(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}
