//! Working directory resolution.
//!
//! Each of the four directories is resolved with this precedence:
//! 1. An explicit override (input and output only), used verbatim
//! 2. `<base>/<name>` if it exists
//! 3. `<base>/../<name>` if that exists instead (project-root layout)
//! 4. `<base>/<name>`, created if missing
//!
//! Creation failures are logged and left for the pipeline's precondition
//! check; resolution itself never fails.

use crate::models::{DirectoryNames, WorkingDirectories};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Resolves the input, output, done and failed directories for a run.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: Utf8PathBuf,
    names: DirectoryNames,
}

impl PathResolver {
    pub fn new<P: AsRef<Utf8Path>>(base_dir: P, names: DirectoryNames) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            names,
        }
    }

    /// Resolve all four directories, creating the ones that are missing.
    ///
    /// # Arguments
    /// * `input_override` - Caller supplied input directory, never substituted
    /// * `output_override` - Caller supplied output directory
    pub fn resolve(
        &self,
        input_override: Option<&Utf8Path>,
        output_override: Option<&Utf8Path>,
    ) -> WorkingDirectories {
        let dirs = self.plan(input_override, output_override);

        let named = [
            ("input", &self.names.input, &dirs.input, dirs.input_overridden),
            ("output", &self.names.output, &dirs.output, dirs.output_overridden),
            ("done", &self.names.done, &dirs.done, false),
            ("failed", &self.names.failed, &dirs.failed, false),
        ];
        for (label, name, dir, overridden) in named {
            let default = self.base_dir.join(name);
            if !overridden && *dir != default {
                tracing::info!(
                    "Using project-root {} directory: {} ({} does not exist)",
                    label,
                    dir,
                    default
                );
            }
        }

        for (label, dir) in dirs.all() {
            ensure_dir(dir, label);
        }

        dirs
    }

    /// Work out where the directories are without creating or logging anything.
    ///
    /// Gives the same paths [`resolve`](Self::resolve) would, so the output
    /// directory is known before logging is set up.
    pub fn plan(
        &self,
        input_override: Option<&Utf8Path>,
        output_override: Option<&Utf8Path>,
    ) -> WorkingDirectories {
        let (input, secondary_input) = match input_override {
            Some(path) => (path.to_path_buf(), None),
            None => {
                let input = self.default_or_sibling(&self.names.input);
                let secondary = self
                    .candidates(&self.names.input)
                    .into_iter()
                    .find(|candidate| *candidate != input);
                (input, secondary)
            }
        };

        let output = match output_override {
            Some(path) => path.to_path_buf(),
            None => self.default_or_sibling(&self.names.output),
        };

        WorkingDirectories {
            input,
            output,
            done: self.default_or_sibling(&self.names.done),
            failed: self.default_or_sibling(&self.names.failed),
            input_overridden: input_override.is_some(),
            output_overridden: output_override.is_some(),
            secondary_input,
        }
    }

    /// `<base>/<name>` and, when the base has a parent, `<base>/../<name>`.
    fn candidates(&self, name: &str) -> Vec<Utf8PathBuf> {
        let mut candidates = vec![self.base_dir.join(name)];
        if let Some(parent) = self.base_dir.parent() {
            candidates.push(parent.join(name));
        }
        candidates
    }

    fn default_or_sibling(&self, name: &str) -> Utf8PathBuf {
        let default = self.base_dir.join(name);
        if default.is_dir() {
            return default;
        }

        match self.base_dir.parent().map(|p| p.join(name)) {
            Some(sibling) if sibling.is_dir() => sibling,
            _ => default,
        }
    }
}

/// Create a directory and its parents; an existing directory is not an error.
fn ensure_dir(dir: &Utf8Path, label: &str) {
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!("Could not create {} directory {}: {}", label, dir, e);
    }
}
