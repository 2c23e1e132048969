use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output formats written for every converted avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Fbx,
    Glb,
    Dae,
    Obj,
}

impl ExportFormat {
    /// Default export order; FBX first as the primary format.
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Fbx,
        ExportFormat::Glb,
        ExportFormat::Dae,
        ExportFormat::Obj,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Fbx => "fbx",
            ExportFormat::Glb => "glb",
            ExportFormat::Dae => "dae",
            ExportFormat::Obj => "obj",
        }
    }

    /// Formats that write textures or material files next to the model.
    ///
    /// FBX embeds its textures and GLB packs them into the binary, so those
    /// two are written directly into the output directory.
    pub fn has_auxiliary_assets(self) -> bool {
        matches!(self, ExportFormat::Dae | ExportFormat::Obj)
    }

    /// Destination of this format's export for a model.
    ///
    /// - `<output>/<base>.<ext>` for self-contained formats
    /// - `<output>/<base>_<format>/<base>.<ext>` for formats with auxiliary assets
    pub fn destination(self, output_dir: &Utf8Path, base_name: &str) -> Utf8PathBuf {
        let file_name = format!("{}.{}", base_name, self.extension());
        match self.asset_dir(output_dir, base_name) {
            Some(dir) => dir.join(file_name),
            None => output_dir.join(file_name),
        }
    }

    /// Per-model subfolder for formats with auxiliary assets.
    pub fn asset_dir(self, output_dir: &Utf8Path, base_name: &str) -> Option<Utf8PathBuf> {
        if self.has_auxiliary_assets() {
            Some(output_dir.join(format!("{}_{}", base_name, self.extension())))
        } else {
            None
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_uppercase())
    }
}
