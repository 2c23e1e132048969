use crate::models::ExportFormat;
use crate::services::processor::{ExportOutcome, FileReport};
use crate::services::textures::list_texture_files;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt::Write as _;
use std::fs;

/// Path of the export report for a model: `<output>/<base>_export_report.txt`
pub fn report_path(output_dir: &Utf8Path, base_name: &str) -> Utf8PathBuf {
    output_dir.join(format!("{}_export_report.txt", base_name))
}

/// Render the plain text report for one processed file.
pub fn render(report: &FileReport, output_dir: &Utf8Path) -> String {
    let mut text = String::new();
    let base = &report.file.base_name;

    let _ = writeln!(text, "Export report: {}", report.file.file_name);
    let _ = writeln!(text, "========================================");
    let _ = writeln!(text, "Source: {}", report.file.path);
    let _ = writeln!(text, "Output directory: {}", output_dir);
    for format in [ExportFormat::Dae, ExportFormat::Obj] {
        if let Some(dir) = format.asset_dir(output_dir, base) {
            let _ = writeln!(text, "{} directory: {}", format, dir);
        }
    }
    match report.strategy {
        Some(kind) => {
            let _ = writeln!(text, "Strategy: {}", kind);
        }
        None => {
            let _ = writeln!(text, "Strategy: none");
        }
    }
    let _ = writeln!(text, "Outcome: {}", report.outcome);
    let _ = writeln!(text);

    let _ = writeln!(text, "Formats:");
    for (format, outcome) in &report.exports {
        match outcome {
            ExportOutcome::Written { path, bytes } => {
                let _ = writeln!(text, "  {}: SUCCESS {} ({} bytes)", format, path, bytes);
            }
            ExportOutcome::Failed { reason } => {
                let _ = writeln!(text, "  {}: FAILED {}", format, reason);
            }
        }
    }

    for format in [ExportFormat::Dae, ExportFormat::Obj] {
        let Some(dir) = format.asset_dir(output_dir, base) else {
            continue;
        };
        if !report.exports.contains_key(&format) {
            continue;
        }
        let textures = list_texture_files(&dir, true);
        let _ = writeln!(text);
        let _ = writeln!(text, "{} textures ({}):", format, textures.len());
        for name in textures {
            let _ = writeln!(text, "  {}", name);
        }
    }

    let warnings = report.all_warnings();
    if !warnings.is_empty() {
        let _ = writeln!(text);
        let _ = writeln!(text, "Warnings:");
        for warning in warnings {
            let _ = writeln!(text, "  - {}", warning);
        }
    }

    text
}

/// Write the report next to the exports. Failure is only logged.
pub fn write(report: &FileReport, output_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let path = report_path(output_dir, &report.file.base_name);
    match fs::write(&path, render(report, output_dir)) {
        Ok(()) => {
            tracing::debug!("Export report written: {}", path);
            Some(path)
        }
        Err(e) => {
            tracing::warn!("Could not write export report {}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversionOutcome, InputFile, StrategyKind};
    use indexmap::IndexMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_report(output: &Utf8Path) -> FileReport {
        let mut exports = IndexMap::new();
        exports.insert(
            ExportFormat::Fbx,
            ExportOutcome::Written {
                path: output.join("Alice.fbx"),
                bytes: 42,
            },
        );
        exports.insert(
            ExportFormat::Obj,
            ExportOutcome::Failed {
                reason: "OBJ export failed: boom".to_string(),
            },
        );

        FileReport {
            file: InputFile::new(Utf8PathBuf::from("/in/Alice.vrm")),
            outcome: ConversionOutcome::FallbackSuccess,
            strategy: Some(StrategyKind::Fallback),
            exports,
            strategy_errors: vec!["rich: Rigging unavailable: headless".to_string()],
            textures: None,
            warnings: vec!["texture missing: hair.png".to_string()],
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_render_lists_formats_and_warnings() {
        let output = Utf8Path::new("/out");
        let text = render(&sample_report(output), output);

        assert!(text.contains("Export report: Alice.vrm"));
        assert!(text.contains("Strategy: fallback"));
        assert!(text.contains("FBX: SUCCESS /out/Alice.fbx (42 bytes)"));
        assert!(text.contains("OBJ: FAILED OBJ export failed: boom"));
        assert!(text.contains("OBJ textures (0):"));
        assert!(!text.contains("DAE textures"));
        assert!(text.contains("  - texture missing: hair.png"));
        assert!(text.contains("  - rich: Rigging unavailable: headless"));
    }

    #[test]
    fn test_write_report_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let path = write(&sample_report(&output), &output).unwrap();

        assert_eq!(path, output.join("Alice_export_report.txt"));
        assert!(fs::read_to_string(path).unwrap().contains("FBX: SUCCESS"));
    }

    #[test]
    fn test_write_report_missing_dir_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let output = Utf8PathBuf::try_from(temp_dir.path().join("missing")).unwrap();
        assert!(write(&sample_report(&output), &output).is_none());
    }
}
