use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::collections::HashSet;
use std::fs;

/// Outcome of collecting the textures referenced by an OBJ material file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureCollation {
    pub copied: usize,
    pub missing: Vec<String>,
}

/// Gathers the textures an `.mtl` file references into the OBJ folder.
///
/// OBJ exports reference textures by whatever path the engine had, which
/// breaks as soon as the folder is moved. Each texture map line is resolved,
/// the file copied next to the `.mtl` and the line rewritten to the bare file
/// name.
pub struct TextureCollator {
    /// Matches texture map statements, e.g. `map_Kd textures/body.png`
    map_pattern: Regex,
}

impl TextureCollator {
    pub fn new() -> Self {
        Self {
            map_pattern: Regex::new(
                r"^(\s*)(map_Kd|map_Ks|map_Bump|map_d|map_Ka|map_Ns|map_Ke|map_refl)\s+(.+?)\s*$",
            )
            .expect("Invalid texture map regex"),
        }
    }

    /// Rewrite `mtl_path` in place so every resolvable texture lives in `obj_dir`.
    ///
    /// A missing `.mtl` is not an error (the export had no materials).
    pub fn collate(&self, obj_dir: &Utf8Path, mtl_path: &Utf8Path) -> Result<TextureCollation> {
        if !mtl_path.is_file() {
            return Ok(TextureCollation::default());
        }

        let content = fs::read_to_string(mtl_path)
            .with_context(|| format!("Failed to read MTL: {}", mtl_path))?;

        let mut result = TextureCollation::default();
        let mut used_names = HashSet::new();
        let mut lines = Vec::new();

        for line in content.lines() {
            let Some(caps) = self.map_pattern.captures(line) else {
                lines.push(line.to_string());
                continue;
            };

            let indent = &caps[1];
            let key = &caps[2];
            let raw = &caps[3];

            let Some(source) = resolve_texture(raw, obj_dir) else {
                tracing::warn!("Texture not found for {}: {}", key, raw);
                result.missing.push(raw.to_string());
                lines.push(line.to_string());
                continue;
            };

            let file_name = unique_name(
                source.file_name().unwrap_or("texture.png"),
                &mut used_names,
            );
            let dest = obj_dir.join(&file_name);

            if !same_file(&source, &dest) {
                match fs::copy(&source, &dest) {
                    Ok(_) => {
                        result.copied += 1;
                        tracing::debug!("Copied texture: {}", file_name);
                    }
                    Err(e) => {
                        tracing::warn!("Could not copy texture '{}': {}", source, e);
                        result.missing.push(raw.to_string());
                        lines.push(line.to_string());
                        continue;
                    }
                }
            }

            lines.push(format!("{}{} {}", indent, key, file_name));
        }

        let mut rewritten = lines.join("\n");
        if content.ends_with('\n') {
            rewritten.push('\n');
        }
        fs::write(mtl_path, rewritten)
            .with_context(|| format!("Failed to rewrite MTL: {}", mtl_path))?;

        Ok(result)
    }
}

impl Default for TextureCollator {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute paths are used as is, relative paths resolve against the OBJ folder.
fn resolve_texture(raw: &str, obj_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let normalized = raw.replace('\\', "/");
    let path = Utf8PathBuf::from(&normalized);

    let candidate = if path.is_absolute() {
        path
    } else {
        obj_dir.join(path)
    };

    candidate.is_file().then_some(candidate)
}

/// `name`, or `stem__N.ext` when `name` was already taken in this file.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let path = Utf8Path::new(name);
    let stem = path.file_stem().unwrap_or(name);
    let ext = path.extension().map(|e| format!(".{}", e)).unwrap_or_default();

    let mut index = 1;
    loop {
        let candidate = format!("{}__{}{}", stem, index, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

fn same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (a.canonicalize_utf8(), b.canonicalize_utf8()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Image files directly in `dir` (or below it when `recursive`), sorted.
pub fn list_texture_files(dir: &Utf8Path, recursive: bool) -> Vec<String> {
    const EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "tga", "tif", "tiff", "exr"];

    let Ok(entries) = dir.read_dir_utf8() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            let is_image = path
                .extension()
                .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
            if is_image {
                found.push(entry.file_name().to_string());
            }
        } else if recursive && path.is_dir() {
            for nested in list_texture_files(path, true) {
                found.push(format!("{}/{}", entry.file_name(), nested));
            }
        }
    }

    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dirs() -> (TempDir, Utf8PathBuf, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let obj_dir = root.join("Alice_obj");
        let tex_dir = root.join("textures");
        fs::create_dir_all(&obj_dir).unwrap();
        fs::create_dir_all(&tex_dir).unwrap();
        (temp_dir, obj_dir, tex_dir)
    }

    #[test]
    fn test_collate_copies_and_rewrites() {
        let (_temp, obj_dir, tex_dir) = temp_dirs();
        fs::write(tex_dir.join("body.png"), b"png").unwrap();
        fs::write(tex_dir.join("hair.png"), b"png").unwrap();

        let mtl = obj_dir.join("Alice.mtl");
        fs::write(
            &mtl,
            format!(
                "newmtl Body\nKd 1 1 1\nmap_Kd {}\nmap_Bump ../textures/hair.png\nmap_d missing.png\n",
                tex_dir.join("body.png")
            ),
        )
        .unwrap();

        let result = TextureCollator::new().collate(&obj_dir, &mtl).unwrap();

        assert_eq!(result.copied, 2);
        assert_eq!(result.missing, vec!["missing.png".to_string()]);
        assert!(obj_dir.join("body.png").is_file());
        assert!(obj_dir.join("hair.png").is_file());

        let rewritten = fs::read_to_string(&mtl).unwrap();
        assert!(rewritten.contains("map_Kd body.png\n"));
        assert!(rewritten.contains("map_Bump hair.png\n"));
        assert!(rewritten.contains("map_d missing.png\n"));
        assert!(rewritten.contains("Kd 1 1 1\n"));
    }

    #[test]
    fn test_collate_renames_colliding_textures() {
        let (_temp, obj_dir, tex_dir) = temp_dirs();
        let other = tex_dir.join("other");
        fs::create_dir_all(&other).unwrap();
        fs::write(tex_dir.join("skin.png"), b"a").unwrap();
        fs::write(other.join("skin.png"), b"b").unwrap();

        let mtl = obj_dir.join("Alice.mtl");
        fs::write(
            &mtl,
            format!(
                "map_Kd {}\nmap_Ks {}\n",
                tex_dir.join("skin.png"),
                other.join("skin.png")
            ),
        )
        .unwrap();

        let result = TextureCollator::new().collate(&obj_dir, &mtl).unwrap();

        assert_eq!(result.copied, 2);
        let rewritten = fs::read_to_string(&mtl).unwrap();
        assert!(rewritten.contains("map_Kd skin.png"));
        assert!(rewritten.contains("map_Ks skin__1.png"));
        assert_eq!(fs::read(obj_dir.join("skin__1.png")).unwrap(), b"b");
    }

    #[test]
    fn test_collate_texture_already_in_folder() {
        let (_temp, obj_dir, _tex_dir) = temp_dirs();
        fs::write(obj_dir.join("face.png"), b"png").unwrap();
        let mtl = obj_dir.join("Alice.mtl");
        fs::write(&mtl, "map_Kd face.png\n").unwrap();

        let result = TextureCollator::new().collate(&obj_dir, &mtl).unwrap();

        assert_eq!(result.copied, 0);
        assert!(result.missing.is_empty());
        assert_eq!(fs::read_to_string(&mtl).unwrap(), "map_Kd face.png\n");
    }

    #[test]
    fn test_collate_without_mtl() {
        let (_temp, obj_dir, _tex_dir) = temp_dirs();
        let result = TextureCollator::new()
            .collate(&obj_dir, &obj_dir.join("none.mtl"))
            .unwrap();
        assert_eq!(result, TextureCollation::default());
    }

    #[test]
    fn test_list_texture_files() {
        let (_temp, obj_dir, _tex_dir) = temp_dirs();
        fs::write(obj_dir.join("b.PNG"), b"x").unwrap();
        fs::write(obj_dir.join("a.jpg"), b"x").unwrap();
        fs::write(obj_dir.join("model.obj"), b"x").unwrap();
        fs::create_dir_all(obj_dir.join("sub")).unwrap();
        fs::write(obj_dir.join("sub").join("c.tga"), b"x").unwrap();

        assert_eq!(list_texture_files(&obj_dir, false), vec!["a.jpg", "b.PNG"]);
        assert_eq!(
            list_texture_files(&obj_dir, true),
            vec!["a.jpg", "b.PNG", "sub/c.tga"]
        );
    }
}
