use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{info, warn};
use psz::{ExtractedFile, NarcOptions};


/// Reads an archive from disk and extracts every file in it, decompressing it first if it is ZPR-wrapped.
pub fn unpack_file(path: &Path, options: &NarcOptions) -> Result<Vec<ExtractedFile>, Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    info!("Processing {} ({} bytes)", path.display(), data.len());

    let data = if psz::is_zpr(&data) {
        let inner = psz::decompress_zpr(&data)?;
        info!("Decompressed ZPR: {} -> {} bytes", data.len(), inner.len());
        inner
    } else {
        data
    };

    let files = match psz::ArchiveKind::detect(&data) {
        Some(psz::ArchiveKind::Narc) => psz::extract_narc_with(&data, options)?,
        _ => psz::extract_archive(&data)?,
    };

    Ok(files)
}


/// Unpacks `input` into `output_dir/<input file stem>/`, creating directories for names with paths in them. Returns the
/// directory the files were written to.
///
/// Placeholders for entries that failed to extract are written too (as empty `.error` files) so the output lines up
/// with the archive's file indices.
pub fn extract_to_dir(
    input: &Path,
    output_dir: &Path,
    options: &NarcOptions,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let files = unpack_file(input, options)?;

    let stem = input.file_stem().map_or_else(|| "archive".into(), |s| s.to_string_lossy());
    let asset_dir = output_dir.join(&*stem);
    fs::create_dir_all(&asset_dir)?;

    for file in &files {
        let out_path = asset_dir.join(safe_relative_path(&file.name));
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &file.data)?;

        match &file.error {
            Some(err) => warn!("  Failed: {} ({err})", file.name),
            None => info!("  Extracted: {} ({} bytes)", file.name, file.data.len()),
        }
    }

    info!("Extracted {} file(s) to {}", files.len(), asset_dir.display());
    Ok(asset_dir)
}


/// Counts files per extension. Files with no extension are counted under `"unknown"`.
pub fn analyze(files: &[ExtractedFile]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for file in files {
        let ext = file.extension().unwrap_or("unknown").to_owned();
        *counts.entry(ext).or_insert(0) += 1;
    }
    counts
}


/// Archive names come from untrusted data: keep only the normal components, so a name like `../../x` can't escape the
/// output directory.
fn safe_relative_path(name: &str) -> PathBuf {
    let path: PathBuf = Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    if path.as_os_str().is_empty() {
        PathBuf::from("unnamed")
    } else {
        path
    }
}
