//! Zip the finished maker directory into a single downloadable artifact.
//!
//! The core guarantees the directory is complete (manifests written, all
//! attempted downloads settled) before this runs.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Compress `src_dir` into `zip_path`. Entries are rooted at the source
/// directory's own name, so unpacking yields `Maker_<id>/...`.
pub fn zip_directory(src_dir: &Path, zip_path: &Path) -> Result<()> {
    let root_name = src_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_owned());

    let file = File::create(zip_path)
        .with_context(|| format!("creating {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(src_dir).into_iter().filter_map(|e| e.ok()) {
        let rel = entry.path().strip_prefix(src_dir)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = format!("{root_name}/{}", rel.to_string_lossy().replace('\\', "/"));

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut src = File::open(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            io::copy(&mut src, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}
