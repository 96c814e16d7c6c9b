//! Manifest builder — the three descriptive documents plus the gap report.
//!
//! `p_config.json` mirrors the filtered, renumbered part/layer structure for
//! viewer compatibility. `assets.json` is reconstructed by scanning the maker
//! directory on disk — not re-derived from state — so it reflects exactly
//! what was written, gaps included. `separated_layers.json` lists the folders
//! where one logical item spans several sequential file ids.
//! `incomplete.json` appears only when at least one fetch failed.
//!
//! Every document is written temp-then-rename; a storage failure surfaces as
//! [`PersistenceError`] and leaves no partial manifest behind.

use crate::error::PersistenceError;
use crate::fetch::FetchReport;
use crate::filter::ActiveSet;
use crate::layout::{Layout, MultiLayerGroup};
use crate::state::{LayerId, MakerConfig, PaletteId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const CONFIG_FILE: &str = "p_config.json";
pub const ASSETS_FILE: &str = "assets.json";
pub const SEPARATED_FILE: &str = "separated_layers.json";
pub const INCOMPLETE_FILE: &str = "incomplete.json";

/// One `<X>-<Y>` folder in the directory-content manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFolder {
    pub folder: String,
    pub x: u32,
    pub y: u32,
    pub colors: Vec<ColorBucket>,
}

/// One color subfolder (or the loose-file `default` bucket) and its
/// numerically sorted filenames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBucket {
    pub code: String,
    pub items: Vec<String>,
}

/// The remapped configuration: active parts only, active layers renumbered
/// to their X ranks, palettes reduced to those an active part references.
pub fn remapped_config(active: &ActiveSet, config: &MakerConfig, layout: &Layout) -> MakerConfig {
    let declared: HashSet<&LayerId> = active.parts.iter().flat_map(|p| &p.layer_ids).collect();
    let layer_order = config
        .layer_order
        .iter()
        .filter(|(layer_id, z)| declared.contains(*layer_id) && layout.x_ranks.contains_key(*z))
        .map(|(layer_id, z)| (layer_id.clone(), i64::from(layout.x_ranks[z])))
        .collect();

    let referenced: HashSet<&PaletteId> = active
        .parts
        .iter()
        .filter_map(|p| p.palette_id.as_ref())
        .collect();
    let color_palettes = config
        .color_palettes
        .iter()
        .filter(|(palette_id, _)| referenced.contains(palette_id))
        .map(|(palette_id, entries)| (palette_id.clone(), entries.clone()))
        .collect();

    MakerConfig {
        parts: active.parts.clone(),
        layer_order,
        color_palettes,
    }
}

/// Write the remapped configuration to `p_config.json`.
pub fn write_config(maker_dir: &Path, config: &MakerConfig) -> Result<(), PersistenceError> {
    write_json_atomic(&maker_dir.join(CONFIG_FILE), config)
}

/// Write `separated_layers.json`: the distinct folders appearing in any
/// multi-layer group, sorted lexicographically.
pub fn write_separated_layers(
    maker_dir: &Path,
    groups: &[MultiLayerGroup],
) -> Result<(), PersistenceError> {
    let mut folders: Vec<&str> = groups.iter().map(|g| g.folder.as_str()).collect();
    folders.sort_unstable();
    folders.dedup();
    write_json_atomic(&maker_dir.join(SEPARATED_FILE), &folders)
}

/// Scan the maker directory and enumerate its `<X>-<Y>` folders exactly as
/// they exist on disk.
pub fn scan_assets(maker_dir: &Path) -> Result<Vec<AssetFolder>, PersistenceError> {
    let folder_re = Regex::new(r"^(\d+)-(\d+)$").expect("valid regex");

    let mut folders: Vec<(u32, u32, String)> = Vec::new();
    for entry in std::fs::read_dir(maker_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = folder_re.captures(&name) {
            let x = caps[1].parse().unwrap_or(0);
            let y = caps[2].parse().unwrap_or(0);
            folders.push((x, y, name));
        }
    }
    folders.sort();

    let mut assets = Vec::new();
    for (x, y, name) in folders {
        let folder_path = maker_dir.join(&name);
        let mut colors = Vec::new();

        let mut loose_items = Vec::new();
        let mut subdirs = Vec::new();
        for entry in std::fs::read_dir(&folder_path)? {
            let entry = entry?;
            let entry_name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                subdirs.push(entry_name);
            } else if is_image_name(&entry_name) && !is_thumbnail(&entry_name) {
                loose_items.push(entry_name);
            }
        }

        // Flattened files directly under <X>-<Y> count as the single
        // uncategorized color.
        if !loose_items.is_empty() {
            loose_items.sort_by_key(|n| numeric_prefix(n));
            colors.push(ColorBucket {
                code: crate::layout::DEFAULT_COLOR_FOLDER.to_owned(),
                items: loose_items,
            });
        }

        subdirs.sort();
        for sub in subdirs {
            let mut items: Vec<String> = std::fs::read_dir(folder_path.join(&sub))?
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| is_image_name(n))
                .collect();
            if items.is_empty() {
                continue;
            }
            items.sort_by_key(|n| numeric_prefix(n));
            colors.push(ColorBucket { code: sub, items });
        }

        assets.push(AssetFolder {
            folder: name,
            x,
            y,
            colors,
        });
    }

    Ok(assets)
}

/// Scan the maker directory and write the result to `assets.json`.
pub fn write_assets(maker_dir: &Path) -> Result<Vec<AssetFolder>, PersistenceError> {
    let assets = scan_assets(maker_dir)?;
    write_json_atomic(&maker_dir.join(ASSETS_FILE), &assets)?;
    Ok(assets)
}

/// Record fetch gaps in `incomplete.json`. Nothing is written for a clean
/// run — absence of the file means a complete tree.
pub fn write_incomplete(maker_dir: &Path, report: &FetchReport) -> Result<(), PersistenceError> {
    if report.is_complete() {
        return Ok(());
    }
    write_json_atomic(&maker_dir.join(INCOMPLETE_FILE), report)
}

fn is_image_name(name: &str) -> bool {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp)$")
        .expect("valid regex")
        .is_match(name)
}

fn is_thumbnail(name: &str) -> bool {
    name.split('.').next() == Some(crate::layout::THUMBNAIL_STEM)
}

fn numeric_prefix(name: &str) -> u32 {
    name.split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
