//! Layout mapper — collapse the sparse state onto a dense folder scheme.
//!
//! Every active (part, layer) pair becomes one `<X>-<Y>` folder: X is the
//! 1-based rank of the layer's z-order among *active* z-orders, Y a global
//! counter walked over parts and their declared layers in declaration
//! order. Within a folder, items are numbered by first observation, and the
//! number is shared by every color variant of the same (item, layer) —
//! color is a sibling folder, not a numbering axis. An image-tree layer the
//! owning part never declared collapses into the part's first folder, which
//! is how one item comes to span several file ids there (a multi-layer
//! group).

use crate::filter::ActiveSet;
use crate::state::{ColorId, ItemId, LayerId, MakerConfig, Part, PartId, RawState};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Base for site-relative image urls.
pub const CDN_BASE: &str = "https://cdn.picrew.me";

/// Folder name for an item's single uncategorized color.
pub const DEFAULT_COLOR_FOLDER: &str = "default";

/// File stem for part thumbnails (`nav.<ext>`).
pub const THUMBNAIL_STEM: &str = "nav";

/// X rank given to the synthetic layer of a part that declares no layers;
/// such a part has no z-order of its own, so its one folder sits at the
/// bottom rank.
const SYNTHETIC_X: u32 = 1;

/// The two-axis address of one output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderCoordinate {
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for FolderCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.x, self.y)
    }
}

/// The atomic download unit: one remote url and its unique local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub source_url: String,
    /// Always `<makerFolder>/<X>-<Y>/<colorFolder>/<seq>.<ext>` or
    /// `<makerFolder>/<X>-<Y>/nav.<ext>`.
    pub relative_path: PathBuf,
}

/// One logical item+color that spans more than one sequential file id
/// within a single folder.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MultiLayerGroup {
    pub folder: String,
    /// 1-based position of the item among its part's active items.
    pub item_index: usize,
    pub color_id: ColorId,
    pub file_ids: Vec<u32>,
}

/// A (part, layer) slot owning one folder coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerSlot {
    Declared(LayerId),
    /// Stand-in for a part that declares no layers at all.
    Synthetic,
}

/// Everything the mapper derives; a pure function of the filtered state.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// All downloads, thumbnails first, then items in traversal order.
    pub refs: Vec<ImageRef>,
    /// Folders where one item+color spans multiple file ids.
    pub groups: Vec<MultiLayerGroup>,
    /// Raw z-order → dense 1-based X rank.
    pub x_ranks: BTreeMap<i64, u32>,
    /// (part, layer slot) → folder coordinate, in Y-assignment order.
    pub coordinates: IndexMap<(PartId, LayerSlot), FolderCoordinate>,
}

/// Map the active set onto folder coordinates, file numbers, and download
/// references. Pure computation over already-validated data; no errors.
pub fn build(state: &RawState, active: &ActiveSet, maker_folder: &str) -> Layout {
    let config = &state.config;

    // X axis: rank the z-orders reachable from active parts' declared layers.
    let mut x_ranks: BTreeMap<i64, u32> = BTreeMap::new();
    for part in &active.parts {
        for layer_id in &part.layer_ids {
            if let Some(z) = config.layer_order.get(layer_id) {
                x_ranks.insert(*z, 0);
            }
        }
    }
    let mut rank = 0;
    for x in x_ranks.values_mut() {
        rank += 1;
        *x = rank;
    }

    // Y axis: one folder per (part, declared layer), declaration order,
    // global counter. A part with no z-mapped layers gets one synthetic slot.
    let mut coordinates: IndexMap<(PartId, LayerSlot), FolderCoordinate> = IndexMap::new();
    let mut part_first: IndexMap<PartId, FolderCoordinate> = IndexMap::new();
    let mut y_counter = 0;
    for part in &active.parts {
        let declared: Vec<&LayerId> = part
            .layer_ids
            .iter()
            .filter(|l| config.layer_order.contains_key(*l))
            .collect();

        if declared.is_empty() {
            y_counter += 1;
            let coord = FolderCoordinate {
                x: SYNTHETIC_X,
                y: y_counter,
            };
            coordinates.insert((part.id.clone(), LayerSlot::Synthetic), coord);
            part_first.entry(part.id.clone()).or_insert(coord);
        } else {
            for layer_id in declared {
                y_counter += 1;
                let coord = FolderCoordinate {
                    x: x_ranks[&config.layer_order[layer_id]],
                    y: y_counter,
                };
                coordinates.insert(
                    (part.id.clone(), LayerSlot::Declared(layer_id.clone())),
                    coord,
                );
                part_first.entry(part.id.clone()).or_insert(coord);
            }
        }
    }

    let mut refs = Vec::new();
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();

    // Thumbnails: one nav.<ext> in every folder the owning part received.
    for part in &active.parts {
        let Some(thumb) = part.thumbnail_url.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        let source_url = resolve_url(thumb);
        let ext = extension_for(&source_url);
        for ((part_id, _), coord) in &coordinates {
            if *part_id != part.id {
                continue;
            }
            let path = Path::new(maker_folder)
                .join(coord.to_string())
                .join(format!("{THUMBNAIL_STEM}.{ext}"));
            if seen_paths.insert(path.clone()) {
                refs.push(ImageRef {
                    source_url: source_url.clone(),
                    relative_path: path,
                });
            }
        }
    }

    // Item images: per-folder sequential numbering, first observation wins,
    // shared across color variants of the same (item, layer).
    let mut folder_next: HashMap<FolderCoordinate, u32> = HashMap::new();
    let mut folder_seq: HashMap<(FolderCoordinate, ItemId, LayerId), u32> = HashMap::new();
    let mut merge_files: IndexMap<(FolderCoordinate, ItemId, ColorId), (usize, Vec<u32>)> =
        IndexMap::new();

    for part in &active.parts {
        for (item_pos, item) in part.items.iter().enumerate() {
            let item_index = item_pos + 1;
            for tree in state.image_trees() {
                let Some(layers) = tree.get(&item.id) else {
                    continue;
                };
                for (layer_id, colors) in layers {
                    let key = (part.id.clone(), LayerSlot::Declared(layer_id.clone()));
                    let Some(coord) = coordinates
                        .get(&key)
                        .or_else(|| part_first.get(&part.id))
                        .copied()
                    else {
                        continue;
                    };

                    let populated = colors.values().filter(|c| c.has_url()).count();
                    for (color_id, cell) in colors {
                        let Some(url) = cell.url.as_deref().filter(|u| !u.is_empty()) else {
                            continue;
                        };

                        let seq = *folder_seq
                            .entry((coord, item.id.clone(), layer_id.clone()))
                            .or_insert_with(|| {
                                let next = folder_next.entry(coord).or_insert(0);
                                *next += 1;
                                *next
                            });

                        let source_url = resolve_url(url);
                        let ext = extension_for(&source_url);
                        let color_folder = color_folder_name(part, populated, color_id, config);
                        let path = Path::new(maker_folder)
                            .join(coord.to_string())
                            .join(&color_folder)
                            .join(format!("{seq}.{ext}"));

                        if seen_paths.insert(path.clone()) {
                            refs.push(ImageRef {
                                source_url,
                                relative_path: path,
                            });
                        }

                        let (_, file_ids) = merge_files
                            .entry((coord, item.id.clone(), color_id.clone()))
                            .or_insert_with(|| (item_index, Vec::new()));
                        if !file_ids.contains(&seq) {
                            file_ids.push(seq);
                        }
                    }
                }
            }
        }
    }

    let groups = merge_files
        .into_iter()
        .filter(|(_, (_, file_ids))| file_ids.len() >= 2)
        .map(|((coord, _, color_id), (item_index, file_ids))| MultiLayerGroup {
            folder: coord.to_string(),
            item_index,
            color_id,
            file_ids,
        })
        .collect();

    Layout {
        refs,
        groups,
        x_ranks,
        coordinates,
    }
}

/// Resolve a blob url against the site CDN. Absolute urls pass through.
pub(crate) fn resolve_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_owned();
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{rest}");
    }
    match url::Url::parse(CDN_BASE).and_then(|base| base.join(raw)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => format!("{CDN_BASE}/{}", raw.trim_start_matches('/')),
    }
}

/// File extension from a url, query string tolerated; `png` when unclear.
pub(crate) fn extension_for(url: &str) -> String {
    let re = Regex::new(r"(?i)\.(png|jpe?g|gif|webp)(\?|$)").expect("valid regex");
    re.captures(url)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_else(|| "png".to_owned())
}

/// Folder name for one color variant: palette hex with the `#` stripped
/// when the owning part's palette knows the id; `default` for a single
/// uncategorized color; the raw color id otherwise.
fn color_folder_name(
    part: &Part,
    populated_colors: usize,
    color_id: &ColorId,
    config: &MakerConfig,
) -> String {
    let palette_hex = part
        .palette_id
        .as_ref()
        .and_then(|pid| config.color_palettes.get(pid))
        .and_then(|palette| palette.iter().find(|e| e.color_id == *color_id))
        .and_then(|entry| entry.hex_code.as_deref());

    match palette_hex {
        Some(hex) => hex.trim_start_matches('#').to_owned(),
        None if populated_colors == 1 => DEFAULT_COLOR_FOLDER.to_owned(),
        None => color_id.to_string(),
    }
}
