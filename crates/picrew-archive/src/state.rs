//! Typed data model for the decoded maker state.
//!
//! The wire shape mixes identifier spellings freely: declared ids are JSON
//! numbers (`itmId: 712`), while the image trees key the *same* ids as object
//! keys, which are always strings. Every id therefore lives in a distinct
//! string newtype whose deserializer accepts both forms, so `itmId` and a
//! `commonImages` key compare equal without ad-hoc `to_string()` calls —
//! and so an `ItemId` can never be handed to something expecting a `LayerId`.
//!
//! Iteration order is load-bearing: Y-axis assignment walks parts and items
//! in declaration order, so parts/items are vectors and every map is an
//! [`IndexMap`] fed from an order-preserving JSON value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct IdVisitor;

                impl serde::de::Visitor<'_> for IdVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        f.write_str("a string or numeric id")
                    }

                    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<$name, E> {
                        Ok($name(v.to_owned()))
                    }

                    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<$name, E> {
                        Ok($name(v.to_string()))
                    }

                    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<$name, E> {
                        Ok($name(v.to_string()))
                    }

                    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<$name, E> {
                        // Ids are integral in practice; keep "7" over "7.0".
                        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                            Ok($name((v as i64).to_string()))
                        } else {
                            Ok($name(v.to_string()))
                        }
                    }
                }

                deserializer.deserialize_any(IdVisitor)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a selectable item within a part.
    ItemId
);
id_newtype!(
    /// Identifier of a z-ordered drawing plane.
    LayerId
);
id_newtype!(
    /// Identifier of a palette color variant.
    ColorId
);
id_newtype!(
    /// Identifier of a color palette.
    PaletteId
);
id_newtype!(
    /// Identifier of a selectable part.
    PartId
);

/// One image slot in an image tree. Many declared slots carry no url at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageCell {
    #[serde(default)]
    pub url: Option<String>,
}

impl ImageCell {
    /// True when the slot holds a real, non-empty image reference.
    pub fn has_url(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// item → layer → color → image slot. Sparse on every level.
pub type ImageTree = IndexMap<ItemId, IndexMap<LayerId, IndexMap<ColorId, ImageCell>>>;

/// One selectable option within a part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "itmId")]
    pub id: ItemId,
}

/// A selectable category of the composed image ("hair", "eyes", ...).
///
/// Declared independent of whether any item under it has an image; the
/// active-set filter prunes the empty ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "pId")]
    pub id: PartId,

    #[serde(default)]
    pub items: Vec<Item>,

    /// Declared drawing planes, in declaration order.
    #[serde(rename = "lyrs", default)]
    pub layer_ids: Vec<LayerId>,

    #[serde(rename = "thumbUrl", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    #[serde(rename = "cpId", default, skip_serializing_if = "Option::is_none")]
    pub palette_id: Option<PaletteId>,
}

/// One entry of a color palette; `cd` is the `#rrggbb` code used to rename
/// numeric color ids into human-readable folder names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorEntry {
    #[serde(rename = "cId")]
    pub color_id: ColorId,

    #[serde(rename = "cd", default, skip_serializing_if = "Option::is_none")]
    pub hex_code: Option<String>,
}

/// The maker's declared configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MakerConfig {
    #[serde(rename = "pList", default)]
    pub parts: Vec<Part>,

    /// layer id → raw z-order value. Z-orders are distinct by construction.
    #[serde(rename = "lyrList", default)]
    pub layer_order: IndexMap<LayerId, i64>,

    /// palette id → palette entries.
    #[serde(rename = "cpList", default)]
    pub color_palettes: IndexMap<PaletteId, Vec<ColorEntry>>,
}

/// The decoded state blob. Produced once per scrape and immutable after;
/// everything downstream is a pure function of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawState {
    #[serde(
        rename = "imageMakerId",
        default,
        deserialize_with = "de_string_or_number"
    )]
    pub image_maker_id: Option<String>,

    #[serde(default)]
    pub config: MakerConfig,

    #[serde(rename = "commonImages", default)]
    pub common_images: ImageTree,

    #[serde(rename = "memberImages", default)]
    pub member_images: ImageTree,
}

impl RawState {
    /// The maker id, or `"unknown"` when the blob omits it.
    pub fn maker_id(&self) -> &str {
        self.image_maker_id.as_deref().unwrap_or("unknown")
    }

    /// Both image trees, in the fixed traversal order (common first).
    pub fn image_trees(&self) -> [&ImageTree; 2] {
        [&self.common_images, &self.member_images]
    }
}

fn de_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        I(i64),
        F(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::S(s) => s,
        Raw::I(i) => i.to_string(),
        Raw::F(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (f as i64).to_string()
            } else {
                f.to_string()
            }
        }
    }))
}
