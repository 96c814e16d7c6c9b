// Copyright 2026 Picrew Archive Contributors
// SPDX-License-Identifier: Apache-2.0

//! picrew-archive — turn one image-maker page into a clean on-disk asset tree.
//!
//! The pipeline: locate and decode the `window.__NUXT__` state blob embedded
//! in the page markup, prune everything that carries no actual image, map the
//! survivors onto a dense `<X>-<Y>/<color>/<n>.<ext>` folder scheme, then
//! write manifests and fetch the files. Each stage is a pure function of the
//! previous one; only the fetcher and the manifest writer touch the world.

pub mod error;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod layout;
pub mod literal;
pub mod manifest;
pub mod pipeline;
pub mod state;

pub use error::{ExtractionError, PersistenceError, ScrapeError, ScrapeResult};
pub use extract::extract_state;
pub use fetch::{FailedFetch, FetchReport, Fetcher, ProgressFn, DEFAULT_BATCH_SIZE};
pub use filter::{active_set, ActiveSet};
pub use layout::{FolderCoordinate, ImageRef, Layout, MultiLayerGroup};
pub use pipeline::{ScrapeOutcome, ScrapeTarget, Scraper};
pub use state::{ColorEntry, ColorId, ImageTree, Item, ItemId, LayerId, MakerConfig, PaletteId, Part, PartId, RawState};
