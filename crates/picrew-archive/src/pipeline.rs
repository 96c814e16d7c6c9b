//! Pipeline driver — extract, filter, map, persist, fetch.
//!
//! One scrape is a straight line: page markup → state → active set →
//! layout → manifests + downloads. The fetcher and the manifest builder
//! both consume the same mapped reference list; `assets.json` is written
//! *after* the downloads settle so it describes the tree that actually
//! exists.

use crate::error::{PersistenceError, ScrapeResult};
use crate::fetch::{Fetcher, ProgressFn};
use crate::{extract, filter, layout, manifest};
use std::path::{Path, PathBuf};
use tracing::info;

/// Page url template for bare numeric maker ids.
const MAKER_URL_BASE: &str = "https://picrew.me/en/image_maker";

/// What a scrape input resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeTarget {
    /// Fetch the page over HTTP.
    Url(String),
    /// Read a previously saved copy of the page.
    File(PathBuf),
}

/// Resolve a user-supplied input: an `http(s)` url passes through, a bare
/// numeric id becomes the maker page url, anything else is a local path.
pub fn resolve_target(input: &str) -> ScrapeTarget {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        ScrapeTarget::Url(input.to_owned())
    } else if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        ScrapeTarget::Url(format!("{MAKER_URL_BASE}/{input}"))
    } else {
        ScrapeTarget::File(PathBuf::from(input))
    }
}

/// Terminal result of a successful scrape.
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// `<dest_root>/Maker_<id>`, with all manifests written and all
    /// attempted downloads settled.
    pub maker_dir: PathBuf,
    pub maker_id: String,
    pub report: crate::fetch::FetchReport,
}

/// The whole pipeline behind one call.
#[derive(Clone, Default)]
pub struct Scraper {
    fetcher: Fetcher,
}

impl Scraper {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new(),
        }
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            fetcher: Fetcher::with_batch_size(batch_size),
        }
    }

    /// Run one scrape into `dest_root`. The progress callback, if any, is
    /// forwarded to the fetcher (cumulative per-batch counts).
    pub async fn scrape(
        &self,
        input: &str,
        dest_root: &Path,
        progress: Option<&ProgressFn>,
    ) -> ScrapeResult<ScrapeOutcome> {
        let html = match resolve_target(input) {
            ScrapeTarget::Url(url) => {
                info!(%url, "fetching maker page");
                self.fetcher.fetch_page(&url).await?
            }
            ScrapeTarget::File(path) => {
                info!(path = %path.display(), "reading saved maker page");
                std::fs::read_to_string(&path).map_err(PersistenceError::from)?
            }
        };

        let state = extract::extract_state(&html)?;
        let maker_id = state.maker_id().to_owned();
        let maker_folder = format!("Maker_{maker_id}");
        let maker_dir = dest_root.join(&maker_folder);
        std::fs::create_dir_all(&maker_dir).map_err(PersistenceError::from)?;

        let active = filter::active_set(&state);
        let mapped = layout::build(&state, &active, &maker_folder);
        info!(
            %maker_id,
            parts = active.parts.len(),
            folders = mapped.coordinates.len(),
            references = mapped.refs.len(),
            "layout mapped"
        );

        let config = manifest::remapped_config(&active, &state.config, &mapped);
        manifest::write_config(&maker_dir, &config)?;
        manifest::write_separated_layers(&maker_dir, &mapped.groups)?;

        let report = self
            .fetcher
            .download_all(&mapped.refs, dest_root, progress)
            .await;

        manifest::write_assets(&maker_dir)?;
        manifest::write_incomplete(&maker_dir, &report)?;

        info!(
            %maker_id,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed.len(),
            "scrape settled"
        );

        Ok(ScrapeOutcome {
            maker_dir,
            maker_id,
            report,
        })
    }
}
