// Copyright 2026 Picrew Archive Contributors
// SPDX-License-Identifier: Apache-2.0

//! Asset fetcher — bounded-parallel, idempotent, best-effort downloads.
//!
//! References are processed in fixed-size batches; within a batch every
//! fetch runs concurrently and the batch settles only when all members
//! resolve. A failed fetch resolves as a recorded no-op — it never aborts
//! the batch or the pipeline, so the produced tree may have gaps and the
//! manifests are built from what actually landed on disk. Each reference
//! owns a disjoint final path, which is what makes the unsynchronized
//! concurrent writes safe.

use crate::layout::ImageRef;
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed client identity; the CDN rejects requests without a matching
/// referer/origin pair.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const REFERER: &str = "https://picrew.me/";
pub const ORIGIN: &str = "https://picrew.me";

/// References in flight per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Progress callback: cumulative completed count and total, invoked once
/// per settled batch.
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// What happened to a single reference.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchOutcome {
    Downloaded,
    SkippedExisting,
    Failed { reason: String },
}

/// One reference that did not make it to disk.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFetch {
    pub url: String,
    pub path: String,
    pub reason: String,
}

/// Per-run accounting; consumed by the manifest builder so the output can
/// truthfully reflect gaps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: Vec<FailedFetch>,
}

impl FetchReport {
    /// True when every requested reference is present on disk.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// HTTP transfer engine with the fixed transport profile baked in.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    batch_size: usize,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self::with_batch_size(DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::REFERER,
            reqwest::header::HeaderValue::from_static(REFERER),
        );
        headers.insert(
            reqwest::header::ORIGIN,
            reqwest::header::HeaderValue::from_static(ORIGIN),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch the maker page itself. Unlike asset fetches this is fatal on
    /// failure and is never retried.
    pub async fn fetch_page(&self, url: &str) -> Result<String, crate::error::ScrapeError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(crate::error::ScrapeError::PageStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Download every reference under `dest_root`, in fixed-size concurrent
    /// batches. Already-present files are skipped without a request, so
    /// re-runs are safe and cheap. Never fails: per-file errors are logged,
    /// recorded in the report, and otherwise swallowed.
    pub async fn download_all(
        &self,
        refs: &[ImageRef],
        dest_root: &Path,
        progress: Option<&ProgressFn>,
    ) -> FetchReport {
        let total = refs.len();
        let mut report = FetchReport {
            total,
            ..FetchReport::default()
        };
        let mut completed = 0;

        for batch in refs.chunks(self.batch_size) {
            let outcomes = join_all(batch.iter().map(|r| self.download_one(r, dest_root))).await;

            for (image_ref, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    FetchOutcome::Downloaded => report.downloaded += 1,
                    FetchOutcome::SkippedExisting => report.skipped += 1,
                    FetchOutcome::Failed { reason } => report.failed.push(FailedFetch {
                        url: image_ref.source_url.clone(),
                        path: image_ref.relative_path.to_string_lossy().replace('\\', "/"),
                        reason,
                    }),
                }
            }

            // The only shared counter advances here, sequentially, on the
            // batch boundary — no synchronization needed.
            completed += batch.len();
            if let Some(progress) = progress {
                progress(completed, total);
            }
        }

        report
    }

    async fn download_one(&self, image_ref: &ImageRef, dest_root: &Path) -> FetchOutcome {
        let dest = dest_root.join(&image_ref.relative_path);
        if dest.exists() {
            debug!(path = %dest.display(), "already present, skipping");
            return FetchOutcome::SkippedExisting;
        }

        if let Some(parent) = dest.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(url = %image_ref.source_url, error = %e, "directory creation failed");
                return FetchOutcome::Failed {
                    reason: format!("mkdir: {e}"),
                };
            }
        }

        let response = match self.client.get(&image_ref.source_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %image_ref.source_url, error = %e, "request failed");
                return FetchOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %image_ref.source_url, status = status.as_u16(), "non-success status");
            return FetchOutcome::Failed {
                reason: format!("status {}", status.as_u16()),
            };
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(url = %image_ref.source_url, error = %e, "body read failed");
                return FetchOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if let Err(e) = tokio::fs::write(&dest, &bytes).await {
            warn!(path = %dest.display(), error = %e, "write failed");
            return FetchOutcome::Failed {
                reason: format!("write: {e}"),
            };
        }

        debug!(url = %image_ref.source_url, path = %dest.display(), "downloaded");
        FetchOutcome::Downloaded
    }
}
