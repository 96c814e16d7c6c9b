//! Background execution of one accepted scrape request.
//!
//! Drives the core pipeline with a progress hook wired into the session
//! store, zips the finished maker directory, and settles the session into
//! `completed` or `error`. The in-flight work directory is removed once
//! the archive exists.

use crate::archive;
use crate::routes::AppState;
use crate::sessions::SessionStatus;
use std::sync::Arc;
use tracing::{error, info};

pub async fn run(state: Arc<AppState>, session_id: String, input: String) {
    let sessions = state.sessions.clone();
    let work_root = state.work_dir.join(&session_id);

    let progress = {
        let sessions = sessions.clone();
        let session_id = session_id.clone();
        move |done: usize, total: usize| {
            sessions.update(&session_id, |s| {
                s.status = SessionStatus::Downloading;
                s.progress = done;
                s.total = total;
            });
        }
    };

    let result = state
        .scraper
        .scrape(&input, &work_root, Some(&progress))
        .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(session = %session_id, error = %e, "scrape failed");
            sessions.update(&session_id, |s| {
                s.status = SessionStatus::Error;
                s.message = Some(e.to_string());
            });
            let _ = std::fs::remove_dir_all(&work_root);
            return;
        }
    };

    sessions.update(&session_id, |s| s.status = SessionStatus::Zipping);

    let zip_name = format!("Maker_{}_{}.zip", outcome.maker_id, session_id);
    let zip_path = state.downloads_dir.join(&zip_name);
    let maker_dir = outcome.maker_dir.clone();
    let zipped = tokio::task::spawn_blocking(move || archive::zip_directory(&maker_dir, &zip_path))
        .await
        .unwrap_or_else(|join_err| Err(anyhow::anyhow!("archive task panicked: {join_err}")));

    match zipped {
        Ok(()) => {
            let _ = std::fs::remove_dir_all(&work_root);
            let failed = outcome.report.failed.len();
            info!(
                session = %session_id,
                maker_id = %outcome.maker_id,
                downloaded = outcome.report.downloaded,
                failed,
                "scrape completed"
            );
            sessions.update(&session_id, |s| {
                s.status = SessionStatus::Completed;
                s.download_url = Some(format!("/downloads/{zip_name}"));
                if failed > 0 {
                    s.failed = Some(failed);
                }
            });
        }
        Err(e) => {
            error!(session = %session_id, error = %e, "archiving failed");
            sessions.update(&session_id, |s| {
                s.status = SessionStatus::Error;
                s.message = Some(format!("archiving failed: {e}"));
            });
        }
    }
}
