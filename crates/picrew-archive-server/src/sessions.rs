//! In-memory progress sessions for the scrape/poll surface.
//!
//! One session per accepted scrape request, polled by the dashboard until
//! it reaches a terminal state. Sessions are never evicted — the store
//! lives as long as the process, which is the original tool's contract.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Lifecycle of one scrape request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Starting,
    Downloading,
    Zipping,
    Completed,
    Error,
}

/// Poll payload for one session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub status: SessionStatus,
    pub progress: usize,
    pub total: usize,
    #[serde(rename = "downloadUrl", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Count of references that failed to download, when not zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
}

impl Session {
    fn starting() -> Self {
        Self {
            status: SessionStatus::Starting,
            progress: 0,
            total: 0,
            download_url: None,
            message: None,
            failed: None,
        }
    }
}

/// Shared session registry. Cheap to clone; all clones see the same map.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session in `starting` state and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.inner
            .write()
            .expect("session lock poisoned")
            .insert(id.clone(), Session::starting());
        id
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .get(id)
            .cloned()
    }

    /// Apply a mutation to one session; unknown ids are ignored.
    pub fn update(&self, id: &str, apply: impl FnOnce(&mut Session)) {
        if let Some(session) = self
            .inner
            .write()
            .expect("session lock poisoned")
            .get_mut(id)
        {
            apply(session);
        }
    }
}
