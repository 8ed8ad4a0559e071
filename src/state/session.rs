//! Persisted edit sessions, one per image id.
//!
//! A session is stored under `editSession:{id}` as the JSON object
//! `{url, width, height, blur, greyscale}`. Saving replaces the whole
//! object; loading anything that does not parse yields no session.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::edit::{EditError, EditParams};
use super::store::{KeyValueStore, StoreError};

const SESSION_KEY_PREFIX: &str = "editSession:";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid edit parameters: {0}")]
    Invalid(#[from] EditError),
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub image_id: String,
    pub params: EditParams,
    pub derived_url: Option<String>,
}

/// On-disk layout of a session
#[derive(Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    url: Option<String>,
    #[serde(flatten)]
    params: EditParams,
}

pub struct EditSessionStore {
    store: Rc<dyn KeyValueStore>,
}

impl EditSessionStore {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(image_id: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{image_id}")
    }

    /// Load the session for `image_id`, or None if there is none or it is unreadable
    pub fn load(&self, image_id: &str) -> Option<EditSession> {
        let payload = match self.store.get(&Self::key(image_id)) {
            Ok(payload) => payload?,
            Err(err) => {
                tracing::warn!(%err, image_id, "failed to read edit session");
                return None;
            }
        };

        let stored: StoredSession = match serde_json::from_str(&payload) {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(%err, image_id, "discarding malformed edit session");
                return None;
            }
        };

        let params = stored.params;
        if let Err(err) = params.validate() {
            tracing::warn!(%err, image_id, "discarding out-of-range edit session");
            return None;
        }

        Some(EditSession {
            image_id: image_id.to_string(),
            params,
            derived_url: stored.url,
        })
    }

    /// Persist the full session for `image_id`, replacing any earlier one
    pub fn save(
        &self,
        image_id: &str,
        params: &EditParams,
        derived_url: Option<&str>,
    ) -> Result<(), SessionError> {
        params.validate()?;

        let stored = StoredSession {
            url: derived_url.map(str::to_string),
            params: *params,
        };
        let payload = serde_json::to_string(&stored)?;
        self.store.set(&Self::key(image_id), &payload)?;

        tracing::debug!(image_id, ?params, "edit session saved");
        Ok(())
    }

    /// Ids of every image with a persisted session
    pub fn image_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(SESSION_KEY_PREFIX).map(str::to_string))
            .collect())
    }
}
