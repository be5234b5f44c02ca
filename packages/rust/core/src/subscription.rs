//! Newsletter subscription store.
//!
//! Validates and deduplicates email addresses against a persisted list kept
//! in a [`KeyValueStore`] under a single collection key.
//!
//! Invariants:
//! - no two entries share the same `email` (exact, case-sensitive match)
//! - entries are only ever appended, in submission order
//! - the in-memory list changes only after the store accepted the new list
//! - deduplication runs against the persisted list, not the snapshot taken at
//!   load, so separate handles on one database never drop each other's entries

use std::sync::LazyLock;

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use powerni_shared::{PowerniError, SubscriptionEntry};
use powerni_storage::KeyValueStore;

/// Shown after a successful submission.
pub const SUCCESS_MESSAGE: &str = "Successfully subscribed to the newsletter!";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// Why a submission was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Please enter a valid email address")]
    InvalidFormat,

    #[error("This email is already subscribed")]
    DuplicateEmail,

    #[error("subscription store error: {0}")]
    Persistence(String),
}

impl From<PowerniError> for SubscriptionError {
    fn from(e: PowerniError) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl SubscriptionError {
    /// Text suitable for showing next to the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(_) => "An error occurred. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

/// `local@domain.tld` shape, ASCII only.
pub fn is_valid_email(candidate: &str) -> bool {
    candidate.is_ascii() && EMAIL_RE.is_match(candidate)
}

/// Validation and deduplication without touching any store.
pub fn check_submission(
    candidate: &str,
    existing: &[SubscriptionEntry],
) -> Result<(), SubscriptionError> {
    if !is_valid_email(candidate) {
        return Err(SubscriptionError::InvalidFormat);
    }
    if existing.iter().any(|entry| entry.email == candidate) {
        return Err(SubscriptionError::DuplicateEmail);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SubscriptionStore
// ---------------------------------------------------------------------------

/// The subscription list plus the store it is persisted in.
pub struct SubscriptionStore<S> {
    store: S,
    key: String,
    entries: Mutex<Vec<SubscriptionEntry>>,
}

impl<S: KeyValueStore> SubscriptionStore<S> {
    /// Read the persisted list under `key`. A key that was never written
    /// yields an empty list.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn load(store: S, key: &str) -> Result<Self, SubscriptionError> {
        let entries: Vec<SubscriptionEntry> = store
            .load(key)
            .await?
            .unwrap_or_default();

        debug!(count = entries.len(), "subscriptions loaded");

        Ok(Self {
            store,
            key: key.to_string(),
            entries: Mutex::new(entries),
        })
    }

    /// Snapshot of the current entries, in submission order.
    pub async fn entries(&self) -> Vec<SubscriptionEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Validate, deduplicate, append and persist `candidate`.
    ///
    /// Returns the updated list. The persisted list is re-read, checked and
    /// rewritten in one store `update` cycle while the local lock is held.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        candidate: &str,
    ) -> Result<Vec<SubscriptionEntry>, SubscriptionError> {
        if !is_valid_email(candidate) {
            debug!("rejected malformed email");
            return Err(SubscriptionError::InvalidFormat);
        }

        let mut entries = self.entries.lock().await;
        let outcome = self
            .store
            .update_list(
                &self.key,
                |mut current: Vec<SubscriptionEntry>| -> Result<
                    (Vec<SubscriptionEntry>, Vec<SubscriptionEntry>),
                    SubscriptionError,
                > {
                    check_submission(candidate, &current)?;
                    current.push(SubscriptionEntry {
                        email: candidate.to_string(),
                        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    });
                    let updated = current.clone();
                    Ok((current, updated))
                },
            )
            .await;

        match outcome {
            Ok(updated) => {
                *entries = updated.clone();
                info!(count = updated.len(), "subscription added");
                Ok(updated)
            }
            Err(SubscriptionError::Persistence(detail)) => {
                warn!(error = %detail, "failed to persist subscription list");
                Err(SubscriptionError::Persistence(detail))
            }
            Err(e) => Err(e),
        }
    }
}
