//! Contact-form submissions queued in the store until someone reads them.

use chrono::{DateTime, SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;

use crate::storage::{KeyValueStore, StorageError, SUBMISSIONS_KEY};

/// Upper bound on the serialized queue.
pub const MAX_QUEUE_BYTES: usize = 200_000;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Please complete the required fields.")]
    MissingFields(Vec<&'static str>),
    #[error("submission is larger than the queue allows")]
    TooLarge,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode submissions: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Raw form input. Fields beyond the required four are kept as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub category: String,
    pub message: String,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub category: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
    pub ts: String,
}

impl Submission {
    fn from_form(form: ContactForm, at: DateTime<Utc>) -> Result<Self, SubmissionError> {
        let submission = Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            category: form.category.trim().to_string(),
            message: form.message.trim().to_string(),
            extra: form
                .extra
                .into_iter()
                .map(|(k, v)| (k, v.trim().to_string()))
                .collect(),
            ts: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        let missing: Vec<&'static str> = [
            ("name", &submission.name),
            ("email", &submission.email),
            ("category", &submission.category),
            ("message", &submission.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(submission)
        } else {
            Err(SubmissionError::MissingFields(missing))
        }
    }
}

pub struct SubmissionQueue {
    store: Arc<dyn KeyValueStore>,
}

impl SubmissionQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Queued submissions, newest first. An unreadable queue reads as empty.
    pub fn entries(&self) -> Vec<Submission> {
        let Some(raw) = self.store.get(SUBMISSIONS_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding unreadable submission queue: {}", e);
            Vec::new()
        })
    }

    pub fn submit(&self, form: ContactForm) -> Result<Submission, SubmissionError> {
        self.submit_at(form, Utc::now())
    }

    pub fn submit_at(
        &self,
        form: ContactForm,
        at: DateTime<Utc>,
    ) -> Result<Submission, SubmissionError> {
        let submission = Submission::from_form(form, at)?;

        let mut entries = self.entries();
        entries.insert(0, submission.clone());

        let mut encoded = serde_json::to_string(&entries)?;
        while encoded.len() > MAX_QUEUE_BYTES {
            if entries.len() == 1 {
                return Err(SubmissionError::TooLarge);
            }
            entries.pop();
            encoded = serde_json::to_string(&entries)?;
        }

        self.store.set(SUBMISSIONS_KEY, &encoded)?;
        info!("Queued submission from {} ({} queued)", submission.email, entries.len());
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn form(name: &str) -> ContactForm {
        ContactForm {
            name: format!("  {name} "),
            email: "dev@example.com".into(),
            category: "Partnership".into(),
            message: "Hello\n".into(),
            extra: BTreeMap::from([("telegram".to_string(), " @dev ".to_string())]),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_submit_trims_and_stamps() {
        let store = Arc::new(MemoryStore::new());
        let queue = SubmissionQueue::new(store.clone());

        let saved = queue.submit_at(form("Ada"), at(0)).unwrap();
        assert_eq!(saved.name, "Ada");
        assert_eq!(saved.message, "Hello");
        assert_eq!(saved.extra["telegram"], "@dev");
        assert_eq!(saved.ts, "2023-11-14T22:13:20.000Z");

        let raw = store.get(SUBMISSIONS_KEY).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["telegram"], "@dev");
        assert_eq!(value[0]["ts"], "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn test_newest_first() {
        let queue = SubmissionQueue::new(Arc::new(MemoryStore::new()));
        queue.submit_at(form("first"), at(0)).unwrap();
        queue.submit_at(form("second"), at(1)).unwrap();
        let names: Vec<_> = queue.entries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let store = Arc::new(MemoryStore::new());
        let queue = SubmissionQueue::new(store.clone());
        let mut incomplete = form("Ada");
        incomplete.email = "   ".into();
        incomplete.category.clear();

        match queue.submit_at(incomplete, at(0)) {
            Err(SubmissionError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["email", "category"])
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(store.get(SUBMISSIONS_KEY).is_none());
    }

    #[test]
    fn test_queue_capped_by_dropping_oldest() {
        let store = Arc::new(MemoryStore::new());
        let queue = SubmissionQueue::new(store.clone());
        let mut big = form("bulk");
        big.message = "x".repeat(60_000);

        for i in 0..5 {
            let mut entry = big.clone();
            entry.name = format!("entry{i}");
            queue.submit_at(entry, at(i)).unwrap();
        }

        let raw = store.get(SUBMISSIONS_KEY).unwrap();
        assert!(raw.len() <= MAX_QUEUE_BYTES);
        let names: Vec<_> = queue.entries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["entry4", "entry3", "entry2"]);
    }

    #[test]
    fn test_oversized_single_submission() {
        let queue = SubmissionQueue::new(Arc::new(MemoryStore::new()));
        let mut huge = form("huge");
        huge.message = "x".repeat(MAX_QUEUE_BYTES);
        assert!(matches!(
            queue.submit_at(huge, at(0)),
            Err(SubmissionError::TooLarge)
        ));
    }

    #[test]
    fn test_corrupt_queue_reads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(SUBMISSIONS_KEY, "[{\"name\":").unwrap();
        let queue = SubmissionQueue::new(store);
        assert!(queue.entries().is_empty());
        queue.submit_at(form("Ada"), at(0)).unwrap();
        assert_eq!(queue.entries().len(), 1);
    }
}
