//! Exposure correlation against a fixed breach corpus
//!
//! [`HashBreachCorrelator`] is a synthetic stand-in for a breach-intelligence
//! service: it queries nothing. Membership is derived from the SHA-256 of the
//! lower-cased identifier, where corpus entry *i* matches when byte *i* of the
//! digest falls inside that entry's configured acceptance ranges. A real data
//! source only has to implement [`BreachSource`].

use crate::config::{BreachCorpusConfig, ConfigError, HASH_BYTES};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BreachError {
    #[error("Breach source unavailable: {0}")]
    Unavailable(String),
}

/// One historical data-exposure event
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BreachRecord {
    pub name: String,
    pub date: NaiveDate,
    pub record_count: u64,
    pub exposed_fields: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachMembership {
    /// Lower-cased identifier the lookup was keyed on
    pub identifier: String,
    pub breaches: BTreeSet<BreachRecord>,
    /// Label of the data source, e.g. `synthetic-exposure-corpus@2024.1`
    pub source: String,
}

impl BreachMembership {
    pub fn is_exposed(&self) -> bool {
        !self.breaches.is_empty()
    }
}

/// Anything able to answer "which breaches contain this identifier"
#[async_trait]
pub trait BreachSource: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<BTreeSet<BreachRecord>, BreachError>;

    /// Human-readable label carried into every membership
    fn label(&self) -> String;
}

struct CorpusEntry {
    record: BreachRecord,
    accept: Vec<(u8, u8)>,
}

impl CorpusEntry {
    fn accepts(&self, byte: u8) -> bool {
        self.accept.iter().any(|(lo, hi)| (*lo..=*hi).contains(&byte))
    }
}

/// Deterministic placeholder correlation over a configured corpus
pub struct HashBreachCorrelator {
    label: String,
    entries: Vec<CorpusEntry>,
}

impl HashBreachCorrelator {
    pub fn new(corpus: &BreachCorpusConfig) -> Result<Self, ConfigError> {
        if corpus.entries.is_empty() {
            return Err(ConfigError::Empty("breach_corpus.entries"));
        }
        if corpus.entries.len() > HASH_BYTES {
            return Err(ConfigError::Invalid {
                field: "breach_corpus.entries".to_string(),
                reason: format!("at most {} entries fit the digest", HASH_BYTES),
            });
        }

        let entries: Vec<CorpusEntry> = corpus
            .entries
            .iter()
            .map(|entry| CorpusEntry {
                record: BreachRecord {
                    name: entry.name.clone(),
                    date: entry.date,
                    record_count: entry.record_count,
                    exposed_fields: entry.exposed_fields.iter().cloned().collect(),
                },
                accept: entry.accept.clone(),
            })
            .collect();

        let label = format!("{}@{}", corpus.name, corpus.version);
        info!("Breach corpus {} loaded with {} entries", label, entries.len());

        Ok(Self { label, entries })
    }

    fn matches(&self, identifier: &str) -> BTreeSet<BreachRecord> {
        let digest = Sha256::digest(identifier.trim().to_lowercase().as_bytes());

        self.entries
            .iter()
            .zip(digest.iter())
            .filter(|(entry, byte)| entry.accepts(**byte))
            .map(|(entry, _)| entry.record.clone())
            .collect()
    }
}

#[async_trait]
impl BreachSource for HashBreachCorrelator {
    async fn lookup(&self, identifier: &str) -> Result<BTreeSet<BreachRecord>, BreachError> {
        Ok(self.matches(identifier))
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Wraps a [`BreachSource`] and packages its answer as a membership
#[derive(Clone)]
pub struct BreachCorrelator {
    source: Arc<dyn BreachSource>,
}

impl BreachCorrelator {
    pub fn new(source: Arc<dyn BreachSource>) -> Self {
        Self { source }
    }

    pub async fn correlate_breaches(
        &self,
        identifier: &str,
    ) -> Result<BreachMembership, BreachError> {
        let key = identifier.trim().to_lowercase();
        let breaches = self.source.lookup(&key).await?;

        debug!("Correlation matched {} breach(es)", breaches.len());

        Ok(BreachMembership {
            identifier: key,
            breaches,
            source: self.source.label(),
        })
    }

    pub fn source_label(&self) -> String {
        self.source.label()
    }
}
