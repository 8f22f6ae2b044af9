//! Provider directory and typo suggestions
//!
//! Compares a domain's first label against the configured mailbox providers
//! using Levenshtein distance, so `gmai.com` is reported with the suggestion
//! `gmail.com`.

use crate::config::ProviderEntry;
use textdistance::str::levenshtein;
use tracing::debug;

/// Well-known mailbox providers keyed by domain
pub struct ProviderDirectory {
    providers: Vec<ProviderEntry>,
}

impl ProviderDirectory {
    pub fn new(providers: &[ProviderEntry]) -> Self {
        let providers: Vec<ProviderEntry> = providers
            .iter()
            .map(|p| ProviderEntry {
                domain: p.domain.trim().to_lowercase(),
                name: p.name.clone(),
            })
            .collect();

        debug!("Provider directory initialized with {} providers", providers.len());
        Self { providers }
    }

    /// Display name of the provider hosting `domain`, if known
    pub fn provider_name(&self, domain: &str) -> Option<&str> {
        let domain = domain.to_lowercase();
        self.providers
            .iter()
            .find(|p| p.domain == domain)
            .map(|p| p.name.as_str())
    }

    /// Check if a domain might be a typo of a known provider
    ///
    /// # Returns
    /// * `Some(domain)` of the provider the input most likely meant
    /// * `None` for exact provider domains and anything not close enough
    pub fn suggest(&self, domain: &str) -> Option<String> {
        let domain = domain.to_lowercase();
        if self.providers.iter().any(|p| p.domain == domain) {
            return None;
        }

        let (label, rest) = domain.split_once('.')?;

        for provider in &self.providers {
            let Some((provider_label, provider_rest)) = provider.domain.split_once('.') else {
                continue;
            };
            if provider_rest != rest {
                continue;
            }

            let distance = levenshtein(label, provider_label);

            // One edit for short names, up to two for longer ones
            let is_typo = if provider_label.len() <= 6 {
                distance == 1
            } else {
                distance > 0 && distance <= 2
            };

            if is_typo {
                debug!(
                    "Potential typo detected: {} -> {} (distance: {})",
                    domain, provider.domain, distance
                );
                return Some(provider.domain.clone());
            }
        }

        None
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}
