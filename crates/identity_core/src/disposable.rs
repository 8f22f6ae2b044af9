//! Domain reputation: disposable domains and role mailboxes
//!
//! Both checks are case-insensitive substring matches against configured
//! keyword lists. They are pure, offline and independent of each other.

use crate::config::{ConfigError, ProviderEntry, ReputationConfig};
use crate::heuristics::ProviderDirectory;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Offline reputation of a mail domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainClassification {
    pub domain: String,
    /// Domain matches a throwaway-mailbox keyword
    pub disposable: bool,
    /// The classified local part names a function rather than a person
    pub role_likely: bool,
    /// Display name of a well-known mailbox provider
    pub provider: Option<String>,
    /// Provider domain this one is likely a typo of
    pub suggestion: Option<String>,
}

pub struct DomainReputationFilter {
    disposable: Vec<String>,
    role_keywords: Vec<String>,
    providers: ProviderDirectory,
}

impl DomainReputationFilter {
    /// Build the filter from keyword lists
    ///
    /// # Returns
    /// * `Err(ConfigError::Empty)` when either list is empty
    pub fn new(
        reputation: &ReputationConfig,
        providers: &[ProviderEntry],
    ) -> Result<Self, ConfigError> {
        let disposable = lowercase_keywords(&reputation.disposable);
        let role_keywords = lowercase_keywords(&reputation.role_keywords);

        if disposable.is_empty() {
            return Err(ConfigError::Empty("reputation.disposable"));
        }
        if role_keywords.is_empty() {
            return Err(ConfigError::Empty("reputation.role_keywords"));
        }

        let providers = ProviderDirectory::new(providers);
        info!(
            "Reputation filter initialized with {} disposable keywords, {} role keywords and {} providers",
            disposable.len(),
            role_keywords.len(),
            providers.provider_count()
        );

        Ok(Self {
            disposable,
            role_keywords,
            providers,
        })
    }

    /// Check if a domain belongs to a throwaway-mailbox service
    pub fn is_disposable(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        let hit = self.disposable.iter().find(|k| domain.contains(k.as_str()));
        if let Some(keyword) = hit {
            debug!("Domain '{}' flagged as disposable (keyword '{}')", domain, keyword);
        }
        hit.is_some()
    }

    /// Check if a local part addresses a role rather than a person
    pub fn is_role_account(&self, local_part: &str) -> bool {
        let local = local_part.to_lowercase();
        self.role_keywords.iter().any(|k| local.contains(k.as_str()))
    }

    /// Classify a domain, optionally with the local part it was seen with
    pub fn classify(&self, domain: &str, local_part: Option<&str>) -> DomainClassification {
        let domain = domain.trim().to_lowercase();
        DomainClassification {
            disposable: self.is_disposable(&domain),
            role_likely: local_part.map_or(false, |l| self.is_role_account(l)),
            provider: self.providers.provider_name(&domain).map(str::to_string),
            suggestion: self.providers.suggest(&domain),
            domain,
        }
    }

    /// Classify a bare domain; `role_likely` is always false
    pub fn classify_domain(&self, domain: &str) -> DomainClassification {
        self.classify(domain, None)
    }
}

fn lowercase_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use pretty_assertions::assert_eq;

    fn filter() -> DomainReputationFilter {
        let config = ReconConfig::builtin().unwrap();
        DomainReputationFilter::new(&config.reputation, &config.providers).unwrap()
    }

    #[test]
    fn test_disposable_detection() {
        let f = filter();
        assert!(f.classify_domain("mailinator.com").disposable);
        assert!(f.classify_domain("mx.yopmail.net").disposable);
        assert!(!f.classify_domain("example.com").disposable);
    }

    #[test]
    fn test_gmail_is_normal() {
        let c = filter().classify_domain("gmail.com");
        assert_eq!(
            c,
            DomainClassification {
                domain: "gmail.com".to_string(),
                disposable: false,
                role_likely: false,
                provider: Some("Google".to_string()),
                suggestion: None,
            }
        );
    }

    #[test]
    fn test_case_insensitive_detection() {
        let f = filter();
        assert!(f.is_disposable("MAILINATOR.COM"));
        assert!(f.is_disposable("TempMail.Org"));
        assert!(f.is_role_account("Support"));
    }

    #[test]
    fn test_role_accounts() {
        let f = filter();
        assert!(f.classify("acme.com", Some("billing")).role_likely);
        assert!(f.classify("acme.com", Some("postmaster")).role_likely);
        assert!(!f.classify("acme.com", Some("john.smith")).role_likely);
        assert!(!f.classify("acme.com", None).role_likely);
    }

    #[test]
    fn test_checks_are_independent() {
        let c = filter().classify("mailinator.com", Some("admin"));
        assert!(c.disposable);
        assert!(c.role_likely);
    }

    #[test]
    fn test_typo_suggestion_surfaces() {
        let c = filter().classify_domain("gmai.com");
        assert_eq!(c.suggestion.as_deref(), Some("gmail.com"));
        assert_eq!(c.provider, None);
    }

    #[test]
    fn test_empty_lists_rejected() {
        let config = ReconConfig::builtin().unwrap();
        let mut reputation = config.reputation.clone();
        reputation.role_keywords.clear();
        assert!(DomainReputationFilter::new(&reputation, &config.providers).is_err());
    }
}
