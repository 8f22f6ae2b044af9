//! Static configuration for every component of the pipeline
//!
//! All lookup tables (disposable keywords, role keywords, provider domains,
//! phone regions, breach corpus, link templates) live here rather than in the
//! components, so real-world lists can be swapped in without touching logic.
//! The built-in defaults are embedded TOML parsed through figment.

use crate::phone::NumberType;
use chrono::NaiveDate;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULTS_TOML: &str = include_str!("../data/defaults.toml");
const DISPOSABLE_LIST: &str = include_str!("../data/disposable.txt");

/// Number of bytes in the SHA-256 digest used by the breach correlator
pub const HASH_BYTES: usize = 32;

/// Errors raised while loading or validating static configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Empty configuration table: {0}")]
    Empty(&'static str),
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Root configuration tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    pub dns: DnsConfig,
    pub phone: PhoneConfig,
    pub reputation: ReputationConfig,
    pub providers: Vec<ProviderEntry>,
    pub candidates: CandidateConfig,
    pub breach_corpus: BreachCorpusConfig,
    pub confidence: ConfidenceConfig,
    pub links: LinkConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    pub report: ReportConfig,
}

/// DNS resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Per-attempt MX lookup timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after a timed-out attempt (0 or 1)
    pub retries: u8,
    /// Resolver cache size (number of entries)
    pub cache_size: usize,
    /// Minimum TTL for positive cache entries
    pub min_ttl_secs: u64,
}

impl DnsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Phone region table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneConfig {
    /// Region used for national numbers written with a leading zero
    pub default_region: Option<String>,
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// ISO 3166 alpha-2 code, e.g. "LK"
    pub code: String,
    pub name: String,
    /// Country calling code digits without the `+`
    pub calling_code: String,
    /// Trunk prefix used in the national format
    pub national_prefix: Option<String>,
    /// Inclusive bounds on the national significant number length
    pub min_length: usize,
    pub max_length: usize,
    /// Type reported when no prefix rule matches
    #[serde(default)]
    pub fallback_type: NumberType,
    /// IANA zones covering the region
    #[serde(default)]
    pub timezones: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<PrefixRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixRule {
    pub prefix: String,
    pub number_type: NumberType,
    pub carrier: Option<String>,
}

/// Disposable and role keyword lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Case-insensitive substrings marking a throwaway mailbox domain
    #[serde(default)]
    pub disposable: Vec<String>,
    /// Case-insensitive substrings marking a role mailbox local-part
    pub role_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub domain: String,
    pub name: String,
}

/// Phone-mode candidate rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateConfig {
    /// Domains receiving the full local digit string, in order
    pub phone_providers: Vec<String>,
    /// Length of the truncated-prefix variant
    pub prefix_digits: usize,
    pub prefix_domain: String,
    /// Trailing-digit variants, in order
    pub suffix_rules: Vec<SuffixRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuffixRule {
    pub label: String,
    pub digits: usize,
    pub domain: String,
}

/// Fixed, versioned list of exposure events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachCorpusConfig {
    pub name: String,
    pub version: String,
    pub entries: Vec<BreachEntryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachEntryConfig {
    pub name: String,
    pub date: NaiveDate,
    pub record_count: u64,
    pub exposed_fields: Vec<String>,
    /// Inclusive byte ranges; entry *i* matches when hash byte *i* falls in one
    pub accept: Vec<(u8, u8)>,
}

/// Weights of the report confidence score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub format: f64,
    pub deliverability: f64,
    pub not_disposable: f64,
    pub not_role: f64,
    /// Score contributed by a term whose sub-result is missing or unknown
    pub neutral: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub profiles: Vec<LinkTemplate>,
    #[serde(default)]
    pub searches: Vec<LinkTemplate>,
    pub avatar: Option<LinkTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTemplate {
    pub platform: String,
    pub template: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Hex-encoded salt for log fingerprints; random per process when unset
    pub salt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Upper bound on the DNS phase of a single report
    pub deadline_ms: u64,
    /// Seeds processed concurrently in batch mode
    pub batch_concurrency: usize,
}

impl ReportConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl ReconConfig {
    /// Load the embedded defaults and validate them
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut config = Self::from_toml_str(DEFAULTS_TOML)?;
        config.reputation.disposable = parse_keyword_list(DISPOSABLE_LIST)?;
        config.validate()?;
        info!(
            "Built-in configuration loaded: {} disposable keywords, {} phone regions, corpus {}@{}",
            config.reputation.disposable.len(),
            config.phone.regions.len(),
            config.breach_corpus.name,
            config.breach_corpus.version
        );
        Ok(config)
    }

    /// Parse a configuration document without validating it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Figment::from(Toml::string(content))
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject empty or malformed tables before any report is built
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dns.timeout_ms == 0 {
            return Err(ConfigError::invalid("dns.timeout_ms", "must be positive"));
        }
        if self.dns.retries > 1 {
            return Err(ConfigError::invalid("dns.retries", "at most one retry is allowed"));
        }

        self.validate_phone()?;

        if self.reputation.disposable.is_empty() {
            return Err(ConfigError::Empty("reputation.disposable"));
        }
        if self.reputation.role_keywords.is_empty() {
            return Err(ConfigError::Empty("reputation.role_keywords"));
        }
        if let Some(blank) = self
            .reputation
            .disposable
            .iter()
            .chain(&self.reputation.role_keywords)
            .find(|k| k.trim().is_empty())
        {
            return Err(ConfigError::invalid("reputation", format!("blank keyword '{}'", blank)));
        }

        self.validate_candidates()?;
        self.validate_corpus()?;
        self.validate_confidence()?;

        if self.report.batch_concurrency == 0 {
            return Err(ConfigError::invalid("report.batch_concurrency", "must be positive"));
        }
        if self.report.deadline_ms == 0 {
            return Err(ConfigError::invalid("report.deadline_ms", "must be positive"));
        }
        if let Some(salt) = &self.privacy.salt {
            if hex::decode(salt).map(|b| b.is_empty()).unwrap_or(true) {
                return Err(ConfigError::invalid("privacy.salt", "must be non-empty hex"));
            }
        }

        debug!("Configuration validated");
        Ok(())
    }

    fn validate_phone(&self) -> Result<(), ConfigError> {
        if self.phone.regions.is_empty() {
            return Err(ConfigError::Empty("phone.regions"));
        }
        for region in &self.phone.regions {
            let field = format!("phone.regions.{}", region.code);
            if region.calling_code.is_empty()
                || !region.calling_code.chars().all(|c| c.is_ascii_digit())
            {
                return Err(ConfigError::invalid(field, "calling_code must be digits"));
            }
            if region.min_length == 0 || region.min_length > region.max_length {
                return Err(ConfigError::invalid(field, "inverted or empty length range"));
            }
            if let Some(rule) = region
                .prefixes
                .iter()
                .find(|r| r.prefix.is_empty() || !r.prefix.chars().all(|c| c.is_ascii_digit()))
            {
                return Err(ConfigError::invalid(
                    field,
                    format!("prefix '{}' must be digits", rule.prefix),
                ));
            }
        }
        if let Some(default) = &self.phone.default_region {
            if !self
                .phone
                .regions
                .iter()
                .any(|r| r.code.eq_ignore_ascii_case(default))
            {
                return Err(ConfigError::invalid(
                    "phone.default_region",
                    format!("'{}' is not in the region table", default),
                ));
            }
        }
        Ok(())
    }

    fn validate_candidates(&self) -> Result<(), ConfigError> {
        let candidates = &self.candidates;
        if candidates.phone_providers.is_empty() {
            return Err(ConfigError::Empty("candidates.phone_providers"));
        }
        if candidates.prefix_digits == 0 {
            return Err(ConfigError::invalid("candidates.prefix_digits", "must be positive"));
        }
        for rule in &candidates.suffix_rules {
            if !(3..=6).contains(&rule.digits) {
                return Err(ConfigError::invalid(
                    format!("candidates.suffix_rules.{}", rule.label),
                    "digits must be between 3 and 6",
                ));
            }
        }
        if self.providers.is_empty() {
            return Err(ConfigError::Empty("providers"));
        }
        Ok(())
    }

    fn validate_corpus(&self) -> Result<(), ConfigError> {
        let corpus = &self.breach_corpus;
        if corpus.entries.is_empty() {
            return Err(ConfigError::Empty("breach_corpus.entries"));
        }
        if corpus.entries.len() > HASH_BYTES {
            return Err(ConfigError::invalid(
                "breach_corpus.entries",
                format!("at most {} entries fit the digest", HASH_BYTES),
            ));
        }
        if corpus.version.trim().is_empty() {
            return Err(ConfigError::Empty("breach_corpus.version"));
        }
        for entry in &corpus.entries {
            let field = format!("breach_corpus.entries.{}", entry.name);
            if entry.accept.is_empty() {
                return Err(ConfigError::invalid(field, "acceptance set is empty"));
            }
            if let Some((lo, hi)) = entry.accept.iter().find(|(lo, hi)| lo > hi) {
                return Err(ConfigError::invalid(
                    field,
                    format!("inverted acceptance range [{}, {}]", lo, hi),
                ));
            }
        }
        Ok(())
    }

    fn validate_confidence(&self) -> Result<(), ConfigError> {
        let c = &self.confidence;
        let weights = [
            ("confidence.format", c.format),
            ("confidence.deliverability", c.deliverability),
            ("confidence.not_disposable", c.not_disposable),
            ("confidence.not_role", c.not_role),
        ];
        for (field, weight) in weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::invalid(field, "weight must be within [0, 1]"));
            }
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ConfigError::invalid(
                "confidence",
                format!("weights sum to {} instead of 1", total),
            ));
        }
        if !(c.neutral > 0.0 && c.neutral < 1.0) {
            return Err(ConfigError::invalid(
                "confidence.neutral",
                "must lie strictly between 0 and 1",
            ));
        }
        Ok(())
    }
}

/// Parse a keyword list: one entry per line, `#` comments and blanks skipped
pub fn parse_keyword_list(content: &str) -> Result<Vec<String>, ConfigError> {
    let mut keywords: Vec<String> = Vec::new();
    let mut invalid_count = 0;

    for (index, line) in content.lines().enumerate() {
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }

        if is_valid_keyword(entry) {
            let entry = entry.to_lowercase();
            if !keywords.contains(&entry) {
                keywords.push(entry);
            }
        } else {
            invalid_count += 1;
            if invalid_count <= 10 {
                warn!("Invalid keyword at line {}: '{}'", index + 1, entry);
            }
        }
    }

    if invalid_count > 10 {
        warn!("... and {} more invalid keyword entries", invalid_count - 10);
    }

    if keywords.is_empty() {
        return Err(ConfigError::Empty("keyword list"));
    }

    Ok(keywords)
}

/// Keywords are domain fragments: alphanumerics, hyphens and dots
fn is_valid_keyword(entry: &str) -> bool {
    entry.len() <= 253
        && !entry.starts_with('.')
        && entry
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_config_is_valid() {
        let config = ReconConfig::builtin().unwrap();
        assert!(config.reputation.disposable.contains(&"mailinator".to_string()));
        assert_eq!(config.breach_corpus.entries.len(), 3);
        assert_eq!(config.dns.retries, 1);
        assert_eq!(config.phone.default_region.as_deref(), Some("LK"));
    }

    #[test]
    fn test_parse_keyword_list() {
        let content = r#"
# comment
Mailinator

yopmail
yopmail
bad entry
"#;
        let keywords = parse_keyword_list(content).unwrap();
        assert_eq!(keywords, vec!["mailinator".to_string(), "yopmail".to_string()]);
    }

    #[test]
    fn test_empty_keyword_list_fails() {
        assert!(matches!(
            parse_keyword_list("# only comments\n\n"),
            Err(ConfigError::Empty(_))
        ));
    }

    #[test]
    fn test_empty_disposable_list_fails_fast() {
        let mut config = ReconConfig::builtin().unwrap();
        config.reputation.disposable.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Empty("reputation.disposable"))
        ));
    }

    #[test]
    fn test_empty_corpus_fails_fast() {
        let mut config = ReconConfig::builtin().unwrap();
        config.breach_corpus.entries.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_acceptance_range_fails() {
        let mut config = ReconConfig::builtin().unwrap();
        config.breach_corpus.entries[0].accept = vec![(200, 10)];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = ReconConfig::builtin().unwrap();
        config.confidence.format = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_neutral_must_be_strictly_inside_unit_interval() {
        let mut config = ReconConfig::builtin().unwrap();
        config.confidence.neutral = 1.0;
        assert!(config.validate().is_err());
        config.confidence.neutral = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_more_than_one_retry_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.dns.retries = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_default_region_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.phone.default_region = Some("ZZ".to_string());
        assert!(config.validate().is_err());
    }

    fn invalid_field(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_zero_dns_timeout_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.dns.timeout_ms = 0;
        assert_eq!(invalid_field(config.validate()).as_deref(), Some("dns.timeout_ms"));
    }

    #[test]
    fn test_inverted_phone_length_range_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.phone.regions[0].min_length = 12;
        config.phone.regions[0].max_length = 9;
        assert_eq!(
            invalid_field(config.validate()).as_deref(),
            Some("phone.regions.LK")
        );
    }

    #[test]
    fn test_empty_region_table_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.phone.regions.clear();
        config.phone.default_region = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Empty("phone.regions"))
        ));
    }

    #[test]
    fn test_suffix_digits_outside_range_rejected() {
        for digits in [2, 7] {
            let mut config = ReconConfig::builtin().unwrap();
            config.candidates.suffix_rules[0].digits = digits;
            let field = invalid_field(config.validate()).unwrap();
            assert!(field.starts_with("candidates.suffix_rules."));
        }

        let mut config = ReconConfig::builtin().unwrap();
        config.candidates.suffix_rules[0].digits = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_corpus_larger_than_digest_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        let entry = config.breach_corpus.entries[0].clone();
        config.breach_corpus.entries = vec![entry; HASH_BYTES + 1];
        assert_eq!(
            invalid_field(config.validate()).as_deref(),
            Some("breach_corpus.entries")
        );

        config.breach_corpus.entries.truncate(HASH_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_single_weight_outside_unit_interval_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.confidence.format = 1.5;
        assert_eq!(
            invalid_field(config.validate()).as_deref(),
            Some("confidence.format")
        );

        let mut config = ReconConfig::builtin().unwrap();
        config.confidence.not_role = -0.1;
        assert_eq!(
            invalid_field(config.validate()).as_deref(),
            Some("confidence.not_role")
        );
    }

    #[test]
    fn test_zero_batch_concurrency_rejected() {
        let mut config = ReconConfig::builtin().unwrap();
        config.report.batch_concurrency = 0;
        assert_eq!(
            invalid_field(config.validate()).as_deref(),
            Some("report.batch_concurrency")
        );
    }

    #[test]
    fn test_privacy_salt_must_be_hex() {
        let mut config = ReconConfig::builtin().unwrap();
        for bad in ["not-hex", "", "abc"] {
            config.privacy.salt = Some(bad.to_string());
            assert_eq!(
                invalid_field(config.validate()).as_deref(),
                Some("privacy.salt")
            );
        }

        config.privacy.salt = Some("00ff".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        assert!(matches!(
            ReconConfig::from_toml_str("[dns\ntimeout_ms = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
