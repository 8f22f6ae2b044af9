//! Syntactic email grammar check
//!
//! Local part: one or more of `[A-Za-z0-9._%+-]`. Domain: dot-separated labels
//! of `[A-Za-z0-9-]`, the last of which is a 2 to 24 letter TLD. No network access.

use thiserror::Error;

const TLD_MIN: usize = 2;
const TLD_MAX: usize = 24;

/// Reason an address was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing '@' separator")]
    MissingAt,
    #[error("empty local part")]
    EmptyLocalPart,
    #[error("invalid character '{0}' in local part")]
    InvalidLocalChar(char),
    #[error("domain has no top-level label")]
    MissingTld,
    #[error("empty domain label")]
    EmptyLabel,
    #[error("invalid character '{0}' in domain")]
    InvalidDomainChar(char),
    #[error("top-level label '{0}' must be 2-24 letters")]
    InvalidTld(String),
}

/// An address that passed the grammar, split at the `@`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailParts<'a> {
    pub local: &'a str,
    pub domain: &'a str,
}

/// Check `raw` against the grammar and split it on success
pub fn parse_email(raw: &str) -> Result<EmailParts<'_>, FormatError> {
    let (local, domain) = raw.split_once('@').ok_or(FormatError::MissingAt)?;

    if local.is_empty() {
        return Err(FormatError::EmptyLocalPart);
    }
    if let Some(c) = local
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '%' | '+' | '-')))
    {
        return Err(FormatError::InvalidLocalChar(c));
    }

    validate_domain(domain)?;

    Ok(EmailParts { local, domain })
}

/// Check a bare domain against the domain half of the grammar
pub fn validate_domain(domain: &str) -> Result<(), FormatError> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(FormatError::MissingTld);
    }
    for label in &labels {
        if label.is_empty() {
            return Err(FormatError::EmptyLabel);
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(FormatError::InvalidDomainChar(c));
        }
    }

    let tld = labels[labels.len() - 1];
    if !(TLD_MIN..=TLD_MAX).contains(&tld.len()) || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(FormatError::InvalidTld(tld.to_string()));
    }

    Ok(())
}

/// Grammar check returning the failure reason
pub fn validate_email_format(raw: &str) -> Result<(), FormatError> {
    parse_email(raw).map(|_| ())
}

/// Boolean form of [`validate_email_format`]
pub fn is_valid_email(raw: &str) -> bool {
    validate_email_format(raw).is_ok()
}
