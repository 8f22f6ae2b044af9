//! Deliverability estimate from MX records
//!
//! One or more resolved exchangers make delivery `Likely`. Every other
//! outcome (no records, NXDOMAIN, resolver failure, timeout after the retry)
//! is `Unknown`: the verifier never claims a mailbox is undeliverable.

use crate::dns::{MxResolver, ResolverError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliverabilityState {
    Likely,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverabilityResult {
    pub domain: String,
    pub state: DeliverabilityState,
    /// Exchange hostnames in resolver order; empty unless `Likely`
    pub mx_hosts: Vec<String>,
}

impl DeliverabilityResult {
    pub fn unknown(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            state: DeliverabilityState::Unknown,
            mx_hosts: Vec::new(),
        }
    }

    pub fn is_likely(&self) -> bool {
        self.state == DeliverabilityState::Likely
    }
}

/// Result plus the reason it ended up `Unknown`, for report bookkeeping
#[derive(Debug, Clone)]
pub struct DeliverabilityCheck {
    pub result: DeliverabilityResult,
    pub attempts: u8,
    /// Set when the lookup failed rather than answered
    pub failure: Option<ResolverError>,
}

pub struct DnsVerifier {
    resolver: Arc<dyn MxResolver>,
    timeout: Duration,
    retries: u8,
}

impl DnsVerifier {
    /// # Arguments
    /// * `resolver` - MX lookup capability
    /// * `timeout` - Bound on each attempt
    /// * `retries` - Extra attempts after a timeout, capped at one
    pub fn new(resolver: Arc<dyn MxResolver>, timeout: Duration, retries: u8) -> Self {
        Self {
            resolver,
            timeout,
            retries: retries.min(1),
        }
    }

    /// Estimate whether `domain` accepts mail
    pub async fn check_deliverability(&self, domain: &str) -> DeliverabilityResult {
        self.verify(domain).await.result
    }

    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn verify(&self, domain: &str) -> DeliverabilityCheck {
        let domain = domain.trim().to_lowercase();
        let mut attempts: u8 = 0;

        loop {
            attempts += 1;
            let outcome = match tokio::time::timeout(
                self.timeout,
                self.resolver.resolve_mx(&domain, self.timeout),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ResolverError::Timeout),
            };

            match outcome {
                Ok(hosts) if !hosts.is_empty() => {
                    debug!("Domain {} has {} MX host(s)", domain, hosts.len());
                    return DeliverabilityCheck {
                        result: DeliverabilityResult {
                            domain,
                            state: DeliverabilityState::Likely,
                            mx_hosts: hosts,
                        },
                        attempts,
                        failure: None,
                    };
                }
                Ok(_) => {
                    debug!("Domain {} answered without MX records", domain);
                    return DeliverabilityCheck {
                        result: DeliverabilityResult::unknown(domain),
                        attempts,
                        failure: None,
                    };
                }
                Err(ResolverError::Timeout) if attempts <= self.retries => {
                    warn!("MX lookup for {} timed out, retrying", domain);
                }
                Err(e) => {
                    warn!("MX lookup for {} gave up after {} attempt(s): {}", domain, attempts, e);
                    return DeliverabilityCheck {
                        result: DeliverabilityResult::unknown(domain),
                        attempts,
                        failure: Some(e),
                    };
                }
            }
        }
    }
}
