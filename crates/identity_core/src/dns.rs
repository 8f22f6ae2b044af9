//! MX resolution behind an injectable capability
//!
//! The verifier only talks to [`MxResolver`]; production code plugs in the
//! hickory-backed [`DnsResolver`], tests plug in deterministic stubs.

use crate::config::DnsConfig;
use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    proto::op::ResponseCode,
    AsyncResolver, TokioAsyncResolver,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("DNS lookup timed out")]
    Timeout,
    #[error("DNS lookup failed: {0}")]
    Failure(String),
}

/// Resolves the mail exchangers of a domain
#[async_trait]
pub trait MxResolver: Send + Sync {
    /// Exchange hostnames ordered by preference; an empty list means the
    /// domain answered without MX records
    async fn resolve_mx(&self, domain: &str, timeout: Duration)
        -> Result<Vec<String>, ResolverError>;
}

/// hickory-resolver wrapper
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Create a resolver against Cloudflare's public DNS
    ///
    /// Retries are left to the caller, so the resolver makes one attempt per
    /// query.
    pub fn new(config: &DnsConfig) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout();
        opts.attempts = 1;
        opts.cache_size = config.cache_size;
        opts.positive_min_ttl = Some(Duration::from_secs(config.min_ttl_secs));
        opts.negative_min_ttl = Some(Duration::from_secs(30));

        let resolver = AsyncResolver::tokio(ResolverConfig::cloudflare(), opts);

        info!(
            "DNS resolver initialized - timeout: {}ms, cache_size: {}",
            config.timeout_ms, config.cache_size
        );

        Self { resolver }
    }

    pub fn clear_cache(&self) {
        self.resolver.clear_cache();
        info!("DNS cache cleared");
    }
}

#[async_trait]
impl MxResolver for DnsResolver {
    async fn resolve_mx(
        &self,
        domain: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, ResolverError> {
        debug!("Querying MX records for domain: {}", domain);

        let lookup = match tokio::time::timeout(timeout, self.resolver.mx_lookup(domain)).await {
            Ok(result) => result,
            Err(_) => return Err(ResolverError::Timeout),
        };

        match lookup {
            Ok(response) => {
                let mut records: Vec<(u16, String)> = response
                    .iter()
                    .map(|mx| {
                        let host = mx.exchange().to_utf8();
                        (mx.preference(), host.trim_end_matches('.').to_string())
                    })
                    .collect();
                records.sort();

                debug!("Domain {} has {} MX record(s)", domain, records.len());
                Ok(records.into_iter().map(|(_, host)| host).collect())
            }
            Err(e) => {
                debug!("MX record lookup failed for {}: {}", domain, e);
                lookup_error(e.kind())
            }
        }
    }
}

/// Map a hickory failure; only a NOERROR answer without MX records is an
/// empty success, NXDOMAIN is a failure
fn lookup_error(kind: &ResolveErrorKind) -> Result<Vec<String>, ResolverError> {
    match kind {
        ResolveErrorKind::Timeout => Err(ResolverError::Timeout),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NoError,
            ..
        } => Ok(Vec::new()),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain,
            ..
        } => Err(ResolverError::Failure("NXDOMAIN".to_string())),
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            Err(ResolverError::Failure(response_code.to_string()))
        }
        other => Err(ResolverError::Failure(other.to_string())),
    }
}
