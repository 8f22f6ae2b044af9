//! # identity_core
//!
//! Turns a partial identity signal (an email address, a phone number or a
//! person's name) into a confidence-scored report of derived candidates,
//! domain reputation, MX-based deliverability and breach-corpus membership.
//!
//! ## Features
//!
//! - **Deterministic candidate generation** from name and phone seeds
//! - **Phone normalization** to E.164 against a configurable region table
//! - **Domain reputation** for disposable and role mailboxes, plus typo hints
//! - **DNS deliverability** with bounded timeouts behind an injectable resolver
//! - **Breach correlation** against a fixed, versioned corpus behind an
//!   injectable source
//!
//! No component performs account probing or live breach queries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use identity_core::{ReconConfig, ReportAggregator, SeedSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = ReportAggregator::from_config(ReconConfig::builtin()?)?;
//!
//!     let report = aggregator
//!         .build_report(&SeedSignal::email("test.user@gmail.com"))
//!         .await;
//!     println!("confidence: {:.2}", report.confidence());
//!
//!     Ok(())
//! }
//! ```

pub mod breach;
pub mod candidates;
pub mod config;
pub mod deliverability;
pub mod disposable;
pub mod dns;
pub mod format;
pub mod heuristics;
pub mod identifier;
pub mod links;
pub mod phone;
pub mod privacy;
pub mod report;
pub mod validation_pipeline;

use thiserror::Error;

/// Errors surfaced when building a [`ReportAggregator`]
///
/// Per-seed failures never show up here: the aggregator records them as
/// report issues, and the single-operation wrappers return their component's
/// own error type.
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ReconError>;

pub use breach::{BreachCorrelator, BreachMembership, BreachRecord, BreachSource, HashBreachCorrelator};
pub use candidates::{Candidate, CandidateGenerator, CandidateSeed, NameSeed};
pub use config::ReconConfig;
pub use deliverability::{DeliverabilityResult, DeliverabilityState, DnsVerifier};
pub use disposable::{DomainClassification, DomainReputationFilter};
pub use dns::{DnsResolver, MxResolver, ResolverError};
pub use identifier::{Identifier, IdentifierKind, SeedSignal};
pub use phone::{NumberType, PhoneInfo, PhoneNormalizer};
pub use report::{ConfidenceModel, Report, ReportIssue};
pub use validation_pipeline::ReportAggregator;
