//! Report aggregation over every component of the pipeline
//!
//! A seed is normalized, expanded into candidates, its domains are classified
//! and checked for MX records under one deadline, and the seed identifier is
//! correlated against the breach source. Failures along the way become report
//! issues; `build_report` always returns a complete [`Report`].

use crate::{
    breach::{BreachCorrelator, BreachError, BreachMembership, BreachSource, HashBreachCorrelator},
    candidates::{Candidate, CandidateGenerator, CandidateSeed, NameSeed},
    config::ReconConfig,
    deliverability::{DeliverabilityCheck, DeliverabilityResult, DnsVerifier},
    disposable::{DomainClassification, DomainReputationFilter},
    dns::{DnsResolver, MxResolver, ResolverError},
    format::{self, FormatError},
    identifier::SeedSignal,
    links::LinkBuilder,
    phone::{PhoneError, PhoneInfo, PhoneNormalizer},
    privacy::PrivacyProcessor,
    report::{ConfidenceModel, Report, ReportDraft, ReportIssue},
};
use futures::stream::{self, FuturesUnordered, Stream, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn, Span};

/// Assembles one immutable report per seed signal
pub struct ReportAggregator {
    config: ReconConfig,
    phone_normalizer: PhoneNormalizer,
    reputation: DomainReputationFilter,
    verifier: DnsVerifier,
    generator: CandidateGenerator,
    correlator: BreachCorrelator,
    links: LinkBuilder,
    confidence: ConfidenceModel,
    privacy: PrivacyProcessor,
}

impl ReportAggregator {
    /// Create an aggregator with injected DNS and breach capabilities
    ///
    /// # Returns
    /// * `Err(ReconError::Config)` if the static configuration is empty or
    ///   malformed; nothing is built in that case
    pub fn new(
        config: ReconConfig,
        resolver: Arc<dyn MxResolver>,
        breach_source: Arc<dyn BreachSource>,
    ) -> crate::Result<Self> {
        info!("Initializing report aggregator");

        config.validate()?;

        let reputation = DomainReputationFilter::new(&config.reputation, &config.providers)?;
        let privacy = PrivacyProcessor::from_config(&config.privacy)?;
        let verifier = DnsVerifier::new(resolver, config.dns.timeout(), config.dns.retries);

        let aggregator = Self {
            phone_normalizer: PhoneNormalizer::new(&config.phone),
            reputation,
            verifier,
            generator: CandidateGenerator::new(&config.candidates),
            correlator: BreachCorrelator::new(breach_source),
            links: LinkBuilder::new(&config.links),
            confidence: ConfidenceModel::new(&config.confidence),
            privacy,
            config,
        };

        info!(
            "Report aggregator initialized (breach source: {}, deadline: {}ms)",
            aggregator.correlator.source_label(),
            aggregator.config.report.deadline_ms
        );
        Ok(aggregator)
    }

    /// Create an aggregator backed by the live resolver and the synthetic corpus
    pub fn from_config(config: ReconConfig) -> crate::Result<Self> {
        let resolver = Arc::new(DnsResolver::new(&config.dns));
        let breach_source = Arc::new(HashBreachCorrelator::new(&config.breach_corpus)?);
        Self::new(config, resolver, breach_source)
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn normalize_phone(
        &self,
        raw: &str,
        default_region: Option<&str>,
    ) -> Result<PhoneInfo, PhoneError> {
        self.phone_normalizer.normalize(raw, default_region)
    }

    pub fn validate_email_format(&self, raw: &str) -> Result<(), FormatError> {
        format::validate_email_format(raw)
    }

    pub fn generate_candidates(&self, seed: &CandidateSeed) -> Vec<Candidate> {
        self.generator.generate_candidates(seed)
    }

    pub fn classify_domain(&self, domain: &str) -> DomainClassification {
        self.reputation.classify_domain(domain)
    }

    pub async fn check_deliverability(&self, domain: &str) -> DeliverabilityResult {
        self.verifier.check_deliverability(domain).await
    }

    pub async fn correlate_breaches(&self, identifier: &str) -> Result<BreachMembership, BreachError> {
        self.correlator.correlate_breaches(identifier).await
    }

    /// Build the report for one seed signal
    ///
    /// Never fails: invalid seeds, resolver problems, an expired deadline and
    /// breach-source errors are recorded in [`Report::issues`].
    #[instrument(skip_all, fields(kind = %seed.kind(), seed = tracing::field::Empty))]
    pub async fn build_report(&self, seed: &SeedSignal) -> Report {
        let identifier = seed.identifier();
        Span::current().record("seed", self.privacy.fingerprint(&identifier.normalized).as_str());

        debug!("Starting report build");

        // Step 1: Normalize the seed and expand it into candidates
        let mut draft = ReportDraft::new(identifier);
        let mut local_part: Option<String> = None;
        match seed {
            SeedSignal::Email { raw } => self.expand_email(raw, &mut draft, &mut local_part),
            SeedSignal::Phone { raw, region } => self.expand_phone(raw, region.as_deref(), &mut draft),
            SeedSignal::Name { full_name, domain } => {
                self.expand_name(full_name, domain.as_deref(), &mut draft)
            }
        }

        // Step 2: Classify the seed domain and every candidate domain
        let domains = domains_to_check(draft.seed_domain.as_deref(), &draft.candidates);
        for domain in &domains {
            let local = if draft.seed_domain.as_deref() == Some(domain.as_str()) {
                local_part.as_deref()
            } else {
                None
            };
            draft
                .classifications
                .insert(domain.clone(), self.reputation.classify(domain, local));
        }

        // Step 3: MX lookups under the report deadline, alongside breach correlation
        let breach_key = draft.seed.normalized.clone();
        let (resolved, breaches) = tokio::join!(
            self.resolve_domains(&domains),
            self.correlator.correlate_breaches(&breach_key)
        );

        let (deliverability, dns_issues) = resolved;
        draft.deliverability = deliverability;
        draft.issues.extend(dns_issues);

        match breaches {
            Ok(membership) => {
                if membership.is_exposed() {
                    debug!("Seed appears in {} breach(es)", membership.breaches.len());
                }
                draft.breaches = Some(membership);
            }
            Err(e) => {
                warn!("Breach correlation failed: {}", e);
                draft.issue("breaches", e.to_string());
            }
        }

        // Step 4: Unverified links
        let avatar_email = match seed {
            SeedSignal::Email { .. } if draft.seed_valid => Some(draft.seed.normalized.clone()),
            _ => None,
        };
        draft.links = self.links.build(&draft.usernames, &draft.seed.normalized, avatar_email.as_deref());

        // Step 5: Seal and score
        let report = draft.finish(&self.confidence);

        info!(
            "Report built: valid={}, candidates={}, domains={}, issues={}, confidence={:.3}",
            report.seed_valid(),
            report.candidates().len(),
            report.deliverability().len(),
            report.issues().len(),
            report.confidence()
        );
        report
    }

    /// Reports for independent seeds, yielded in input order as they complete
    ///
    /// Up to `report.batch_concurrency` pipelines run at once.
    pub fn report_stream<'a>(
        &'a self,
        seeds: &'a [SeedSignal],
    ) -> impl Stream<Item = Report> + 'a {
        stream::iter(seeds)
            .map(move |seed| self.build_report(seed))
            .buffered(self.config.report.batch_concurrency)
    }

    /// Build reports for independent seeds, returned in input order
    pub async fn build_batch(&self, seeds: &[SeedSignal]) -> Vec<Report> {
        info!(
            "Building {} report(s) with concurrency {}",
            seeds.len(),
            self.config.report.batch_concurrency
        );
        self.report_stream(seeds).collect().await
    }

    fn expand_email(&self, raw: &str, draft: &mut ReportDraft, local_part: &mut Option<String>) {
        let normalized = draft.seed.normalized.clone();
        match format::parse_email(&normalized) {
            Ok(parts) => {
                draft.seed_valid = true;
                draft.seed_domain = Some(parts.domain.to_string());
                draft.usernames = vec![parts.local.to_string()];
                *local_part = Some(parts.local.to_string());
            }
            Err(e) => {
                debug!("Email seed rejected (length {}): {}", raw.len(), e);
                draft.issue("seed", format!("InvalidFormat: {}", e));
            }
        }
    }

    fn expand_phone(&self, raw: &str, region: Option<&str>, draft: &mut ReportDraft) {
        match self.phone_normalizer.normalize(raw, region) {
            Ok(info) => {
                draft.seed = info.identifier();
                draft.seed_valid = true;
                draft.candidates = self
                    .generator
                    .generate_candidates(&CandidateSeed::Phone(info.clone()));
                draft.phone = Some(info);
            }
            Err(e) => {
                debug!("Phone seed rejected: {}", e);
                let reason = match e {
                    PhoneError::InvalidPhoneFormat(msg) => format!("InvalidPhoneFormat: {}", msg),
                    PhoneError::UnsupportedRegion(msg) => format!("UnsupportedRegion: {}", msg),
                };
                draft.issue("seed", reason);
            }
        }
    }

    fn expand_name(&self, full_name: &str, domain: Option<&str>, draft: &mut ReportDraft) {
        let domain = domain.map(|d| d.trim().to_lowercase()).filter(|d| !d.is_empty());

        let valid_domain = match domain {
            Some(d) => match format::validate_domain(&d) {
                Ok(()) => Some(d),
                Err(e) => {
                    draft.issue("seed_domain", format!("InvalidFormat: {}", e));
                    None
                }
            },
            None => None,
        };

        let name = NameSeed::from_full_name(full_name, valid_domain.as_deref().unwrap_or(""));
        if name.first.is_empty() {
            draft.issue("seed", "name has no usable tokens");
            return;
        }

        draft.seed_valid = true;
        draft.usernames = self.generator.generate_usernames(&name);
        if valid_domain.is_some() {
            draft.candidates = self.generator.generate_candidates(&CandidateSeed::Name(name));
        }
        draft.seed_domain = valid_domain;
    }

    /// Verify every domain concurrently; lookups still pending at the deadline
    /// are abandoned and reported `Unknown`
    async fn resolve_domains(
        &self,
        domains: &[String],
    ) -> (BTreeMap<String, DeliverabilityResult>, Vec<ReportIssue>) {
        let mut results = BTreeMap::new();
        let mut issues = Vec::new();
        if domains.is_empty() {
            return (results, issues);
        }

        let deadline = tokio::time::sleep(self.config.report.deadline());
        tokio::pin!(deadline);

        let mut pending: FuturesUnordered<_> = domains
            .iter()
            .map(|domain| async move { (domain.clone(), self.verifier.verify(domain).await) })
            .collect();

        let mut finished: HashMap<String, DeliverabilityCheck> = HashMap::new();
        loop {
            tokio::select! {
                next = pending.next() => match next {
                    Some((domain, check)) => {
                        finished.insert(domain, check);
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        "Report deadline reached with {} lookup(s) pending",
                        domains.len() - finished.len()
                    );
                    break;
                }
            }
        }

        // Issues follow domain order, not completion order
        for domain in domains {
            let field = format!("deliverability.{}", domain);
            match finished.remove(domain) {
                Some(check) => {
                    match &check.failure {
                        Some(ResolverError::Timeout) => issues.push(ReportIssue::new(
                            field,
                            format!("ResolverTimeout after {} attempt(s)", check.attempts),
                        )),
                        Some(ResolverError::Failure(msg)) => {
                            issues.push(ReportIssue::new(field, format!("ResolverFailure: {}", msg)))
                        }
                        None => {}
                    }
                    results.insert(domain.clone(), check.result);
                }
                None => {
                    issues.push(ReportIssue::new(field, "abandoned at report deadline"));
                    results.insert(domain.clone(), DeliverabilityResult::unknown(domain.as_str()));
                }
            }
        }

        debug!(
            "{} of {} domain(s) likely deliverable",
            results.values().filter(|r| r.is_likely()).count(),
            domains.len()
        );
        (results, issues)
    }
}

/// Seed domain first, then candidate domains in first-seen order
fn domains_to_check(seed_domain: Option<&str>, candidates: &[Candidate]) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    let candidate_domains = candidates
        .iter()
        .filter_map(|c| c.value.rsplit_once('@').map(|(_, d)| d));

    for domain in seed_domain.into_iter().chain(candidate_domains) {
        let domain = domain.to_lowercase();
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::deliverability::DeliverabilityState;
    use crate::ReconError;
    use crate::identifier::Identifier;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::time::Duration;

    struct StaticResolver;

    #[async_trait]
    impl MxResolver for StaticResolver {
        async fn resolve_mx(
            &self,
            domain: &str,
            _timeout: Duration,
        ) -> Result<Vec<String>, ResolverError> {
            match domain {
                "gmail.com" => Ok(vec!["gmail-smtp-in.l.google.com".to_string()]),
                "acme.com" => Ok(vec!["mx1.acme.com".to_string()]),
                _ => Err(ResolverError::Failure("NXDOMAIN".to_string())),
            }
        }
    }

    /// Answers immediately for gmail.com and never for anything else
    struct StallingResolver;

    #[async_trait]
    impl MxResolver for StallingResolver {
        async fn resolve_mx(
            &self,
            domain: &str,
            _timeout: Duration,
        ) -> Result<Vec<String>, ResolverError> {
            if domain == "gmail.com" {
                return Ok(vec!["gmail-smtp-in.l.google.com".to_string()]);
            }
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }
    }

    struct FailingBreachSource;

    #[async_trait]
    impl BreachSource for FailingBreachSource {
        async fn lookup(
            &self,
            _identifier: &str,
        ) -> Result<BTreeSet<crate::breach::BreachRecord>, BreachError> {
            Err(BreachError::Unavailable("offline".to_string()))
        }

        fn label(&self) -> String {
            "failing".to_string()
        }
    }

    fn aggregator_with(resolver: Arc<dyn MxResolver>, config: ReconConfig) -> ReportAggregator {
        let source = Arc::new(HashBreachCorrelator::new(&config.breach_corpus).unwrap());
        ReportAggregator::new(config, resolver, source).unwrap()
    }

    fn aggregator() -> ReportAggregator {
        aggregator_with(Arc::new(StaticResolver), ReconConfig::builtin().unwrap())
    }

    #[tokio::test]
    async fn test_email_report() {
        let report = aggregator()
            .build_report(&SeedSignal::email("Test.User@gmail.com"))
            .await;

        assert!(report.seed_valid());
        assert_eq!(report.seed().normalized, "test.user@gmail.com");
        assert_eq!(report.seed_domain(), Some("gmail.com"));
        assert!(report.candidates().is_empty());
        assert_eq!(report.usernames(), &["test.user".to_string()]);
        assert!(!report.classifications()["gmail.com"].disposable);
        assert_eq!(report.deliverability()["gmail.com"].state, DeliverabilityState::Likely);
        assert!(report.issues().is_empty());
        assert!((report.confidence() - 1.0).abs() < 1e-9);
        assert!(report.links().iter().any(|l| l.platform == "Gravatar"));
    }

    #[tokio::test]
    async fn test_invalid_email_still_produces_report() {
        let report = aggregator().build_report(&SeedSignal::email("not-an-email")).await;
        assert!(!report.seed_valid());
        assert!(report.deliverability().is_empty());
        assert_eq!(report.issues()[0].field, "seed");
        assert!(report.issues()[0].reason.starts_with("InvalidFormat"));
        assert!(report.breaches().is_some());
        // Format term lost, domain terms neutral
        assert!((report.confidence() - 0.375).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_role_and_disposable_seed() {
        let report = aggregator()
            .build_report(&SeedSignal::email("admin@mailinator.com"))
            .await;
        let classification = &report.classifications()["mailinator.com"];
        assert!(classification.disposable);
        assert!(classification.role_likely);
        assert_eq!(report.deliverability()["mailinator.com"].state, DeliverabilityState::Unknown);
        assert_eq!(report.issues()[0].field, "deliverability.mailinator.com");
    }

    #[tokio::test]
    async fn test_name_report_checks_candidate_domain_once() {
        let report = aggregator()
            .build_report(&SeedSignal::name("John Smith", Some("acme.com")))
            .await;
        assert_eq!(report.candidates().len(), 12);
        assert_eq!(report.deliverability().len(), 1);
        assert_eq!(report.deliverability()["acme.com"].mx_hosts, vec!["mx1.acme.com".to_string()]);
        assert_eq!(report.usernames()[0], "john.smith");
    }

    #[tokio::test]
    async fn test_name_with_bad_domain() {
        let report = aggregator()
            .build_report(&SeedSignal::name("John Smith", Some("acme")))
            .await;
        assert!(report.candidates().is_empty());
        assert_eq!(report.issues()[0].field, "seed_domain");
        assert!(!report.usernames().is_empty());
    }

    #[tokio::test]
    async fn test_phone_report() {
        let report = aggregator().build_report(&SeedSignal::phone("077 123 4567")).await;
        assert!(report.seed_valid());
        assert_eq!(report.seed().normalized, "+94771234567");
        assert_eq!(report.phone().map(|p| p.region_code.as_str()), Some("LK"));
        assert_eq!(report.candidates().len(), 6);
        assert_eq!(
            report.deliverability().keys().cloned().collect::<Vec<_>>(),
            vec!["email.com", "gmail.com", "outlook.com", "protonmail.com", "yahoo.com"]
        );
        assert_eq!(report.seed_domain(), None);
    }

    #[tokio::test]
    async fn test_unsupported_phone_region_is_an_issue() {
        let report = aggregator().build_report(&SeedSignal::phone("+999 1234567")).await;
        assert!(!report.seed_valid());
        assert!(report.issues()[0].reason.starts_with("UnsupportedRegion"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_pending_lookups() {
        let mut config = ReconConfig::builtin().unwrap();
        config.report.deadline_ms = 100;
        config.dns.timeout_ms = 10_000;
        let report = aggregator_with(Arc::new(StallingResolver), config)
            .build_report(&SeedSignal::phone("+94771234567"))
            .await;

        assert_eq!(report.deliverability()["gmail.com"].state, DeliverabilityState::Likely);
        assert_eq!(report.deliverability()["yahoo.com"].state, DeliverabilityState::Unknown);
        let abandoned: Vec<&str> = report
            .issues()
            .iter()
            .filter(|i| i.reason == "abandoned at report deadline")
            .map(|i| i.field.as_str())
            .collect();
        assert_eq!(
            abandoned,
            vec![
                "deliverability.yahoo.com",
                "deliverability.outlook.com",
                "deliverability.protonmail.com",
                "deliverability.email.com",
            ]
        );
        assert_eq!(report.candidates().len(), 6);
    }

    #[tokio::test]
    async fn test_breach_failure_is_recorded() {
        let config = ReconConfig::builtin().unwrap();
        let aggregator =
            ReportAggregator::new(config, Arc::new(StaticResolver), Arc::new(FailingBreachSource))
                .unwrap();
        let report = aggregator.build_report(&SeedSignal::email("a@gmail.com")).await;
        assert!(report.breaches().is_none());
        assert_eq!(report.issues().last().map(|i| i.field.as_str()), Some("breaches"));
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let seeds = vec![
            SeedSignal::phone("+94771234567"),
            SeedSignal::email("a@gmail.com"),
            SeedSignal::name("Jane Doe", None),
        ];
        let reports = aggregator().build_batch(&seeds).await;
        let normalized: Vec<&str> = reports.iter().map(|r| r.seed().normalized.as_str()).collect();
        assert_eq!(normalized, vec!["+94771234567", "a@gmail.com", "jane doe"]);
    }

    #[test]
    fn test_malformed_config_fails_fast() {
        let mut config = ReconConfig::builtin().unwrap();
        config.providers.clear();
        let source = Arc::new(HashBreachCorrelator::new(&config.breach_corpus).unwrap());
        assert!(matches!(
            ReportAggregator::new(config, Arc::new(StaticResolver), source),
            Err(ReconError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_weights() {
        let mut config = ReconConfig::builtin().unwrap();
        config.confidence.format = 0.9;
        assert!(matches!(
            ReportAggregator::from_config(config),
            Err(ReconError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_domains_to_check_order() {
        let source = Identifier::name("x");
        let candidates: Vec<Candidate> = ["a@b.io", "c@d.io", "e@B.io"]
            .iter()
            .map(|v| Candidate {
                value: v.to_string(),
                rule_id: "r".to_string(),
                source: source.clone(),
            })
            .collect();
        assert_eq!(
            domains_to_check(Some("z.io"), &candidates),
            vec!["z.io".to_string(), "b.io".to_string(), "d.io".to_string()]
        );
    }
}
